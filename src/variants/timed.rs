//! # TimedEvent: raise on a fixed interval.
//!
//! ```text
//! start() ──► spawn ticker loop (caller not blocked)
//!               loop {
//!                 select! (biased) {
//!                   token.cancelled() ─► exit
//!                   interval.tick()   ─► count += 1; raise(Tick { interval, count })
//!                 }
//!                 auto_reset == false ─► exit after the first raise
//!               }
//!
//! stop()    ──► cancel token ─► await loop task
//! dispose() ──► stop() ─► Event::dispose()
//! ```
//!
//! ## Rules
//! - One loop at a time: `start` on a running event is a no-op.
//! - No tick is raised after `stop` returns (a raise already in progress is awaited).
//! - Ticks missed while a raise is slow are skipped, not bursted.
//! - A stopped event can be started again; the tick counter restarts at 1.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::{Config, Event};
use crate::error::{EventError, HandlerError};
use crate::events::EventCall;
use crate::subscribers::{Subscription, SubscriptionRequest};

use super::PayloadFactory;

/// Smallest accepted period; `tokio::time::interval` rejects zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Default payload of a [`TimedEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// The configured interval.
    pub interval: Duration,
    /// 1-based tick number since the last `start`.
    pub count: u64,
}

struct Ticker {
    token: CancellationToken,
    join: JoinHandle<()>,
}

struct Shared<P: Send + Sync + 'static> {
    event: Event<P>,
    interval: Duration,
    auto_reset: bool,
    factory: PayloadFactory<Tick, P>,
    ticker: Mutex<Option<Ticker>>,
    disposed: AtomicBool,
}

/// An event raised every `interval` once started (or once, without auto-reset).
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use intercom::{Config, TimedEvent};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let heartbeat = TimedEvent::new(Duration::from_millis(10), true, Arc::new(Config::default()));
///     heartbeat
///         .subscribe_fn(|call| async move {
///             println!("tick #{}", call.payload.count);
///             Ok(())
///         })
///         .await
///         .unwrap();
///
///     heartbeat.start().await;
///     tokio::time::sleep(Duration::from_millis(35)).await;
///     heartbeat.dispose().await;
/// }
/// ```
pub struct TimedEvent<P = Tick>
where
    P: Send + Sync + 'static,
{
    inner: Arc<Shared<P>>,
}

impl TimedEvent {
    /// Creates a timed event raising [`Tick`] payloads.
    pub fn new(interval: Duration, auto_reset: bool, config: Arc<Config>) -> Self {
        Self::with_factory(interval, auto_reset, config, |tick| tick)
    }
}

impl<P: Send + Sync + 'static> TimedEvent<P> {
    /// Creates a timed event whose subscribers receive `factory(tick)`.
    pub fn with_factory<F>(
        interval: Duration,
        auto_reset: bool,
        config: Arc<Config>,
        factory: F,
    ) -> Self
    where
        F: Fn(Tick) -> P + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Shared {
                event: Event::new(config),
                interval: interval.max(MIN_INTERVAL),
                auto_reset,
                factory: Arc::new(factory),
                ticker: Mutex::new(None),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Underlying event.
    pub fn event(&self) -> &Event<P> {
        &self.inner.event
    }

    /// The tick period.
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Whether the loop keeps ticking after the first raise.
    pub fn auto_reset(&self) -> bool {
        self.inner.auto_reset
    }

    /// Starts the ticker loop in the background.
    ///
    /// No-op if already running or disposed.
    pub async fn start(&self) {
        if self.inner.disposed.load(Ordering::Acquire) {
            tracing::trace!(event = %self.inner.event.id(), "start ignored: timed event disposed");
            return;
        }

        let mut ticker = self.inner.ticker.lock().await;
        if ticker.as_ref().is_some_and(|t| !t.join.is_finished()) {
            return;
        }

        let token = CancellationToken::new();
        let join = tokio::spawn(run_ticker(
            self.inner.event.clone(),
            self.inner.interval,
            self.inner.auto_reset,
            Arc::clone(&self.inner.factory),
            token.clone(),
        ));
        *ticker = Some(Ticker { token, join });
        tracing::debug!(event = %self.inner.event.id(), interval = ?self.inner.interval, "timed event started");
    }

    /// Stops the ticker loop and waits for it to exit.
    ///
    /// Returns `true` if a loop was running.
    pub async fn stop(&self) -> bool {
        let Some(ticker) = self.inner.ticker.lock().await.take() else {
            return false;
        };
        let was_running = !ticker.join.is_finished();
        ticker.token.cancel();
        if let Err(err) = ticker.join.await {
            tracing::warn!(event = %self.inner.event.id(), error = %err, "ticker task did not complete");
        }
        was_running
    }

    /// True while the ticker loop is alive.
    pub async fn is_running(&self) -> bool {
        self.inner
            .ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.join.is_finished())
    }

    /// See [`Event::subscribe`].
    ///
    /// # Errors
    /// Same as [`Event::subscribe`].
    pub async fn subscribe(
        &self,
        request: SubscriptionRequest<P>,
    ) -> Result<Arc<Subscription<P>>, EventError> {
        self.inner.event.subscribe(request).await
    }

    /// See [`Event::subscribe_fn`].
    ///
    /// # Errors
    /// Same as [`Event::subscribe`].
    pub async fn subscribe_fn<F, Fut>(&self, f: F) -> Result<Arc<Subscription<P>>, EventError>
    where
        F: Fn(Arc<EventCall<P>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.inner.event.subscribe_fn(f).await
    }

    /// See [`Event::unsubscribe`].
    pub async fn unsubscribe(&self, subscription: &Subscription<P>) -> bool {
        self.inner.event.unsubscribe(subscription).await
    }

    /// Stops the loop, then disposes the event. Idempotent.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop().await;
        self.inner.event.dispose().await;
    }
}

async fn run_ticker<P: Send + Sync + 'static>(
    event: Event<P>,
    interval: Duration,
    auto_reset: bool,
    factory: PayloadFactory<Tick, P>,
    token: CancellationToken,
) {
    let mut ticks = time::interval_at(Instant::now() + interval, interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut count = 0_u64;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticks.tick() => {}
        }

        count += 1;
        event.raise(factory(Tick { interval, count })).await;

        if !auto_reset {
            break;
        }
    }
    tracing::trace!(event = %event.id(), ticks = count, "ticker loop exited");
}

impl<P: Send + Sync + 'static> Clone for TimedEvent<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Send + Sync + 'static> fmt::Debug for TimedEvent<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedEvent")
            .field("event", &self.inner.event)
            .field("interval", &self.inner.interval)
            .field("auto_reset", &self.inner.auto_reset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    async fn counting(ev: &TimedEvent) -> Arc<StdMutex<Vec<Tick>>> {
        let ticks: Arc<StdMutex<Vec<Tick>>> = Arc::default();
        let t = ticks.clone();
        ev.subscribe_fn(move |call: Arc<EventCall<Tick>>| {
            let t = t.clone();
            async move {
                t.lock().unwrap().push(call.payload);
                Ok(())
            }
        })
        .await
        .unwrap();
        ticks
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_interval_until_stopped() {
        let ev = TimedEvent::new(Duration::from_secs(1), true, Arc::new(Config::default()));
        let ticks = counting(&ev).await;

        ev.start().await;
        assert!(ev.is_running().await);
        time::sleep(Duration::from_millis(3500)).await;
        assert!(ev.stop().await);
        assert!(!ev.is_running().await);

        let seen = ticks.lock().unwrap().clone();
        assert_eq!(seen.iter().map(|t| t.count).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(seen.iter().all(|t| t.interval == Duration::from_secs(1)));

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_auto_reset_fires_once() {
        let ev = TimedEvent::new(Duration::from_secs(1), false, Arc::new(Config::default()));
        let ticks = counting(&ev).await;

        ev.start().await;
        time::sleep(Duration::from_millis(1500)).await;
        assert!(!ev.is_running().await);
        time::sleep(Duration::from_secs(3)).await;

        assert_eq!(ticks.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_and_restart() {
        let ev = TimedEvent::new(Duration::from_secs(1), true, Arc::new(Config::default()));
        let ticks = counting(&ev).await;

        ev.start().await;
        ev.start().await;
        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(ticks.lock().unwrap().len(), 1);

        ev.stop().await;
        assert!(!ev.stop().await);

        ev.start().await;
        time::sleep(Duration::from_millis(1500)).await;
        ev.dispose().await;

        let counts: Vec<u64> = ticks.lock().unwrap().iter().map(|t| t.count).collect();
        assert_eq!(counts, vec![1, 1]);

        ev.start().await;
        assert!(!ev.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_handlers_skip_missed_ticks() {
        let cfg = Config::default().with_soft_timeout(Duration::ZERO);
        let ev = TimedEvent::new(Duration::from_millis(100), true, Arc::new(cfg));
        let ticks: Arc<StdMutex<Vec<Instant>>> = Arc::default();
        let t = ticks.clone();
        ev.subscribe_fn(move |_call: Arc<EventCall<Tick>>| {
            let t = t.clone();
            async move {
                t.lock().unwrap().push(Instant::now());
                time::sleep(Duration::from_millis(250)).await;
                Ok(())
            }
        })
        .await
        .unwrap();

        ev.start().await;
        time::sleep(Duration::from_millis(1000)).await;
        ev.dispose().await;

        let seen = ticks.lock().unwrap().clone();
        assert!(seen.len() >= 2);
        for pair in seen.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(250));
        }
    }
}
