//! # DebounceEvent: raise once a burst of inputs has settled.
//!
//! ```text
//! notify_input(v)
//!   └─ lock state
//!        ├─ disposed ─► drop input
//!        ├─ generation += 1
//!        ├─ cancel previous delay token
//!        ├─ latest = v
//!        └─ spawn delay(generation, token) ──► on the timer tracker
//!
//! delay(gen, token)
//!   ├─ token cancelled ─► exit
//!   └─ interval elapsed ─► lock state
//!                            ├─ generation != gen ─► exit (superseded)
//!                            └─ take latest, unlock ─► raise(Debounced { input, interval })
//! ```
//!
//! ## Rules
//! - At most one raise per settled burst, carrying the last input.
//! - The raise happens at least one interval after the last input.
//! - The state lock is never held across the raise, so handlers may feed new input.
//! - `dispose` cancels the pending delay and waits for an in-flight raise; input
//!   arriving afterwards is dropped under the same lock, so it never starts a timer.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::{Config, Event};
use crate::error::{EventError, HandlerError};
use crate::events::EventCall;
use crate::subscribers::{Subscription, SubscriptionRequest};

use super::PayloadFactory;

/// Default payload of a [`DebounceEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debounced<I> {
    /// The last input of the burst.
    pub input: I,
    /// The debounce interval.
    pub interval: Duration,
}

struct Pending<I> {
    generation: u64,
    latest: Option<I>,
    delay: Option<CancellationToken>,
}

impl<I> Pending<I> {
    /// Invalidates any scheduled delay and returns the pending input.
    fn supersede(&mut self) -> Option<I> {
        self.generation = self.generation.wrapping_add(1);
        if let Some(token) = self.delay.take() {
            token.cancel();
        }
        self.latest.take()
    }
}

struct Shared<I, P: Send + Sync + 'static> {
    event: Event<P>,
    interval: Duration,
    pending: Mutex<Pending<I>>,
    timers: TaskTracker,
    factory: PayloadFactory<Debounced<I>, P>,
    disposed: AtomicBool,
}

impl<I, P> Shared<I, P>
where
    I: Send + 'static,
    P: Send + Sync + 'static,
{
    async fn delay_then_fire(self: Arc<Self>, generation: u64, token: CancellationToken) {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = time::sleep(self.interval) => {}
        }

        let input = {
            let mut pending = self.pending.lock().await;
            if pending.generation != generation {
                return;
            }
            pending.delay = None;
            pending.latest.take()
        };

        if let Some(input) = input {
            self.fire(input).await;
        }
    }

    async fn fire(&self, input: I) {
        let payload = (self.factory)(Debounced {
            input,
            interval: self.interval,
        });
        self.event.raise(payload).await;
    }
}

/// An event raised with the last input once no new input arrived for one interval.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use intercom::{Config, DebounceEvent};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let search: DebounceEvent<String> =
///         DebounceEvent::new(Duration::from_millis(300), Arc::new(Config::default()));
///     search
///         .subscribe_fn(|call| async move {
///             println!("searching for {:?}", call.payload.input);
///             Ok(())
///         })
///         .await
///         .unwrap();
///
///     for query in ["r", "ru", "rus", "rust"] {
///         search.notify_input(query.to_string()).await;
///     }
///     search.flush().await;
///     search.dispose().await;
/// }
/// ```
pub struct DebounceEvent<I, P = Debounced<I>>
where
    I: Send + 'static,
    P: Send + Sync + 'static,
{
    inner: Arc<Shared<I, P>>,
}

impl<I: Send + Sync + 'static> DebounceEvent<I> {
    /// Creates a debounce event raising [`Debounced`] payloads.
    pub fn new(interval: Duration, config: Arc<Config>) -> Self {
        Self::with_factory(interval, config, |debounced| debounced)
    }
}

impl<I, P> DebounceEvent<I, P>
where
    I: Send + 'static,
    P: Send + Sync + 'static,
{
    /// Creates a debounce event whose subscribers receive `factory(debounced)`.
    pub fn with_factory<F>(interval: Duration, config: Arc<Config>, factory: F) -> Self
    where
        F: Fn(Debounced<I>) -> P + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Shared {
                event: Event::new(config),
                interval,
                pending: Mutex::new(Pending {
                    generation: 0,
                    latest: None,
                    delay: None,
                }),
                timers: TaskTracker::new(),
                factory: Arc::new(factory),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Underlying event.
    pub fn event(&self) -> &Event<P> {
        &self.inner.event
    }

    /// The debounce interval.
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Records `input` and restarts the debounce delay.
    ///
    /// Ignored after [`dispose`](Self::dispose).
    pub async fn notify_input(&self, input: I) {
        let mut pending = self.inner.pending.lock().await;
        // Checked under the lock: dispose flips the flag before superseding.
        if self.inner.disposed.load(Ordering::Acquire) {
            tracing::trace!(event = %self.inner.event.id(), "input ignored: debounce disposed");
            return;
        }

        pending.supersede();
        pending.latest = Some(input);

        let token = CancellationToken::new();
        pending.delay = Some(token.clone());
        let generation = pending.generation;
        self.inner
            .timers
            .spawn(Arc::clone(&self.inner).delay_then_fire(generation, token));
    }

    /// Raises immediately with the pending input, if any.
    ///
    /// Returns `true` if there was pending input.
    pub async fn flush(&self) -> bool {
        let input = self.inner.pending.lock().await.supersede();
        match input {
            Some(input) => {
                self.inner.fire(input).await;
                true
            }
            None => false,
        }
    }

    /// Drops the pending input without raising.
    ///
    /// Returns `true` if there was pending input.
    pub async fn cancel_pending(&self) -> bool {
        self.inner.pending.lock().await.supersede().is_some()
    }

    /// True while an input is waiting for its delay to elapse.
    pub async fn has_pending(&self) -> bool {
        self.inner.pending.lock().await.latest.is_some()
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

    /// Cancels the pending delay, waits for an in-flight raise, then disposes the event.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.pending.lock().await.supersede();
        self.inner.timers.close();
        self.inner.timers.wait().await;
        self.inner.event.dispose().await;
    }
}

impl<I, P> Clone for DebounceEvent<I, P>
where
    I: Send + 'static,
    P: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I, P> fmt::Debug for DebounceEvent<I, P>
where
    I: Send + 'static,
    P: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceEvent")
            .field("event", &self.inner.event)
            .field("interval", &self.inner.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    type Fired = Arc<StdMutex<Vec<(String, time::Instant)>>>;

    async fn typing_field(interval: Duration) -> (DebounceEvent<String>, Fired) {
        let ev = DebounceEvent::new(interval, Arc::new(Config::default()));
        let fired: Fired = Arc::default();
        let f = fired.clone();
        ev.subscribe_fn(move |call: Arc<EventCall<Debounced<String>>>| {
            let f = f.clone();
            async move {
                f.lock()
                    .unwrap()
                    .push((call.payload.input.clone(), time::Instant::now()));
                Ok(())
            }
        })
        .await
        .unwrap();
        (ev, fired)
    }

    /// Five inputs 100ms apart; returns the instant of the last one.
    async fn type_hello(ev: &DebounceEvent<String>) -> time::Instant {
        for (i, text) in ["H", "He", "Hel", "Hell", "Hello"].iter().enumerate() {
            if i > 0 {
                time::sleep(Duration::from_millis(100)).await;
            }
            ev.notify_input(text.to_string()).await;
        }
        time::Instant::now()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_with_last_input() {
        let (ev, fired) = typing_field(Duration::from_millis(500)).await;
        let started = time::Instant::now();

        let last_input = type_hello(&ev).await;
        assert_eq!(last_input - started, Duration::from_millis(400));

        time::sleep(Duration::from_millis(600)).await;

        let fired = fired.lock().unwrap().clone();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, "Hello");
        assert!(fired[0].1 - last_input >= Duration::from_millis(500));
        assert!(fired[0].1 - started >= Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_fire_before_interval() {
        let (ev, fired) = typing_field(Duration::from_millis(500)).await;

        type_hello(&ev).await;
        time::sleep(Duration::from_millis(200)).await;

        assert!(fired.lock().unwrap().is_empty());
        assert!(ev.has_pending().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_fire_separately() {
        let (ev, fired) = typing_field(Duration::from_millis(100)).await;

        ev.notify_input("a".into()).await;
        time::sleep(Duration::from_millis(150)).await;
        ev.notify_input("b".into()).await;
        time::sleep(Duration::from_millis(150)).await;

        let inputs: Vec<String> = fired.lock().unwrap().iter().map(|(s, _)| s.clone()).collect();
        assert_eq!(inputs, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_and_cancel_pending() {
        let (ev, fired) = typing_field(Duration::from_secs(1)).await;

        ev.notify_input("now".into()).await;
        assert!(ev.flush().await);
        assert!(!ev.flush().await);
        assert_eq!(fired.lock().unwrap().len(), 1);

        ev.notify_input("never".into()).await;
        assert!(ev.cancel_pending().await);
        assert!(!ev.has_pending().await);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_drops_pending_input() {
        let (ev, fired) = typing_field(Duration::from_millis(100)).await;

        ev.notify_input("pending".into()).await;
        ev.dispose().await;
        ev.notify_input("late".into()).await;
        time::sleep(Duration::from_millis(500)).await;

        assert!(fired.lock().unwrap().is_empty());
        assert!(ev.event().is_disposed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_after_dispose_starts_no_timer() {
        let (ev, fired) = typing_field(Duration::from_secs(60)).await;
        ev.dispose().await;

        let started = time::Instant::now();
        ev.notify_input("late".into()).await;
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(!ev.has_pending().await);
        assert!(ev.inner.timers.is_empty());
        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_burst_fires_once() {
        let (ev, fired) = typing_field(Duration::from_millis(200)).await;

        let inputs: Vec<String> = (0..16).map(|i| format!("key-{i}")).collect();
        let tasks: Vec<_> = inputs
            .iter()
            .cloned()
            .map(|input| {
                let ev = ev.clone();
                tokio::spawn(async move { ev.notify_input(input).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        time::sleep(Duration::from_millis(600)).await;

        let fired = fired.lock().unwrap().clone();
        assert_eq!(fired.len(), 1);
        assert!(inputs.contains(&fired[0].0));
        assert!(!ev.has_pending().await);
        ev.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_feeds_input_during_fire() {
        let ev: DebounceEvent<String> =
            DebounceEvent::new(Duration::from_millis(100), Arc::new(Config::default()));
        let fired: Arc<StdMutex<Vec<String>>> = Arc::default();

        let f = fired.clone();
        let feeder = ev.clone();
        ev.subscribe_fn(move |call: Arc<EventCall<Debounced<String>>>| {
            let f = f.clone();
            let feeder = feeder.clone();
            async move {
                f.lock().unwrap().push(call.payload.input.clone());
                if call.payload.input == "first" {
                    feeder.notify_input("second".into()).await;
                }
                Ok(())
            }
        })
        .await
        .unwrap();

        ev.notify_input("first".into()).await;
        time::sleep(Duration::from_millis(350)).await;

        assert_eq!(*fired.lock().unwrap(), vec!["first".to_string(), "second".to_string()]);
        assert!(!ev.has_pending().await);
        ev.dispose().await;
    }
}
