//! # ThresholdEvent: raise when a value reaches a threshold.
//!
//! ```text
//! increment(delta) / set_value(v)
//!   ├─ current = current + delta   (or v)
//!   ├─ hit = predicate(current, threshold)        default: current >= threshold
//!   └─ trigger
//!        ├─ EveryCall ─► raise on every update where hit
//!        └─ Crossing  ─► raise only when hit flips false → true
//! ```
//!
//! The value is updated under a lock; the raise happens after it is released,
//! so handlers may read [`ThresholdEvent::current`] or update the value again.

use std::fmt;
use std::future::Future;
use std::ops::Add;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::{Config, Event};
use crate::error::{EventError, HandlerError};
use crate::events::EventCall;
use crate::subscribers::{Subscription, SubscriptionRequest};

use super::PayloadFactory;

/// Default payload of a [`ThresholdEvent`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdReached<V> {
    /// The configured threshold.
    pub threshold: V,
    /// The value that satisfied it.
    pub current: V,
}

/// When a satisfied predicate raises the event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThresholdTrigger {
    /// Every update that leaves the predicate satisfied raises.
    #[default]
    EveryCall,
    /// Only the update that makes the predicate go from unsatisfied to satisfied raises.
    Crossing,
}

type Predicate<V> = Arc<dyn Fn(&V, &V) -> bool + Send + Sync>;

struct Level<V> {
    current: V,
    hit: bool,
}

/// An event raised when an accumulated value reaches a threshold.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use intercom::{Config, ThresholdEvent};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let failures: ThresholdEvent<u32> = ThresholdEvent::new(3, Arc::new(Config::default()));
///     failures
///         .subscribe_fn(|call| async move {
///             println!("{} failures (limit {})", call.payload.current, call.payload.threshold);
///             Ok(())
///         })
///         .await
///         .unwrap();
///
///     for _ in 0..3 {
///         failures.increment(1).await;
///     }
/// }
/// ```
pub struct ThresholdEvent<V, P = ThresholdReached<V>>
where
    V: Copy + PartialOrd + Add<Output = V> + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    event: Event<P>,
    threshold: V,
    level: Mutex<Level<V>>,
    predicate: Predicate<V>,
    trigger: ThresholdTrigger,
    factory: PayloadFactory<ThresholdReached<V>, P>,
}

impl<V> ThresholdEvent<V>
where
    V: Copy + PartialOrd + Add<Output = V> + Default + Send + Sync + 'static,
{
    /// Creates a threshold event starting at `V::default()`.
    pub fn new(threshold: V, config: Arc<Config>) -> Self {
        Self::with_factory(threshold, config, |reached| reached)
    }
}

impl<V, P> ThresholdEvent<V, P>
where
    V: Copy + PartialOrd + Add<Output = V> + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Creates a threshold event whose subscribers receive `factory(reached)`.
    pub fn with_factory<F>(threshold: V, config: Arc<Config>, factory: F) -> Self
    where
        V: Default,
        F: Fn(ThresholdReached<V>) -> P + Send + Sync + 'static,
    {
        Self {
            event: Event::new(config),
            threshold,
            level: Mutex::new(Level {
                current: V::default(),
                hit: false,
            }),
            predicate: Arc::new(|current: &V, threshold: &V| current >= threshold),
            trigger: ThresholdTrigger::default(),
            factory: Arc::new(factory),
        }
    }

    /// Replaces the starting value (before any update).
    pub fn starting_at(mut self, initial: V) -> Self {
        let hit = (self.predicate)(&initial, &self.threshold);
        *self.level.get_mut() = Level {
            current: initial,
            hit,
        };
        self
    }

    /// Replaces the default `current >= threshold` check.
    ///
    /// The predicate receives `(current, threshold)`.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&V, &V) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        let level = self.level.get_mut();
        level.hit = (self.predicate)(&level.current, &self.threshold);
        self
    }

    /// Chooses when a satisfied predicate raises.
    pub fn with_trigger(mut self, trigger: ThresholdTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Underlying event.
    pub fn event(&self) -> &Event<P> {
        &self.event
    }

    /// The configured threshold.
    pub fn threshold(&self) -> V {
        self.threshold
    }

    /// Current accumulated value.
    pub async fn current(&self) -> V {
        self.level.lock().await.current
    }

    /// Adds `delta` to the value, raising if the threshold check passes.
    ///
    /// Returns `true` if the trigger fired, whether or not anyone is subscribed.
    ///
    /// # Panics
    /// The sum uses `V`'s [`Add`]: for primitive integers it panics on overflow in
    /// debug builds and wraps in release builds. Use [`set_value`](Self::set_value)
    /// with a checked or saturating sum when the value may overflow.
    pub async fn increment(&self, delta: V) -> bool {
        self.update(|current| current + delta).await
    }

    /// Assigns the value, raising if the threshold check passes.
    ///
    /// Returns `true` if the trigger fired, whether or not anyone is subscribed.
    pub async fn set_value(&self, value: V) -> bool {
        self.update(|_| value).await
    }

    /// Assigns the value without raising; re-arms [`ThresholdTrigger::Crossing`]
    /// when the new value is below the threshold.
    pub async fn reset(&self, value: V) {
        let mut level = self.level.lock().await;
        level.current = value;
        level.hit = (self.predicate)(&value, &self.threshold);
    }

    async fn update(&self, next: impl FnOnce(V) -> V) -> bool {
        let reached = {
            let mut level = self.level.lock().await;
            level.current = next(level.current);
            let hit = (self.predicate)(&level.current, &self.threshold);
            let fire = match self.trigger {
                ThresholdTrigger::EveryCall => hit,
                ThresholdTrigger::Crossing => hit && !level.hit,
            };
            level.hit = hit;
            fire.then_some(ThresholdReached {
                threshold: self.threshold,
                current: level.current,
            })
        };

        let Some(reached) = reached else {
            return false;
        };
        self.event.raise((self.factory)(reached)).await;
        true
    }

    /// See [`Event::subscribe`].
    ///
    /// # Errors
    /// Same as [`Event::subscribe`].
    pub async fn subscribe(
        &self,
        request: SubscriptionRequest<P>,
    ) -> Result<Arc<Subscription<P>>, EventError> {
        self.event.subscribe(request).await
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
        self.event.subscribe_fn(f).await
    }

    /// See [`Event::unsubscribe`].
    pub async fn unsubscribe(&self, subscription: &Subscription<P>) -> bool {
        self.event.unsubscribe(subscription).await
    }

    /// See [`Event::dispose`].
    pub async fn dispose(&self) {
        self.event.dispose().await;
    }
}

impl<V, P> fmt::Debug for ThresholdEvent<V, P>
where
    V: Copy + PartialOrd + Add<Output = V> + Send + Sync + fmt::Debug + 'static,
    P: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdEvent")
            .field("event", &self.event)
            .field("threshold", &self.threshold)
            .field("trigger", &self.trigger)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn recorder<P: Clone + Send + Sync + 'static>(
        seen: &Arc<StdMutex<Vec<P>>>,
    ) -> impl Fn(Arc<EventCall<P>>) -> futures::future::Ready<Result<(), HandlerError>>
    + Send
    + Sync
    + 'static {
        let seen = seen.clone();
        move |call| {
            seen.lock().unwrap().push(call.payload.clone());
            futures::future::ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_fires_on_every_call_past_threshold() {
        let ev: ThresholdEvent<i32> = ThresholdEvent::new(2, Arc::new(Config::default()));
        let seen: Arc<StdMutex<Vec<ThresholdReached<i32>>>> = Arc::default();
        ev.subscribe_fn(recorder(&seen)).await.unwrap();

        assert!(!ev.increment(1).await);
        assert!(ev.increment(2).await);
        assert!(ev.increment(1).await);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ThresholdReached { threshold: 2, current: 3 },
                ThresholdReached { threshold: 2, current: 4 },
            ]
        );
        assert_eq!(ev.current().await, 4);
    }

    #[tokio::test]
    async fn test_trigger_reports_fired_without_subscribers() {
        let ev: ThresholdEvent<u32> = ThresholdEvent::new(2, Arc::new(Config::default()));
        assert_eq!(ev.event().subscriber_count().await, 0);

        assert!(!ev.increment(1).await);
        assert!(ev.increment(1).await);
        assert!(ev.set_value(5).await);
        assert_eq!(ev.current().await, 5);
    }

    #[tokio::test]
    async fn test_crossing_fires_once_until_reset() {
        let ev: ThresholdEvent<i32> = ThresholdEvent::new(10, Arc::new(Config::default()))
            .with_trigger(ThresholdTrigger::Crossing);
        let seen: Arc<StdMutex<Vec<ThresholdReached<i32>>>> = Arc::default();
        ev.subscribe_fn(recorder(&seen)).await.unwrap();

        assert!(ev.set_value(12).await);
        assert!(!ev.increment(5).await);
        ev.reset(0).await;
        assert!(!ev.increment(9).await);
        assert!(ev.increment(1).await);

        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(seen.lock().unwrap()[1].current, 10);
    }

    #[tokio::test]
    async fn test_custom_predicate_and_factory() {
        // Fires while a countdown is at or below its floor.
        let ev = ThresholdEvent::with_factory(0.5_f64, Arc::new(Config::default()), |r| {
            format!("{:.1}<={:.1}", r.current, r.threshold)
        })
        .starting_at(2.0)
        .with_predicate(|current, threshold| current <= threshold);
        let seen: Arc<StdMutex<Vec<String>>> = Arc::default();
        ev.subscribe_fn(recorder(&seen)).await.unwrap();

        assert!(!ev.increment(-1.0).await);
        assert!(ev.increment(-1.0).await);
        assert_eq!(*seen.lock().unwrap(), vec!["0.0<=0.5".to_string()]);
    }

    #[tokio::test]
    async fn test_handler_failure_does_not_reach_producer() {
        let ev: ThresholdEvent<u8> = ThresholdEvent::new(1, Arc::new(Config::default()));
        ev.subscribe_fn(|_c| async { Err(HandlerError::fail("over limit")) })
            .await
            .unwrap();
        assert!(ev.increment(1).await);
        ev.dispose().await;
        assert!(ev.event().is_disposed());
    }
}
