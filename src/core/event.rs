//! # Event: the dispatch point.
//!
//! [`Event`] owns the subscriber set of one logical event and runs the notify
//! algorithm for every raise. It is a cheap `Clone` handle over shared state, so
//! variants and producers can hold copies.
//!
//! ## Lifecycle
//! ```text
//! Event::new(cfg)
//!   ├─► subscribe(req)  → Subscription (on_subscribe hook runs before return)
//!   ├─► raise(payload)  → snapshot → dispatch::notify (never fails, never panics)
//!   ├─► unsubscribe(s)  → true once, then false
//!   └─► dispose()       → dispose all subscriptions → wait for every handler task
//! ```
//!
//! ## Rules
//! - Raising with no subscribers does nothing (no call is allocated by [`Event::raise`]).
//! - Dispatch works on a snapshot: add/remove during a dispatch affects the next one.
//! - Handler failures never reach the raiser.
//! - Operations on a disposed event are no-ops (`false`, or [`EventError::Disposed`]).

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::task::TaskTracker;

use crate::core::config::Config;
use crate::core::dispatch::notify;
use crate::error::{EventError, HandlerError};
use crate::events::{EventCall, EventId};
use crate::subscribers::{Insert, SubscriberSet, Subscription, SubscriptionRequest};

struct Shared<P: Send + Sync + 'static> {
    id: EventId,
    config: Arc<Config>,
    subscribers: Arc<SubscriberSet<P>>,
    handlers: TaskTracker,
    disposed: AtomicBool,
}

/// A long-lived dispatch point with zero or more subscribers.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use intercom::{Config, Event, EventCall, HandlerError};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let user_created: Event<String> = Event::new(Arc::new(Config::default()));
///
///     let sub = user_created
///         .subscribe_fn(|call: Arc<EventCall<String>>| async move {
///             println!("welcome, {}", call.payload);
///             Ok::<_, HandlerError>(())
///         })
///         .await?;
///
///     user_created.raise("ada".to_string()).await;
///
///     assert!(user_created.unsubscribe(&sub).await);
///     user_created.dispose().await;
///     Ok(())
/// }
/// ```
pub struct Event<P: Send + Sync + 'static> {
    inner: Arc<Shared<P>>,
}

impl<P: Send + Sync + 'static> Clone for Event<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Send + Sync + 'static> Event<P> {
    /// Creates an event dispatching under `config`.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            inner: Arc::new(Shared {
                id: EventId::new(),
                config,
                subscribers: SubscriberSet::new(),
                handlers: TaskTracker::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Creates an event with [`Config::default`].
    pub fn with_default_config() -> Self {
        Self::new(Arc::new(Config::default()))
    }

    /// Stable identity of this event.
    #[inline]
    pub fn id(&self) -> EventId {
        self.inner.id
    }

    /// Dispatch policy of this event.
    #[inline]
    pub fn config(&self) -> &Arc<Config> {
        &self.inner.config
    }

    /// True once [`dispose`](Self::dispose) has started.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Registers a handler.
    ///
    /// The subscribe hook (if any) runs before this returns.
    ///
    /// # Errors
    /// - [`EventError::MultipleSubscribers`] when the configuration allows one
    ///   subscriber and one is already registered.
    /// - [`EventError::Disposed`] when the event was disposed.
    pub async fn subscribe(
        &self,
        request: SubscriptionRequest<P>,
    ) -> Result<Arc<Subscription<P>>, EventError> {
        let event_id = self.id();
        if self.is_disposed() {
            return Err(EventError::Disposed { event_id });
        }

        let sub = Subscription::new(request, Arc::downgrade(&self.inner.subscribers));
        let allow_multiple = self.inner.config.allow_multiple_subscribers;

        match self.inner.subscribers.insert(Arc::clone(&sub), allow_multiple).await {
            Insert::Added => {}
            Insert::Duplicate => return Ok(sub),
            Insert::Rejected => return Err(EventError::MultipleSubscribers { event_id }),
        }

        // Lost a race with dispose(): undo.
        if self.is_disposed() {
            sub.dispose().await;
            return Err(EventError::Disposed { event_id });
        }

        sub.run_subscribe_hook(event_id).await;
        tracing::debug!(event = %event_id, subscription = sub.id(), handler = sub.handler_name(), "subscribed");
        Ok(sub)
    }

    /// Shorthand for [`subscribe`](Self::subscribe) with only a closure handler.
    ///
    /// # Errors
    /// Same as [`subscribe`](Self::subscribe).
    pub async fn subscribe_fn<F, Fut>(&self, f: F) -> Result<Arc<Subscription<P>>, EventError>
    where
        F: Fn(Arc<EventCall<P>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.subscribe(SubscriptionRequest::new(f)).await
    }

    /// Removes and disposes `subscription`.
    ///
    /// Returns `true` if it was subscribed to this event, `false` otherwise.
    pub async fn unsubscribe(&self, subscription: &Subscription<P>) -> bool {
        if !self.inner.subscribers.remove(subscription).await {
            return false;
        }
        subscription.dispose().await;
        tracing::debug!(event = %self.id(), subscription = subscription.id(), "unsubscribed");
        true
    }

    /// True if `subscription` is currently registered on this event.
    pub async fn is_subscribed(&self, subscription: &Subscription<P>) -> bool {
        self.inner.subscribers.contains(subscription).await
    }

    /// Number of current subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len().await
    }

    /// Number of handler tasks still running, whether a dispatch is awaiting them
    /// or the soft timeout detached them.
    pub fn background_count(&self) -> usize {
        self.inner.handlers.len()
    }

    /// Raises the event with `payload`.
    ///
    /// Completes once every handler finished or was detached by the soft timeout.
    pub async fn raise(&self, payload: P) {
        if self.inner.subscribers.is_empty().await {
            return;
        }
        self.dispatch(EventCall::new(payload)).await;
    }

    /// Raises the event with `payload`, recording `caller` (weakly) in the metadata.
    pub async fn raise_with_caller<C: Any + Send + Sync>(&self, payload: P, caller: &Arc<C>) {
        if self.inner.subscribers.is_empty().await {
            return;
        }
        self.dispatch(EventCall::new(payload).with_caller(caller)).await;
    }

    /// Raises a prepared call (e.g. with a priority or caller already attached).
    ///
    /// The event id and raise timestamp are stamped here.
    pub async fn raise_call(&self, call: EventCall<P>) {
        if self.inner.subscribers.is_empty().await {
            return;
        }
        self.dispatch(call).await;
    }

    async fn dispatch(&self, call: EventCall<P>) {
        let subs = self.inner.subscribers.snapshot().await;
        if subs.is_empty() {
            return;
        }

        let call = Arc::new(call.stamp(self.id()));
        tracing::debug!(
            event = %self.id(),
            call = %call.metadata.call_id,
            seq = call.metadata.seq,
            subscribers = subs.len(),
            "raising event"
        );
        notify(subs, call, &self.inner.config, &self.inner.handlers).await;
    }

    /// Disposes every subscription, then waits for every handler task.
    ///
    /// After this returns no handler of this event is running, and a dispatch that
    /// raced with it only skips invocations of disposed subscriptions. A raise in
    /// flight keeps its soft-timeout bound. Idempotent.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let subs = self.inner.subscribers.drain().await;
        for sub in &subs {
            sub.dispose().await;
        }
        self.inner.handlers.close();
        if !self.inner.handlers.is_empty() {
            tracing::debug!(
                event = %self.id(),
                pending = self.inner.handlers.len(),
                "waiting for handler tasks to complete"
            );
        }
        self.inner.handlers.wait().await;
        tracing::debug!(event = %self.id(), disposed_subscriptions = subs.len(), "event disposed");
    }
}

impl<P: Send + Sync + 'static> fmt::Debug for Event<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.inner.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
