//! # StateChangeEvent: raise on transitions between unequal states.
//!
//! `set(new)` compares against the held state. Equal → nothing happens.
//! Unequal → the new state is committed first, then the event is raised with
//! `(old, new)`; handlers calling [`StateChangeEvent::current`] see `new`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::{Config, Event};
use crate::error::{EventError, HandlerError};
use crate::events::EventCall;
use crate::subscribers::{Subscription, SubscriptionRequest};

use super::PayloadFactory;

/// Default payload of a [`StateChangeEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChanged<S> {
    /// State before the change.
    pub old: S,
    /// State after the change.
    pub new: S,
}

/// An event raised whenever its state changes to a different value.
pub struct StateChangeEvent<S, P = StateChanged<S>>
where
    S: PartialEq + Clone + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    event: Event<P>,
    state: Mutex<S>,
    factory: PayloadFactory<StateChanged<S>, P>,
}

impl<S> StateChangeEvent<S>
where
    S: PartialEq + Clone + Send + Sync + 'static,
{
    /// Creates a state-change event raising [`StateChanged`] payloads.
    pub fn new(initial: S, config: Arc<Config>) -> Self {
        Self::with_factory(initial, config, |changed| changed)
    }
}

impl<S, P> StateChangeEvent<S, P>
where
    S: PartialEq + Clone + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Creates a state-change event whose subscribers receive `factory(changed)`.
    pub fn with_factory<F>(initial: S, config: Arc<Config>, factory: F) -> Self
    where
        F: Fn(StateChanged<S>) -> P + Send + Sync + 'static,
    {
        Self {
            event: Event::new(config),
            state: Mutex::new(initial),
            factory: Arc::new(factory),
        }
    }

    /// Underlying event.
    pub fn event(&self) -> &Event<P> {
        &self.event
    }

    /// Snapshot of the current state.
    pub async fn current(&self) -> S {
        self.state.lock().await.clone()
    }

    /// Moves to `new`, raising `(old, new)` if it differs from the current state.
    ///
    /// The new state is committed before the raise, so handlers reading
    /// [`current`](Self::current) already see `new`.
    ///
    /// Returns `true` if the state changed.
    pub async fn set(&self, new: S) -> bool {
        let changed = {
            let mut state = self.state.lock().await;
            if *state == new {
                return false;
            }
            let old = std::mem::replace(&mut *state, new.clone());
            StateChanged { old, new }
        };

        self.event.raise((self.factory)(changed)).await;
        true
    }

    /// Replaces the state without raising.
    pub async fn set_silently(&self, value: S) {
        *self.state.lock().await = value;
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

impl<S, P> fmt::Debug for StateChangeEvent<S, P>
where
    S: PartialEq + Clone + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateChangeEvent")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}
