//! # Handler trait and closure-backed handlers.
//!
//! Provides [`Handler`], the extension point invoked once per [`EventCall`], and
//! [`HandlerFn`], which wraps a closure `F: Fn(Arc<EventCall<P>>) -> Fut` and
//! produces a fresh future per call.
//!
//! ## Rules
//! - A handler receives the call as `Arc<EventCall<P>>`; the same call is shared by
//!   every handler of one dispatch.
//! - Errors are returned, not thrown at the raiser: they go to the subscription's
//!   exception handler (or the configured default).
//! - Panics are caught and reported as [`HandlerError::Panicked`].
//! - A handler may outlive the dispatch (soft timeout); keep it `'static`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use intercom::{EventCall, Handler, HandlerError};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Handler<String> for Audit {
//!     async fn handle(&self, call: Arc<EventCall<String>>) -> Result<(), HandlerError> {
//!         if call.payload.is_empty() {
//!             return Err(HandlerError::fail("empty payload"));
//!         }
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &str { "audit" }
//! }
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::HandlerError;
use crate::events::{EventCall, EventId};

/// Receives failures of a subscription's handler.
pub type ExceptionHandler = Arc<dyn Fn(&HandlerError) + Send + Sync>;

/// Runs when a subscription is added to an event.
pub type SubscribeHook =
    Arc<dyn Fn(EventId) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Runs when a subscription is disposed.
pub type UnsubscribeHook =
    Arc<dyn Fn() -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Shared handler reference.
pub type HandlerRef<P> = Arc<dyn Handler<P>>;

/// Event handler.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Return errors instead of panicking; panics are caught but leave no context.
/// - Long-running work is allowed: past the soft timeout it continues in the background.
#[async_trait]
pub trait Handler<P: Send + Sync + 'static>: Send + Sync + 'static {
    /// Handles a single call.
    async fn handle(&self, call: Arc<EventCall<P>>) -> Result<(), HandlerError>;

    /// Returns the handler name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Function-backed handler.
///
/// Wraps a closure that *creates* a new future per call.
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<P, F, Fut> Handler<P> for HandlerFn<F>
where
    P: Send + Sync + 'static,
    F: Fn(Arc<EventCall<P>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, call: Arc<EventCall<P>>) -> Result<(), HandlerError> {
        (self.f)(call).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
