//! # Subscription: one live handler registration.
//!
//! A [`Subscription`] owns a handler plus its optional hooks and exception handler,
//! and has its own [`CancellationToken`]. It is created by
//! [`Event::subscribe`](crate::Event::subscribe) from a [`SubscriptionRequest`].
//!
//! ## State machine
//! ```text
//! Active ──dispose()──► Disposed      (one-way, idempotent)
//!
//! dispose():
//!   ├─► on_unsubscribe hook   (failure/panic logged, never surfaced)
//!   ├─► detach from owning event's subscriber set
//!   └─► cancel token
//! ```
//!
//! ## Rules
//! - Identity is object identity (`Arc::ptr_eq`), not content.
//! - The token is checked right before each invocation: a cancelled or disposed
//!   subscription skips the call (`HandlerError::Canceled`) instead of running it.
//! - Cancellation is cooperative: a handler that already started runs to completion.
//! - The back-reference to the owning set is weak; it is only used to deregister.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::HandlerError;
use crate::events::{EventCall, EventId};

use super::handler::{
    ExceptionHandler, Handler, HandlerFn, HandlerRef, SubscribeHook, UnsubscribeHook,
};
use super::set::SubscriberSet;

/// Global counter for subscription ids.
static SUBSCRIPTION_SEQ: AtomicU64 = AtomicU64::new(1);

/// Numeric id of a subscription, unique within the process. Used in logs.
pub type SubscriptionId = u64;

/// Everything needed to build a [`Subscription`].
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use intercom::{EventCall, HandlerError, SubscriptionRequest};
///
/// let req = SubscriptionRequest::new(|call: Arc<EventCall<u64>>| async move {
///     println!("got {}", call.payload);
///     Ok::<_, HandlerError>(())
/// })
/// .on_subscribe(|event_id| async move {
///     println!("subscribed to {event_id}");
///     Ok(())
/// })
/// .on_unsubscribe(|| async { Ok(()) })
/// .on_error(|err| eprintln!("handler failed: {err}"));
/// # let _ = req;
/// ```
pub struct SubscriptionRequest<P: Send + Sync + 'static> {
    handler: HandlerRef<P>,
    on_subscribe: Option<SubscribeHook>,
    on_unsubscribe: Option<UnsubscribeHook>,
    exception_handler: Option<ExceptionHandler>,
}

impl<P: Send + Sync + 'static> SubscriptionRequest<P> {
    /// Request for a closure handler.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<EventCall<P>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self::from_handler(HandlerFn::arc("fn", f))
    }

    /// Request for a [`Handler`] implementation.
    pub fn from_handler(handler: Arc<dyn Handler<P>>) -> Self {
        Self {
            handler,
            on_subscribe: None,
            on_unsubscribe: None,
            exception_handler: None,
        }
    }

    /// Hook run when the subscription is added; receives the event id.
    pub fn on_subscribe<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(EventId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on_subscribe = Some(Arc::new(move |id| f(id).boxed()));
        self
    }

    /// Hook run when the subscription is disposed.
    pub fn on_unsubscribe<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on_unsubscribe = Some(Arc::new(move || f().boxed()));
        self
    }

    /// Per-subscription exception handler; overrides the configured default.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&HandlerError) + Send + Sync + 'static,
    {
        self.exception_handler = Some(Arc::new(f));
        self
    }
}

/// A live handler registration on one event.
pub struct Subscription<P: Send + Sync + 'static> {
    id: SubscriptionId,
    handler: HandlerRef<P>,
    on_subscribe: Option<SubscribeHook>,
    on_unsubscribe: Option<UnsubscribeHook>,
    exception_handler: Option<ExceptionHandler>,
    token: CancellationToken,
    disposed: AtomicBool,
    owner: Weak<SubscriberSet<P>>,
}

impl<P: Send + Sync + 'static> Subscription<P> {
    pub(crate) fn new(req: SubscriptionRequest<P>, owner: Weak<SubscriberSet<P>>) -> Arc<Self> {
        Arc::new(Self {
            id: SUBSCRIPTION_SEQ.fetch_add(1, Ordering::Relaxed),
            handler: req.handler,
            on_subscribe: req.on_subscribe,
            on_unsubscribe: req.on_unsubscribe,
            exception_handler: req.exception_handler,
            token: CancellationToken::new(),
            disposed: AtomicBool::new(false),
            owner,
        })
    }

    /// Process-unique id (for logs).
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Handler name (for logs).
    #[inline]
    pub fn handler_name(&self) -> &str {
        self.handler.name()
    }

    /// Token cancelled when this subscription is disposed.
    ///
    /// Long-running handlers may watch it to stop early.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// True once [`dispose`](Self::dispose) has started.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Runs the handler for one call unless the subscription is cancelled.
    ///
    /// Panics are caught and returned as [`HandlerError::Panicked`].
    pub(crate) async fn invoke(&self, call: Arc<EventCall<P>>) -> Result<(), HandlerError> {
        if self.is_disposed() || self.token.is_cancelled() {
            return Err(HandlerError::Canceled);
        }
        let fut = AssertUnwindSafe(async move { self.handler.handle(call).await });
        match fut.catch_unwind().await {
            Ok(res) => res,
            Err(panic) => Err(HandlerError::from_panic(panic)),
        }
    }

    /// Routes a handler failure: own exception handler, else `fallback`, else dropped.
    ///
    /// `Canceled` is not a failure and is never routed.
    pub(crate) fn route_error(&self, err: HandlerError, fallback: Option<&ExceptionHandler>) {
        if err.is_canceled() {
            tracing::trace!(subscription = self.id, "invocation skipped: subscription cancelled");
            return;
        }
        let Some(handler) = self.exception_handler.as_ref().or(fallback) else {
            tracing::debug!(
                subscription = self.id,
                handler = self.handler_name(),
                error = %err,
                "handler error dropped: no exception handler"
            );
            return;
        };
        if std::panic::catch_unwind(AssertUnwindSafe(|| handler(&err))).is_err() {
            tracing::warn!(
                subscription = self.id,
                error = %err,
                "exception handler panicked"
            );
        }
    }

    /// Runs the subscribe hook, if any. Failures are logged.
    pub(crate) async fn run_subscribe_hook(&self, event_id: EventId) {
        if let Some(hook) = &self.on_subscribe {
            let res = AssertUnwindSafe(hook(event_id)).catch_unwind().await;
            self.report_hook("on_subscribe", res);
        }
    }

    /// Disposes the subscription: unsubscribe hook → detach → cancel.
    ///
    /// Idempotent: only the first call has an effect.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(hook) = &self.on_unsubscribe {
            let res = AssertUnwindSafe(hook()).catch_unwind().await;
            self.report_hook("on_unsubscribe", res);
        }

        if let Some(set) = self.owner.upgrade() {
            set.remove(self).await;
        }

        self.token.cancel();
        tracing::trace!(subscription = self.id, "subscription disposed");
    }

    fn report_hook(
        &self,
        hook: &'static str,
        res: Result<Result<(), HandlerError>, Box<dyn std::any::Any + Send>>,
    ) {
        let err = match res {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(panic) => HandlerError::from_panic(panic),
        };
        tracing::warn!(subscription = self.id, hook, error = %err, "subscription hook failed");
    }
}

impl<P: Send + Sync + 'static> fmt::Debug for Subscription<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("handler", &self.handler_name())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn detached<P: Send + Sync + 'static>(req: SubscriptionRequest<P>) -> Arc<Subscription<P>> {
        Subscription::new(req, Weak::new())
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent_and_runs_hook_once() {
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let hc = hook_calls.clone();
        let sub = detached(
            SubscriptionRequest::new(|_c: Arc<EventCall<()>>| async { Ok(()) }).on_unsubscribe(
                move || {
                    let hc = hc.clone();
                    async move {
                        hc.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
            ),
        );

        sub.dispose().await;
        sub.dispose().await;

        assert!(sub.is_disposed());
        assert!(sub.cancellation_token().is_cancelled());
        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disposed_subscription_skips_handler() {
        let runs = Arc::new(AtomicUsize::new(0));
        let r = runs.clone();
        let sub = detached(SubscriptionRequest::new(move |_c: Arc<EventCall<()>>| {
            let r = r.clone();
            async move {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));

        assert!(sub.invoke(Arc::new(EventCall::new(()))).await.is_ok());
        sub.dispose().await;
        let res = sub.invoke(Arc::new(EventCall::new(()))).await;

        assert_eq!(res, Err(HandlerError::Canceled));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_hook_does_not_stop_disposal() {
        let sub = detached(
            SubscriptionRequest::new(|_c: Arc<EventCall<()>>| async { Ok(()) })
                .on_unsubscribe(|| async { Err(HandlerError::fail("hook failed")) }),
        );
        sub.dispose().await;
        assert!(sub.cancellation_token().is_cancelled());

        let sub = detached(
            SubscriptionRequest::new(|_c: Arc<EventCall<()>>| async { Ok(()) })
                .on_unsubscribe(|| async {
                    if true {
                        panic!("hook panicked");
                    }
                    Ok(())
                }),
        );
        sub.dispose().await;
        assert!(sub.cancellation_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_panic_becomes_error() {
        let sub = detached(SubscriptionRequest::new(|_c: Arc<EventCall<()>>| async {
            if true {
                panic!("kaboom");
            }
            Ok(())
        }));
        let res = sub.invoke(Arc::new(EventCall::new(()))).await;
        assert_eq!(res, Err(HandlerError::Panicked { info: "kaboom".into() }));
    }

    #[test]
    fn test_route_error_prefers_own_handler() {
        let own: Arc<Mutex<Vec<String>>> = Arc::default();
        let fallback_hits: Arc<Mutex<Vec<String>>> = Arc::default();

        let o = own.clone();
        let sub = detached(
            SubscriptionRequest::new(|_c: Arc<EventCall<()>>| async { Ok(()) })
                .on_error(move |e| o.lock().unwrap().push(e.as_label().to_string())),
        );
        let fb = fallback_hits.clone();
        let fallback: ExceptionHandler =
            Arc::new(move |e: &HandlerError| fb.lock().unwrap().push(e.as_label().to_string()));

        sub.route_error(HandlerError::fail("x"), Some(&fallback));
        sub.route_error(HandlerError::Canceled, Some(&fallback));

        assert_eq!(*own.lock().unwrap(), vec!["handler_failed".to_string()]);
        assert!(fallback_hits.lock().unwrap().is_empty());

        let plain = detached(SubscriptionRequest::new(|_c: Arc<EventCall<()>>| async {
            Ok(())
        }));
        plain.route_error(HandlerError::fail("y"), Some(&fallback));
        plain.route_error(HandlerError::fail("z"), None);
        assert_eq!(fallback_hits.lock().unwrap().len(), 1);
    }
}
