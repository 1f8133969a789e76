//! # Run a single handler invocation under the soft timeout.
//!
//! Every handler invocation (fast path, sequential, parallel batch) goes through
//! [`run_soft`].
//!
//! ## Flow
//! ```text
//! tracker.spawn(invoke(call) → on Err: route_error)
//!    │
//!    ├─ finished before soft timeout ─► done (error already routed)
//!    │
//!    └─ soft timeout elapsed ─► NOT cancelled
//!                                └─► handle dropped, task stays in the tracker
//!                                    (error still routed when it finishes)
//! ```
//!
//! ## Rules
//! - The handler runs in its own task so it can outlive the dispatch.
//! - The task is tracked from the moment it is spawned; `Event::dispose` waits on the tracker.
//! - Timeout is a liveness bound, never cancellation.
//! - Errors and panics are routed inside the task, so detached handlers report too.
//! - No soft timeout configured (`0s`) → wait for completion.

use std::sync::Arc;

use tokio::time;
use tokio_util::task::TaskTracker;

use crate::core::config::Config;
use crate::events::EventCall;
use crate::subscribers::Subscription;

/// Runs `sub` for `call`, returning once it finished or the soft timeout elapsed.
pub(crate) async fn run_soft<P: Send + Sync + 'static>(
    sub: Arc<Subscription<P>>,
    call: Arc<EventCall<P>>,
    cfg: &Config,
    tracker: &TaskTracker,
) {
    let fallback = cfg.default_exception_handler.clone();
    let id = sub.id();

    let mut join = tracker.spawn(async move {
        if let Err(err) = sub.invoke(call).await {
            sub.route_error(err, fallback.as_ref());
        }
    });

    let Some(limit) = cfg.soft_timeout() else {
        if let Err(err) = join.await {
            tracing::warn!(subscription = id, error = %err, "handler task did not complete");
        }
        return;
    };

    match time::timeout(limit, &mut join).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::warn!(subscription = id, error = %err, "handler task did not complete");
        }
        Err(_elapsed) => {
            tracing::trace!(
                subscription = id,
                soft_timeout = ?limit,
                "handler exceeded soft timeout; continuing in background"
            );
        }
    }
}
