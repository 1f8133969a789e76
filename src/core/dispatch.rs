//! # Notify algorithm.
//!
//! Delivers one call to a snapshot of subscribers according to [`Config`].
//!
//! ```text
//! notify(snapshot, call)
//!   ├─ 0 subscribers ─► return
//!   ├─ 1 subscriber  ─► run_soft(sub)                         (fast path)
//!   └─ N subscribers
//!        ├─ Sequential ─► for sub in order: run_soft(sub)
//!        └─ Parallel   ─► for batch in chunks(limit):
//!                            join_all(run_soft(sub) for sub in batch)
//! ```
//!
//! ## Rules
//! - Sequential keeps insertion order; a slow or failing handler never stops later ones.
//! - Parallel awaits at most `limit` handlers directly at any instant.
//! - Batch N+1 starts once batch N's direct wait resolved; stragglers detached by
//!   the soft timeout may still be running (only `Event::dispose` waits for them,
//!   through the tracker every handler task is spawned on).

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::task::TaskTracker;

use crate::core::config::{Config, SyncType};
use crate::core::runner::run_soft;
use crate::events::EventCall;
use crate::subscribers::Subscription;

/// Delivers `call` to every subscription in `subs`.
pub(crate) async fn notify<P: Send + Sync + 'static>(
    subs: Vec<Arc<Subscription<P>>>,
    call: Arc<EventCall<P>>,
    cfg: &Config,
    tracker: &TaskTracker,
) {
    match subs.len() {
        0 => {}
        1 => {
            let sub = Arc::clone(&subs[0]);
            run_soft(sub, call, cfg, tracker).await;
        }
        n => match cfg.sync_type {
            SyncType::Sequential => {
                for sub in subs {
                    run_soft(sub, Arc::clone(&call), cfg, tracker).await;
                }
            }
            SyncType::Parallel => {
                let limit = cfg.concurrency_limit();
                if limit < n {
                    tracing::trace!(
                        subscribers = n,
                        batch = limit,
                        "dispatching in batches"
                    );
                }
                for batch in subs.chunks(limit) {
                    join_all(
                        batch
                            .iter()
                            .map(|sub| run_soft(Arc::clone(sub), Arc::clone(&call), cfg, tracker)),
                    )
                    .await;
                }
            }
        },
    }
}
