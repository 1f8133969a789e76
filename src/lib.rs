//! # intercom
//!
//! **Intercom** is an in-process async event engine for Rust.
//!
//! Producers raise typed *event calls*; any number of independently registered
//! handlers receive them. The engine decides how handlers run (sequentially or
//! in bounded parallel batches), keeps slow handlers from blocking the producer,
//! and keeps handler failures away from the code that raised the event.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ThresholdEvent   DebounceEvent   TimedEvent   StateChangeEvent
//!   (value ≥ limit)  (input settled) (interval)   (old ≠ new)
//!          │               │              │              │
//!          └───────────────┴──────┬───────┴──────────────┘
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Event<P> (dispatch point)                                        │
//! │  - Arc<Config> (sync type, batch size, soft timeout, ...)         │
//! │  - SubscriberSet (ordered, identity-unique, snapshotted)          │
//! │  - TaskTracker (every handler task, awaited by dispose)           │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//!                     notify(snapshot, Arc<EventCall<P>>)
//!                 ┌──────────────┼───────────────────┐
//!                 ▼              ▼                   ▼
//!           1 subscriber     Sequential         Parallel (batches of
//!           (fast path)      (in order)          max_concurrent_handlers)
//!                 │              │                   │
//!                 └──────────────┴─────────┬─────────┘
//!                                          ▼
//!                       run_soft: spawn handler, race soft timeout
//!                          ├─ done in time ─► outcome routed
//!                          └─ timed out    ─► left on the tracker (routed later)
//!                                          ▼
//!                    Err / panic ─► subscription's exception handler
//!                                   └─► Config::default_exception_handler
//!                                       └─► dropped (tracing debug)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Event::new(cfg)
//!   ├─► subscribe(req) ──► on_subscribe hook ──► Subscription (Active)
//!   ├─► raise(payload) ──► notify (never fails, never panics)
//!   ├─► unsubscribe(&s) ─► on_unsubscribe hook ─► cancel token ─► Disposed
//!   └─► dispose() ───────► dispose every Subscription ─► close + wait tracker
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                                  |
//! |-------------------|--------------------------------------------------------------------|-----------------------------------------------------|
//! | **Events**        | Raise typed calls to many subscribers with bounded concurrency.    | [`Event`], [`EventCall`], [`Metadata`]              |
//! | **Subscribers**   | Closure or trait handlers with hooks and exception handlers.       | [`Handler`], [`HandlerFn`], [`Subscription`]        |
//! | **Variants**      | Threshold, debounce, timed and state-change triggers.              | [`ThresholdEvent`], [`DebounceEvent`], [`TimedEvent`], [`StateChangeEvent`] |
//! | **Errors**        | Typed errors for subscription and handler failures.                | [`EventError`], [`HandlerError`]                    |
//! | **Configuration** | Dispatch policy shared by events.                                  | [`Config`], [`SyncType`]                            |
//!
//! ## Optional features
//! - `logging`: exports [`LogExceptions`], an exception handler writing failures through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use intercom::{Config, Event, EventCall, HandlerError, SubscriptionRequest, SyncType};
//!
//! #[derive(Debug)]
//! struct OrderPlaced { id: u64 }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         sync_type: SyncType::Parallel,
//!         max_concurrent_handlers: 8,
//!         start_next_handler_after: Duration::from_millis(250),
//!         ..Config::default()
//!     }
//!     .with_default_exception_handler(|err| eprintln!("handler failed: {err}"));
//!
//!     let placed: Event<OrderPlaced> = Event::new(Arc::new(cfg));
//!
//!     placed
//!         .subscribe(
//!             SubscriptionRequest::new(|call: Arc<EventCall<OrderPlaced>>| async move {
//!                 println!("billing order {}", call.payload.id);
//!                 Ok::<_, HandlerError>(())
//!             })
//!             .on_error(|err| eprintln!("billing failed: {err}")),
//!         )
//!         .await?;
//!
//!     placed
//!         .subscribe_fn(|call: Arc<EventCall<OrderPlaced>>| async move {
//!             Err(HandlerError::fail(format!("warehouse offline for {}", call.payload.id)))
//!         })
//!         .await?;
//!
//!     // Never fails: the warehouse error goes to the default exception handler.
//!     placed.raise(OrderPlaced { id: 42 }).await;
//!
//!     placed.dispose().await;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod subscribers;
mod variants;

// ---- Public re-exports ----

pub use crate::core::{Config, Event, SyncType};
pub use error::{EventError, HandlerError};
pub use events::{Caller, EventCall, EventCallId, EventId, Metadata, Priority};
pub use subscribers::{
    ExceptionHandler, Handler, HandlerFn, HandlerRef, SubscribeHook, Subscription,
    SubscriptionId, SubscriptionRequest, UnsubscribeHook,
};
pub use variants::{
    DebounceEvent, Debounced, PayloadFactory, StateChangeEvent, StateChanged, ThresholdEvent,
    ThresholdReached, ThresholdTrigger, Tick, TimedEvent,
};

// Optional: expose a tracing-backed default exception handler.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogExceptions;
