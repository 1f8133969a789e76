//! # Subscribers: handlers and their registrations.
//!
//! This module provides the [`Handler`] trait, the closure-backed [`HandlerFn`],
//! and the [`Subscription`] object representing one live registration on an event.
//!
//! ## Architecture
//! ```text
//! SubscriptionRequest ──► Event::subscribe() ──► Subscription ──► SubscriberSet
//!   (handler, hooks,                               (token,           (ordered,
//!    exception handler)                             disposed flag)    snapshots)
//!
//! dispatch:  snapshot ──► Subscription::invoke(call) ──► Handler::handle(call)
//!                                 │
//!                                 └─ Err / panic ──► own exception handler
//!                                                    └─► Config default
//!                                                        └─► dropped
//! ```

mod handler;
#[cfg(feature = "logging")]
mod log;
mod set;
mod subscription;

pub use handler::{
    ExceptionHandler, Handler, HandlerFn, HandlerRef, SubscribeHook, UnsubscribeHook,
};
pub(crate) use set::{Insert, SubscriberSet};
pub use subscription::{Subscription, SubscriptionId, SubscriptionRequest};

#[cfg(feature = "logging")]
pub use log::LogExceptions;
