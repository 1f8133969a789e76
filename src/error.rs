//! Error types used by the intercom engine and by event handlers.
//!
//! This module defines two main error enums:
//!
//! - [`EventError`]: errors returned to the caller by event operations (subscription).
//! - [`HandlerError`]: errors produced by individual handler invocations.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! A [`HandlerError`] never reaches the code that raised the event: it is routed to
//! the subscription's exception handler, the configured default, or dropped.

use std::fmt::Display;

use thiserror::Error;

use crate::events::EventId;

/// # Errors returned by event operations.
///
/// These represent misuse of an event by the caller, such as subscribing a second
/// handler when the configuration only allows one.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The configuration forbids more than one subscriber and one is already registered.
    #[error("multiple subscribers are not allowed for event {event_id}")]
    MultipleSubscribers {
        /// The event that rejected the subscription.
        event_id: EventId,
    },

    /// The event was disposed and no longer accepts subscriptions.
    #[error("event {event_id} is disposed")]
    Disposed {
        /// The disposed event.
        event_id: EventId,
    },
}

impl EventError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use intercom::{EventError, EventId};
    ///
    /// let err = EventError::Disposed { event_id: EventId::new() };
    /// assert_eq!(err.as_label(), "event_disposed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EventError::MultipleSubscribers { .. } => "event_multiple_subscribers",
            EventError::Disposed { .. } => "event_disposed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EventError::MultipleSubscribers { event_id } => {
                format!("subscriber rejected: event={event_id} allows a single subscriber")
            }
            EventError::Disposed { event_id } => format!("event={event_id} disposed"),
        }
    }
}

/// # Errors produced by handler invocations.
///
/// Handlers return `Result<(), HandlerError>`. The runtime also produces
/// [`HandlerError::Panicked`] when a handler panics and [`HandlerError::Canceled`]
/// when an invocation is skipped because its subscription was cancelled.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler body failed.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Handler panicked; the panic was caught by the runtime.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Invocation skipped: the subscription was cancelled before it started.
    #[error("subscription cancelled")]
    Canceled,
}

impl HandlerError {
    /// Builds a [`HandlerError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use intercom::HandlerError;
    ///
    /// let err = HandlerError::fail("disk full");
    /// assert_eq!(err.to_string(), "handler failed: disk full");
    /// ```
    pub fn fail(error: impl Display) -> Self {
        HandlerError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Panicked { .. } => "handler_panicked",
            HandlerError::Canceled => "handler_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Fail { error } => format!("error: {error}"),
            HandlerError::Panicked { info } => format!("panic: {info}"),
            HandlerError::Canceled => "subscription cancelled".to_string(),
        }
    }

    /// True for the runtime-generated "skipped" outcome.
    ///
    /// Cancelled invocations are not failures and are never routed to exception handlers.
    pub fn is_canceled(&self) -> bool {
        matches!(self, HandlerError::Canceled)
    }

    /// Renders a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        HandlerError::Panicked { info }
    }
}
