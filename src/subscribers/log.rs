//! # Logging exception handler.
//!
//! [`LogExceptions`] writes handler failures through `tracing`, so failures that
//! would otherwise be dropped end up in the application's log.
//!
//! ## Output
//! ```text
//! ERROR intercom: handler failed label="handler_failed" error="connection refused"
//! ERROR intercom: handler panicked label="handler_panicked" info="index out of bounds"
//! ```
//!
//! ## Example
//! ```rust
//! use intercom::{Config, LogExceptions};
//!
//! let cfg = Config::default().with_default_exception_handler(LogExceptions::log);
//! # let _ = cfg;
//! ```

use std::sync::Arc;

use tracing::Level;

use crate::error::HandlerError;

use super::ExceptionHandler;

/// Exception handler that logs every routed failure.
///
/// Enabled via the `logging` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExceptions;

impl LogExceptions {
    /// Logs one handler failure.
    pub fn log(err: &HandlerError) {
        if Self::level(err) != Level::ERROR {
            tracing::debug!(label = err.as_label(), "handler not run");
            return;
        }
        match err {
            HandlerError::Panicked { info } => {
                tracing::error!(label = err.as_label(), info = %info, "handler panicked");
            }
            HandlerError::Fail { error } => {
                tracing::error!(label = err.as_label(), error = %error, "handler failed");
            }
            other => {
                tracing::error!(label = other.as_label(), "handler failed");
            }
        }
    }

    /// Level a failure is logged at: handler faults at `ERROR`, skipped runs at `DEBUG`.
    pub(crate) fn level(err: &HandlerError) -> Level {
        match err {
            HandlerError::Fail { .. } | HandlerError::Panicked { .. } => Level::ERROR,
            HandlerError::Canceled => Level::DEBUG,
        }
    }

    /// Returns [`LogExceptions::log`] as a shareable [`ExceptionHandler`].
    #[must_use]
    pub fn handler() -> ExceptionHandler {
        Arc::new(Self::log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faults_log_at_error_and_skips_at_debug() {
        let fail = HandlerError::fail("boom");
        let panicked = HandlerError::Panicked { info: "oops".into() };
        let canceled = HandlerError::Canceled;

        assert_eq!(LogExceptions::level(&fail), Level::ERROR);
        assert_eq!(LogExceptions::level(&panicked), Level::ERROR);
        assert_eq!(LogExceptions::level(&canceled), Level::DEBUG);

        assert_eq!(fail.as_label(), "handler_failed");
        assert_eq!(panicked.as_label(), "handler_panicked");
        assert_ne!(canceled.as_label(), fail.as_label());

        let handler = LogExceptions::handler();
        handler(&fail);
        handler(&canceled);
    }
}
