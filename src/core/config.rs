//! # Dispatch configuration.
//!
//! Provides [`Config`], the dispatch policy shared by every event built from it.
//!
//! Config is constructed once (usually at process start), wrapped in an `Arc`
//! and passed to each event at construction:
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use intercom::{Config, Event};
//!
//! let cfg = Arc::new(
//!     Config::parallel()
//!         .with_max_concurrent_handlers(16)
//!         .with_soft_timeout(Duration::from_millis(250)),
//! );
//! let ev: Event<String> = Event::new(cfg.clone());
//! assert_eq!(ev.config().concurrency_limit(), 16);
//! ```
//!
//! ## Sentinel values
//! - `max_concurrent_handlers = 0` → clamped to 1
//! - `start_next_handler_after = 0s` → no soft timeout (dispatch waits for every handler)

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::HandlerError;
use crate::subscribers::ExceptionHandler;

/// How handlers of one dispatch are scheduled relative to each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncType {
    /// One handler at a time, in subscription order.
    Sequential,
    /// Concurrently, bounded by [`Config::max_concurrent_handlers`] (default).
    #[default]
    Parallel,
}

/// Dispatch policy for events.
///
/// ## Field semantics
/// - `sync_type`: sequential or bounded-parallel dispatch
/// - `max_concurrent_handlers`: batch size for parallel dispatch (`0` is clamped to 1)
/// - `allow_multiple_subscribers`: `false` limits every event to a single subscriber
/// - `start_next_handler_after`: soft timeout per handler (`0s` = none)
/// - `default_exception_handler`: receives handler failures of subscriptions without their own handler
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone)]
pub struct Config {
    /// Sequential vs. parallel dispatch.
    pub sync_type: SyncType,

    /// Maximum number of handlers awaited concurrently within one dispatch.
    ///
    /// When an event has more subscribers than this, parallel dispatch runs them
    /// in consecutive batches of this size.
    pub max_concurrent_handlers: usize,

    /// Whether more than one subscriber may subscribe to the same event.
    pub allow_multiple_subscribers: bool,

    /// Soft timeout after which dispatch stops waiting for a handler.
    ///
    /// The handler is **not** cancelled: it keeps running in the background and
    /// its outcome is still reported. `Event::dispose` waits for it.
    pub start_next_handler_after: Duration,

    /// Exception handler used when a subscription has none.
    ///
    /// `None` means failures of such subscriptions are dropped.
    pub default_exception_handler: Option<ExceptionHandler>,
}

impl Config {
    /// Parallel dispatch with default settings (same as [`Config::default`]).
    pub fn parallel() -> Self {
        Self::default()
    }

    /// Sequential dispatch; `max_concurrent_handlers` defaults to 1.
    pub fn sequential() -> Self {
        Self {
            sync_type: SyncType::Sequential,
            max_concurrent_handlers: 1,
            ..Self::default()
        }
    }

    /// Sets the parallel batch size.
    pub fn with_max_concurrent_handlers(mut self, n: usize) -> Self {
        self.max_concurrent_handlers = n;
        self
    }

    /// Sets the per-handler soft timeout.
    pub fn with_soft_timeout(mut self, after: Duration) -> Self {
        self.start_next_handler_after = after;
        self
    }

    /// Allows or forbids more than one subscriber per event.
    pub fn with_multiple_subscribers(mut self, allow: bool) -> Self {
        self.allow_multiple_subscribers = allow;
        self
    }

    /// Installs the default exception handler.
    pub fn with_default_exception_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&HandlerError) + Send + Sync + 'static,
    {
        self.default_exception_handler = Some(Arc::new(f));
        self
    }

    /// Returns the parallel batch size clamped to a minimum of 1.
    #[inline]
    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrent_handlers.max(1)
    }

    /// Returns the soft timeout as an `Option`.
    ///
    /// - `None` → dispatch waits for every handler to finish
    /// - `Some(d)` → handlers still running after `d` continue in the background
    #[inline]
    pub fn soft_timeout(&self) -> Option<Duration> {
        if self.start_next_handler_after == Duration::ZERO {
            None
        } else {
            Some(self.start_next_handler_after)
        }
    }

    /// True when handlers run one at a time.
    #[inline]
    pub fn is_sequential(&self) -> bool {
        self.sync_type == SyncType::Sequential
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `sync_type = Parallel`
    /// - `max_concurrent_handlers = 100`
    /// - `allow_multiple_subscribers = true`
    /// - `start_next_handler_after = 1s`
    /// - `default_exception_handler = None` (failures are dropped)
    fn default() -> Self {
        Self {
            sync_type: SyncType::Parallel,
            max_concurrent_handlers: 100,
            allow_multiple_subscribers: true,
            start_next_handler_after: Duration::from_secs(1),
            default_exception_handler: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("sync_type", &self.sync_type)
            .field("max_concurrent_handlers", &self.max_concurrent_handlers)
            .field("allow_multiple_subscribers", &self.allow_multiple_subscribers)
            .field("start_next_handler_after", &self.start_next_handler_after)
            .field(
                "default_exception_handler",
                &self.default_exception_handler.is_some(),
            )
            .finish()
    }
}
