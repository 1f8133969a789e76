//! # Event calls: the payload envelope of a single raise.
//!
//! Every raise produces one [`EventCall`], shared as `Arc<EventCall<P>>` by all
//! handlers of that dispatch. The envelope carries [`Metadata`] (identity, ordering,
//! timestamp, optional caller) next to the typed payload.
//!
//! ## Ordering
//! Each call has a process-wide sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore raise order when handlers observe calls out of order
//! (parallel dispatch or detached handlers).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use intercom::{EventCall, Priority};
//!
//! struct Server { name: &'static str }
//! let server = Arc::new(Server { name: "db-01" });
//!
//! let call = EventCall::new("powered on")
//!     .with_priority(Priority::High)
//!     .with_caller(&server);
//!
//! assert_eq!(call.payload, "powered on");
//! assert_eq!(call.metadata.caller_as::<Server>().unwrap().name, "db-01");
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use super::id::{EventCallId, EventId};

/// Global sequence counter for call ordering.
static CALL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Informational priority attached to a call.
///
/// The engine does not reorder dispatch by priority; handlers may use it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Non-owning reference to whoever raised the call.
///
/// Holding a `Caller` never keeps the raiser alive.
#[derive(Clone)]
pub struct Caller(Weak<dyn Any + Send + Sync>);

impl Caller {
    /// Captures a weak reference to `caller`.
    pub fn new<C: Any + Send + Sync>(caller: &Arc<C>) -> Self {
        let erased: Arc<dyn Any + Send + Sync> = caller.clone();
        Self(Arc::downgrade(&erased))
    }

    /// Returns the raiser if it is still alive.
    pub fn upgrade(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.0.upgrade()
    }

    /// Returns the raiser as `C` if it is still alive and has that type.
    pub fn downcast<C: Any + Send + Sync>(&self) -> Option<Arc<C>> {
        self.0.upgrade()?.downcast::<C>().ok()
    }

    /// True while the raiser is alive.
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caller")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Per-call metadata.
///
/// - `event_id`: the event that dispatched this call (stamped at raise time)
/// - `call_id`: unique id of this call
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp of the raise
/// - `priority`: informational priority
/// - `caller`: optional weak reference to the raiser
#[derive(Clone, Debug)]
pub struct Metadata {
    /// Owning event (back-reference by id only).
    pub event_id: Option<EventId>,
    /// Unique id of this call.
    pub call_id: EventCallId,
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp of the raise.
    pub at: SystemTime,
    /// Informational priority.
    pub priority: Priority,
    /// Raiser, if supplied.
    pub caller: Option<Caller>,
}

impl Metadata {
    fn new() -> Self {
        Self {
            event_id: None,
            call_id: EventCallId::new(),
            seq: CALL_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            priority: Priority::default(),
            caller: None,
        }
    }

    /// Returns the raiser as `C` if present, alive, and of that type.
    pub fn caller_as<C: Any + Send + Sync>(&self) -> Option<Arc<C>> {
        self.caller.as_ref()?.downcast::<C>()
    }
}

/// Payload of a single raise plus its [`Metadata`].
#[derive(Clone, Debug)]
pub struct EventCall<P> {
    pub metadata: Metadata,
    pub payload: P,
}

impl<P> EventCall<P> {
    /// Wraps `payload` with fresh metadata (new call id, next sequence number, current time).
    pub fn new(payload: P) -> Self {
        Self {
            metadata: Metadata::new(),
            payload,
        }
    }

    /// Attaches a weak reference to the raiser.
    #[inline]
    pub fn with_caller<C: Any + Send + Sync>(mut self, caller: &Arc<C>) -> Self {
        self.metadata.caller = Some(Caller::new(caller));
        self
    }

    /// Attaches a priority.
    #[inline]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.metadata.priority = priority;
        self
    }

    /// Stamps owning event and raise time. Called by the event core right before dispatch.
    #[inline]
    pub(crate) fn stamp(mut self, event_id: EventId) -> Self {
        self.metadata.event_id = Some(event_id);
        self.metadata.at = SystemTime::now();
        self
    }

    /// Shorthand for `&self.payload`.
    #[inline]
    pub fn payload(&self) -> &P {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Raiser;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = EventCall::new(());
        let b = EventCall::new(());
        assert!(b.metadata.seq > a.metadata.seq);
        assert_ne!(a.metadata.call_id, b.metadata.call_id);
    }

    #[test]
    fn test_caller_is_weak() {
        let raiser = Arc::new(Raiser);
        let call = EventCall::new(1_u32).with_caller(&raiser);

        assert!(call.metadata.caller_as::<Raiser>().is_some());
        assert!(call.metadata.caller_as::<String>().is_none());

        drop(raiser);
        let caller = call.metadata.caller.as_ref().unwrap();
        assert!(!caller.is_alive());
        assert!(call.metadata.caller_as::<Raiser>().is_none());
    }

    #[test]
    fn test_stamp_sets_event_id() {
        let id = EventId::new();
        let call = EventCall::new("x").with_priority(Priority::Low).stamp(id);
        assert_eq!(call.metadata.event_id, Some(id));
        assert_eq!(call.metadata.priority, Priority::Low);
    }
}
