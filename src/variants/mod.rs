//! # Variants: events with built-in trigger behaviour.
//!
//! Each variant owns an [`Event`](crate::Event) and decides *when* to raise it:
//!
//! | Variant              | Raises when                                   | Default payload          |
//! |----------------------|-----------------------------------------------|--------------------------|
//! | [`ThresholdEvent`]   | the value satisfies the threshold predicate   | [`ThresholdReached<V>`]  |
//! | [`DebounceEvent`]    | inputs settled for one full interval          | [`Debounced<I>`]         |
//! | [`TimedEvent`]       | every interval tick (or once)                 | [`Tick`]                 |
//! | [`StateChangeEvent`] | the state changed to an unequal value         | [`StateChanged<S>`]      |
//!
//! Every variant can be built with a payload factory instead of its default
//! payload, so subscribers receive a domain type directly:
//!
//! ```rust
//! use std::sync::Arc;
//! use intercom::{Config, StateChangeEvent, StateChanged};
//!
//! #[derive(Debug)]
//! struct PowerToggled { on: bool }
//!
//! let power = StateChangeEvent::with_factory(
//!     false,
//!     Arc::new(Config::default()),
//!     |c: StateChanged<bool>| PowerToggled { on: c.new },
//! );
//! # let _ = power;
//! ```

use std::sync::Arc;

mod debounce;
mod state_change;
mod threshold;
mod timed;

pub use debounce::{DebounceEvent, Debounced};
pub use state_change::{StateChangeEvent, StateChanged};
pub use threshold::{ThresholdEvent, ThresholdReached, ThresholdTrigger};
pub use timed::{Tick, TimedEvent};

/// Maps a variant's default payload `D` into the payload `P` handed to subscribers.
pub type PayloadFactory<D, P> = Arc<dyn Fn(D) -> P + Send + Sync>;
