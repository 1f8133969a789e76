//! Event core: configuration, the [`Event`] dispatch point and the notify algorithm.
//!
//! Internal modules:
//! - [`dispatch`]: fast path / sequential / bounded-parallel delivery of one call;
//! - [`runner`]: runs one handler invocation under the soft timeout.

mod config;
mod dispatch;
mod event;
mod runner;

pub use config::{Config, SyncType};
pub use event::Event;
