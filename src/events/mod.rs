//! Event calls: payload envelope and identifiers.
//!
//! This module groups the **data model** handed to handlers: one [`EventCall`]
//! per raise, carrying [`Metadata`] and the typed payload.
//!
//! ## Contents
//! - [`EventCall`], [`Metadata`], [`Priority`], [`Caller`] payload envelope
//! - [`EventId`], [`EventCallId`] UUIDv7 identifiers

mod call;
mod id;

pub use call::{Caller, EventCall, Metadata, Priority};
pub use id::{EventCallId, EventId};
