//! # Orchestrator lifecycle events.
//!
//! The orchestrator publishes role-process lifecycle events on a broadcast
//! [`Bus`]; subscribers (log writer, alive tracker) consume them without
//! ever blocking the publisher.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
