//! # Event bus for broadcasting orchestrator events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]: every active subscriber
//! receives a clone of each event, publication never blocks, and events
//! published with no subscribers are dropped silently — the system operates
//! fine without observers.

use tokio::sync::broadcast;

use super::Event;

/// Broadcast channel for orchestrator events.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus with the given buffered capacity; the oldest unsent
    /// events are dropped on overflow.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event to all current subscribers (non-blocking).
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver for all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
