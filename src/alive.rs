//! # Role lifecycle tracker with sequence-based ordering.
//!
//! Maintains the authoritative view of which role processes are currently
//! alive, using event sequence numbers to reject stale, out-of-order
//! deliveries. The supervisor consults the snapshot during shutdown to name
//! the roles that did not stop within the grace period.
//!
//! ## Rules
//! - **Alive = true** on `RoleSpawned`.
//! - **Alive = false** on `RoleExited` / `RoleFailed`.
//! - Events with `seq <= last_seq` for the role are rejected as stale.
//! - Read operations are eventually consistent.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

/// Per-role state for ordering validation.
#[derive(Debug, Clone)]
struct RoleState {
    last_seq: u64,
    alive: bool,
}

/// Thread-safe tracker of alive role processes.
pub struct AliveTracker {
    state: RwLock<HashMap<String, RoleState>>,
}

impl AliveTracker {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Applies an event if it is newer than the last one seen for its role.
    ///
    /// Returns `true` when the alive flag changed.
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(name) = ev.role.as_deref() else {
            return false;
        };

        let mut map = self.state.write().await;
        let entry = map.entry(name.to_string()).or_insert(RoleState {
            last_seq: 0,
            alive: false,
        });
        if ev.seq <= entry.last_seq {
            return false;
        }

        let next_alive = match ev.kind {
            EventKind::RoleSpawned => true,
            EventKind::RoleExited | EventKind::RoleFailed => false,
            _ => entry.alive,
        };

        let changed = next_alive != entry.alive;
        entry.alive = next_alive;
        entry.last_seq = ev.seq;
        changed
    }

    /// Sorted names of currently alive roles.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, rs)| rs.alive)
            .map(|(name, _)| name.clone())
            .collect();
        alive.sort_unstable();
        alive
    }

    pub async fn is_alive(&self, name: &str) -> bool {
        self.state
            .read()
            .await
            .get(name)
            .map(|rs| rs.alive)
            .unwrap_or(false)
    }
}

impl Default for AliveTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_then_exit_toggles_alive() {
        let tracker = AliveTracker::new();
        let spawned = Event::now(EventKind::RoleSpawned).with_role("truck-1");
        let exited = Event::now(EventKind::RoleExited).with_role("truck-1");

        assert!(tracker.update(&spawned).await);
        assert!(tracker.is_alive("truck-1").await);

        assert!(tracker.update(&exited).await);
        assert!(!tracker.is_alive("truck-1").await);
    }

    #[tokio::test]
    async fn stale_events_are_rejected() {
        let tracker = AliveTracker::new();
        let spawned = Event::now(EventKind::RoleSpawned).with_role("worker-1");
        let exited = Event::now(EventKind::RoleExited).with_role("worker-1");

        // Deliver out of order: the exit (newer seq) first.
        tracker.update(&exited).await;
        assert!(!tracker.update(&spawned).await);
        assert!(!tracker.is_alive("worker-1").await);
    }

    #[tokio::test]
    async fn snapshot_is_sorted_and_filtered() {
        let tracker = AliveTracker::new();
        for name in ["worker-2", "dispatcher", "worker-1"] {
            tracker
                .update(&Event::now(EventKind::RoleSpawned).with_role(name))
                .await;
        }
        tracker
            .update(&Event::now(EventKind::RoleExited).with_role("worker-2"))
            .await;

        assert_eq!(tracker.snapshot().await, vec!["dispatcher", "worker-1"]);
    }
}
