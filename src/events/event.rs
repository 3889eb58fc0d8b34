//! # Events emitted by the orchestrator.
//!
//! The [`EventKind`] enum classifies what happened to a role process or to
//! the run as a whole; [`Event`] carries the metadata. Every event gets a
//! globally unique, monotonically increasing sequence number so consumers
//! can order them even when delivered through async channels.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of orchestrator events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Run lifecycle ===
    /// IPC resources created and initialized; roles may attach.
    ResourcesReady,
    /// Shutdown requested (OS signal, console stop, or all roles gone).
    ShutdownRequested,
    /// All role processes exited within the grace period.
    AllStoppedWithin,
    /// Grace period exceeded; stragglers were killed.
    GraceExceeded,

    // === Role lifecycle ===
    /// A role process was spawned.
    RoleSpawned,
    /// A role process exited with status zero.
    RoleExited,
    /// A role process exited non-zero or was killed.
    RoleFailed,

    // === Subscriber plumbing ===
    /// A subscriber panicked while handling an event.
    SubscriberPanicked,
}

/// Orchestrator event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp; for logs only.
    pub at: SystemTime,
    pub kind: EventKind,
    /// Role name (`"worker-2"`, `"dispatcher"`), if applicable.
    pub role: Option<String>,
    /// Pid of the role process, if applicable.
    pub pid: Option<u32>,
    /// Exit code, for role exit events.
    pub exit_code: Option<i32>,
    /// Error message, when the event represents a failure.
    pub error: Option<String>,
}

impl Event {
    /// Creates an event of the given kind with the next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Event {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            role: None,
            pid: None,
            exit_code: None,
            error: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }

    /// Subscriber panic marker.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_role(subscriber)
            .with_error(info)
    }
}
