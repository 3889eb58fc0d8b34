//! # Error types used by the IPC facade and the orchestrator.
//!
//! Three enums cover the failure domains:
//!
//! - [`IpcError`] — failures of the shared primitives (segment, semaphores,
//!   queue) and protocol invariants.
//! - [`SessionError`] — registry admission failures.
//! - [`RuntimeError`] — orchestrator-level failures.
//!
//! All types provide `as_label` helpers for logs; [`IpcError`] additionally
//! classifies itself as fatal or cancellation.

use std::time::Duration;

use thiserror::Error;

/// # Failures of the shared IPC primitives.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum IpcError {
    /// A create/attach call on `(S, Σ, Q)` failed. Fatal; the process exits
    /// non-zero.
    #[error("ipc resource init failed in {call}: {source}")]
    ResourceInit {
        /// The failing call, e.g. `"shmget"`.
        call: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A blocking wait was abandoned because shutdown was requested.
    ///
    /// This is **not an error** in the traditional sense; callers unwind and
    /// run their session-scoped cleanup.
    #[error("shutting down")]
    ShuttingDown,

    /// `send` found the message queue saturated. The command may be lost;
    /// senders log a warning and do not retry.
    #[error("message queue is full")]
    QueueFull,

    /// The queue (or segment) disappeared under a blocking call — the owner
    /// destroyed it. Treated as end-of-work by callers.
    #[error("message queue removed while waiting")]
    QueueRemoved,

    /// A protocol invariant did not hold. Logged at critical; the affected
    /// role aborts its cycle.
    #[error("invariant violation: {detail}")]
    InvariantViolation { detail: String },
}

impl IpcError {
    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            IpcError::ResourceInit { .. } => "ipc_resource_init",
            IpcError::ShuttingDown => "ipc_shutting_down",
            IpcError::QueueFull => "ipc_queue_full",
            IpcError::QueueRemoved => "ipc_queue_removed",
            IpcError::InvariantViolation { .. } => "ipc_invariant_violation",
        }
    }

    /// True for conditions that must terminate the role process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IpcError::ResourceInit { .. } | IpcError::InvariantViolation { .. }
        )
    }

    /// True when the condition means "stop working", not "something broke".
    pub fn is_cancellation(&self) -> bool {
        matches!(self, IpcError::ShuttingDown | IpcError::QueueRemoved)
    }

    /// Wraps the current `errno` as a [`ResourceInit`](Self::ResourceInit).
    pub(crate) fn resource(call: &'static str) -> Self {
        IpcError::ResourceInit {
            call,
            source: std::io::Error::last_os_error(),
        }
    }
}

/// # Registry admission failures.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SessionError {
    /// An active row already carries this username.
    #[error("user '{name}' is already logged in")]
    DuplicateName { name: String },

    /// Every row of the session table is active.
    #[error("session table is full")]
    RegistryFull,

    /// The registry mutex could not be taken (shutdown, removed resources).
    #[error(transparent)]
    Ipc(#[from] IpcError),
}

impl SessionError {
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionError::DuplicateName { .. } => "session_duplicate_name",
            SessionError::RegistryFull => "session_registry_full",
            SessionError::Ipc(e) => e.as_label(),
        }
    }
}

/// # Errors produced by the orchestrator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; the named roles had to be killed.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}; killing")]
    GraceExceeded {
        grace: Duration,
        /// Roles that did not exit in time.
        stuck: Vec<String>,
    },

    /// A role binary could not be spawned.
    #[error("failed to spawn role '{role}': {source}")]
    Spawn {
        role: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Ipc(#[from] IpcError),
}

impl RuntimeError {
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Spawn { .. } => "runtime_spawn_failed",
            RuntimeError::Ipc(e) => e.as_label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_not_fatal() {
        assert!(IpcError::ShuttingDown.is_cancellation());
        assert!(IpcError::QueueRemoved.is_cancellation());
        assert!(!IpcError::ShuttingDown.is_fatal());
        assert!(!IpcError::QueueFull.is_cancellation());
    }

    #[test]
    fn fatal_conditions_are_classified() {
        let violation = IpcError::InvariantViolation {
            detail: "count went negative".into(),
        };
        assert!(violation.is_fatal());
        assert!(IpcError::resource("shmget").is_fatal());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(IpcError::QueueFull.as_label(), "ipc_queue_full");
        assert_eq!(SessionError::RegistryFull.as_label(), "session_registry_full");
        let wrapped = RuntimeError::Ipc(IpcError::ShuttingDown);
        assert_eq!(wrapped.as_label(), "ipc_shutting_down");
    }
}
