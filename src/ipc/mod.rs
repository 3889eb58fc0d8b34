//! # IPC facade over the shared primitives.
//!
//! Everything `unsafe` in the crate lives here. The facade wraps the three
//! System-V resources — shared memory segment, semaphore set, message queue
//! — behind safe types, and exposes one seam to the rest of the crate:
//! the [`Ipc`] trait, implemented by [`IpcContext`] for real cross-process
//! runs and by [`LocalIpc`](crate::testing::LocalIpc) for in-process tests.
//!
//! ## Architecture
//! ```text
//! worker / dispatcher / truck / express / terminal
//!        │ (&impl Ipc)
//!        ▼
//! IpcContext ──► SemSet        (belt mutex, empty, full, dock mutex)
//!            ──► SharedRegion  (SharedState mapping)
//!            ──► CommandQueue  (recipient-tagged commands)
//! ```
//!
//! ## Rules
//! - `with_belt`/`with_dock` bracket the closure with the matching mutex;
//!   nothing inside a closure may block (a non-blocking `send` is the one
//!   allowed side effect).
//! - Every blocking wait observes the [`ShutdownToken`](crate::shutdown::ShutdownToken)
//!   when interrupted and returns `ShuttingDown` instead of looping.
//! - Only the owner ([`IpcContext::create_owner`]) may destroy the resources.

mod context;
mod msgq;
mod sem;
mod shm;

pub use context::IpcContext;
pub use msgq::{Command, CommandQueue, RecipientTag};
pub use sem::{SemIndex, SemSet, SEM_COUNT};
pub use shm::SharedRegion;

use crate::error::IpcError;
use crate::state::SharedState;

/// The coordination seam passed by reference into every component.
///
/// Implementations provide mutual exclusion over the shared state, the two
/// counting semaphores of the belt protocol, and the command queue. The
/// closure-scoped accessors keep lock/unlock pairing out of component code
/// entirely.
pub trait Ipc {
    /// Runs `f` under the belt mutex (which also serializes the session
    /// table).
    fn with_belt<R>(&self, f: impl FnOnce(&mut SharedState) -> R) -> Result<R, IpcError>;

    /// Runs `f` under the dock mutex.
    fn with_dock<R>(&self, f: impl FnOnce(&mut SharedState) -> R) -> Result<R, IpcError>;

    /// Claims an empty belt slot; blocks until one frees or shutdown.
    fn wait_empty_slot(&self) -> Result<(), IpcError>;

    /// Publishes a freed slot.
    fn post_empty_slot(&self) -> Result<(), IpcError>;

    /// Claims a filled belt slot; blocks until one is published or shutdown.
    fn wait_full_slot(&self) -> Result<(), IpcError>;

    /// Publishes a filled slot.
    fn post_full_slot(&self) -> Result<(), IpcError>;

    /// Non-blocking enqueue of `command` for `to`. Fails with `QueueFull`
    /// when the queue is saturated; the command is then lost.
    fn send(&self, to: RecipientTag, command: Command) -> Result<(), IpcError>;

    /// Dequeues the next command addressed to `me`, blocking until one
    /// arrives, shutdown is requested, or the queue is destroyed.
    fn recv_blocking(&self, me: RecipientTag) -> Result<Command, IpcError>;

    /// Like [`recv_blocking`](Self::recv_blocking) but returns `None`
    /// immediately when no matching message is queued.
    fn recv_nonblocking(&self, me: RecipientTag) -> Result<Option<Command>, IpcError>;

    /// Racy read of the shared `running` flag.
    fn is_running(&self) -> bool;

    /// Clears the shared `running` flag. Single-writer by convention
    /// (orchestrator, or a SysAdmin `stop`).
    fn request_halt(&self);
}
