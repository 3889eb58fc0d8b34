//! # dockvisor
//!
//! **Dockvisor** simulates a shipping-company warehouse as cooperating OS
//! processes coordinating exclusively through one shared memory region, a
//! System-V semaphore set, and a typed message queue.
//!
//! | Area            | Description                                              | Key types                                    |
//! |-----------------|----------------------------------------------------------|----------------------------------------------|
//! | **IPC facade**  | Safe wrappers over the shared primitives, one seam.      | [`Ipc`], [`IpcContext`]                      |
//! | **Belt**        | Bounded FIFO conveyor between workers and dispatcher.    | [`Belt`], [`BeltStats`]                      |
//! | **Roles**       | Producer, consumer, dock FSM, bypass lane, monitor.      | [`Worker`], [`Dispatcher`], [`Truck`], [`Express`], [`BeltMonitor`] |
//! | **Sessions**    | Shared login table with role masks and spawn quotas.     | [`SessionRegistry`], [`Role`]                |
//! | **Terminal**    | Role-checked operator commands.                          | [`Console`], [`CliCommand`]                  |
//! | **Orchestration** | Resource ownership, role spawning, graceful shutdown.  | [`Supervisor`], [`ShutdownToken`]            |
//! | **Errors**      | Typed failures with log labels.                          | [`IpcError`], [`SessionError`], [`RuntimeError`] |
//!
//! ## Process layout
//! ```text
//! warehouse (orchestrator, owner of S/Σ/Q)
//!   ├── worker ×W ──► belt ──► dispatcher ──► dock ──► truck ×T
//!   ├── express ─────────────────────────────► dock
//!   ├── belt-monitor (observability)
//!   └── terminal (run by the operator)
//! ```
//!
//! Role binaries attach to the resources by their well-known keys and log
//! in to the shared session table; the orchestrator reclaims everything on
//! exit. Protocol logic is generic over [`Ipc`], so tests drive the same
//! code paths through [`testing::LocalIpc`] without kernel resources.

mod alive;
mod belt;
mod config;
mod dispatcher;
mod error;
mod express;
mod logging;
mod monitor;
mod sessions;
mod supervisor;
mod truck;
mod worker;

pub mod events;
pub mod ipc;
pub mod policies;
pub mod shutdown;
pub mod state;
pub mod subscribers;
pub mod terminal;
pub mod testing;

// ---- Public re-exports ----

pub use alive::AliveTracker;
pub use belt::{Belt, BeltStats};
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use error::{IpcError, RuntimeError, SessionError};
pub use events::{Bus, Event, EventKind};
pub use express::Express;
pub use ipc::{Command, Ipc, IpcContext, RecipientTag};
pub use logging::init as init_logging;
pub use monitor::BeltMonitor;
pub use policies::{BackoffPolicy, JitterPolicy};
pub use sessions::SessionRegistry;
pub use shutdown::{install_signal_handlers, ShutdownToken};
pub use state::{Role, SharedState, TruckState};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use supervisor::Supervisor;
pub use terminal::{CliCommand, Console};
pub use truck::Truck;
pub use worker::Worker;
