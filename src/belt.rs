//! # Belt: the bounded producer/consumer conveyor.
//!
//! The belt is a circular buffer of packages in shared memory, coordinated
//! by three semaphores: a mutex over the indices and slots, a counting
//! semaphore of empty slots, and a counting semaphore of filled slots.
//! The semaphores are the admission control; the in-structure `count` is an
//! observability shadow and never gates anything.
//!
//! ## Protocol
//! ```text
//! push: wait EMPTY ─► lock ─► assign id, write slot, advance tail ─► unlock ─► post FULL
//! pop:  wait FULL  ─► lock ─► read slot, zero slot, advance head   ─► unlock ─► post EMPTY
//! ```
//!
//! ## Rules
//! - After any successful push/pop: `empty + full == K` and `full == count`.
//! - Transfer order is strict FIFO; no package is delivered twice.
//! - Popped slots are zeroed so stale audit history cannot leak into a later
//!   package occupying the same slot.
//! - Observing a full ring *after* the `EMPTY` wait is a consistency
//!   anomaly, not a retry point.

use tracing::{debug, info};

use crate::error::IpcError;
use crate::ipc::Ipc;
use crate::state::{ActionFlags, Package, SharedState, MAX_BELT_WORKERS};

/// Observability snapshot of the belt counters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeltStats {
    pub count: u32,
    pub capacity: u32,
    pub workers: u32,
    pub total_weight: f64,
    pub total_created: u64,
    /// Belt arithmetic invariant held at observation time.
    pub consistent: bool,
}

/// Belt operations over a borrowed IPC context.
pub struct Belt<'a, I: Ipc> {
    ctx: &'a I,
}

impl<'a, I: Ipc> Belt<'a, I> {
    pub fn new(ctx: &'a I) -> Self {
        Belt { ctx }
    }

    /// Pushes a package, blocking while the belt is full.
    ///
    /// Assigns the next monotonic id, stamps a `PLACED_ON_BELT` audit record,
    /// and returns the id. Fails only by shutdown or invariant violation.
    pub fn push(&self, mut pkg: Package) -> Result<u64, IpcError> {
        let pid = std::process::id() as i32;
        self.ctx.wait_empty_slot()?;

        let (id, count, capacity) = self.ctx.with_belt(|s| {
            let k = s.capacity();
            if s.count >= k {
                // The EMPTY wait admitted us; a full ring here means the
                // counters and the semaphores disagree.
                return Err(IpcError::InvariantViolation {
                    detail: format!("push admitted with count {} of {}", s.count, k),
                });
            }

            s.total_packages_created += 1;
            pkg.id = s.total_packages_created;
            pkg.record_action(ActionFlags::PLACED_ON_BELT | ActionFlags::BY_WORKER, pid);

            s.belt[s.tail as usize] = pkg;
            s.tail = (s.tail + 1) % k;
            s.count += 1;
            s.total_weight += pkg.weight;
            Ok((pkg.id, s.count, k))
        })??;

        self.ctx.post_full_slot()?;
        info!(id, count, capacity, weight = pkg.weight, "package pushed onto belt");
        Ok(id)
    }

    /// Pops the oldest package, blocking while the belt is empty.
    pub fn pop(&self) -> Result<Package, IpcError> {
        self.ctx.wait_full_slot()?;

        let (pkg, count) = self.ctx.with_belt(|s| {
            let k = s.capacity();
            if s.count == 0 {
                return Err(IpcError::InvariantViolation {
                    detail: "pop admitted with an empty belt".into(),
                });
            }

            let head = s.head as usize;
            let pkg = s.belt[head];
            s.belt[head] = Package::default();
            s.head = (s.head + 1) % k;
            s.count -= 1;
            s.total_weight -= pkg.weight;
            Ok((pkg, s.count))
        })??;

        self.ctx.post_empty_slot()?;
        debug!(id = pkg.id, count, "package popped from belt");
        Ok(pkg)
    }

    /// Registers a producer. Returns `false` when the worker population is
    /// already at `MAX_BELT_WORKERS`.
    pub fn register_worker(&self) -> Result<bool, IpcError> {
        self.ctx.with_belt(|s| {
            if s.workers >= MAX_BELT_WORKERS {
                false
            } else {
                s.workers += 1;
                true
            }
        })
    }

    /// Unregisters a producer; saturates at zero.
    pub fn unregister_worker(&self) -> Result<(), IpcError> {
        self.ctx.with_belt(|s| {
            s.workers = s.workers.saturating_sub(1);
        })
    }

    /// Counter snapshot under the belt mutex.
    pub fn stats(&self) -> Result<BeltStats, IpcError> {
        self.ctx.with_belt(|s: &mut SharedState| BeltStats {
            count: s.count,
            capacity: s.capacity(),
            workers: s.workers,
            total_weight: s.total_weight,
            total_created: s.total_packages_created,
            consistent: s.belt_consistent(),
        })
    }
}
