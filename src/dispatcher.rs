//! # Dispatcher: belt → dock transfer with admission control.
//!
//! The dispatcher pops a package, then retries loading it until a docked
//! truck admits it or shutdown is requested. A popped package is never
//! dropped: the retry loop guarantees eventual delivery as long as the
//! system keeps running and some truck can host the package.
//!
//! ## Retry-load
//! ```text
//! loop:
//!   lock dock
//!     no truck        ─► unlock, back off, retry
//!     admits(pkg)     ─► load; if full/≥99% ─► DEPARTURE to occupant
//!     rejects(pkg)    ─► DEPARTURE to occupant; unlock, back off, retry
//!   unlock
//! ```
//!
//! Departure commands are addressed to the pid observed under the dock
//! mutex, so a truck that already left never receives a stale signal meant
//! for its successor.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::belt::Belt;
use crate::error::IpcError;
use crate::ipc::{Command, Ipc, RecipientTag};
use crate::policies::BackoffPolicy;
use crate::state::{ActionFlags, Package, PackageStatus};

/// Result of one admission attempt under the dock mutex.
#[derive(Debug)]
pub(crate) enum LoadOutcome {
    /// No occupant; nothing was touched.
    NoTruck,
    /// Loaded; `departure_sent` is set when the truck was told to leave.
    Loaded {
        truck: i32,
        load: u32,
        max_load: u32,
        departure_sent: Option<Result<(), IpcError>>,
    },
    /// The occupant cannot host this package; it was told to leave.
    Rejected {
        truck: i32,
        departure_sent: Result<(), IpcError>,
    },
}

/// One locked admission attempt, shared by the dispatcher and the express
/// lane. Mutates `pkg` (status + audit) only on success.
pub(crate) fn try_load_once<I: Ipc>(
    ctx: &I,
    pkg: &mut Package,
    actor: ActionFlags,
) -> Result<LoadOutcome, IpcError> {
    let pid = std::process::id() as i32;
    ctx.with_dock(|s| {
        if !s.dock_truck.is_present {
            return LoadOutcome::NoTruck;
        }
        let truck = s.dock_truck.id;

        if s.dock_truck.admits(pkg) {
            s.dock_truck.load(pkg);
            pkg.status = pkg.status | PackageStatus::LOADED;
            pkg.record_action(ActionFlags::LOADED_TO_TRUCK | actor, pid);

            let departure_sent = s
                .dock_truck
                .should_depart()
                .then(|| ctx.send(RecipientTag::for_pid(truck), Command::Departure));
            LoadOutcome::Loaded {
                truck,
                load: s.dock_truck.current_load,
                max_load: s.dock_truck.max_load,
                departure_sent,
            }
        } else {
            // Mismatched truck: force it out so a fresh one can dock.
            LoadOutcome::Rejected {
                truck,
                departure_sent: ctx.send(RecipientTag::for_pid(truck), Command::Departure),
            }
        }
    })
}

pub(crate) fn log_departure_result(truck: i32, sent: Result<(), IpcError>) {
    match sent {
        Ok(()) => info!(truck, "departure signalled"),
        // The command is lost by contract; the sender does not retry.
        Err(e) => warn!(truck, error = e.as_label(), "departure command lost"),
    }
}

/// The belt consumer.
pub struct Dispatcher<'a, I: Ipc> {
    ctx: &'a I,
    belt: Belt<'a, I>,
    backoff: BackoffPolicy,
    rng: SmallRng,
}

impl<'a, I: Ipc> Dispatcher<'a, I> {
    pub fn new(ctx: &'a I, backoff: BackoffPolicy, seed: u64) -> Self {
        Dispatcher {
            ctx,
            belt: Belt::new(ctx),
            backoff,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Main loop: route packages until shutdown.
    pub fn run(&mut self) -> Result<(), IpcError> {
        info!("dispatcher ready to route packages");
        while self.ctx.is_running() {
            match self.process_next() {
                Ok(()) => {}
                Err(e) if e.is_cancellation() => break,
                Err(e) => return Err(e),
            }
        }
        info!("dispatcher finished");
        Ok(())
    }

    /// Pops one package and loads it, retrying until success or shutdown.
    pub fn process_next(&mut self) -> Result<(), IpcError> {
        let mut pkg = self.belt.pop()?;
        pkg.record_action(
            ActionFlags::PICKED_UP | ActionFlags::BY_WORKER,
            std::process::id() as i32,
        );
        self.load_with_retry(pkg)
    }

    fn load_with_retry(&mut self, mut pkg: Package) -> Result<(), IpcError> {
        let mut prev_delay: Option<Duration> = None;
        loop {
            if !self.ctx.is_running() {
                // The package in hand is lost; the orchestrator sees the
                // dispatcher exit and surfaces it.
                return Err(IpcError::ShuttingDown);
            }

            match try_load_once(self.ctx, &mut pkg, ActionFlags::BY_WORKER)? {
                LoadOutcome::Loaded {
                    truck,
                    load,
                    max_load,
                    departure_sent,
                } => {
                    info!(id = pkg.id, truck, load, max_load, "package loaded");
                    if let Some(sent) = departure_sent {
                        log_departure_result(truck, sent);
                    }
                    return Ok(());
                }
                LoadOutcome::NoTruck => {
                    warn!(id = pkg.id, "no truck in dock, package waiting");
                }
                LoadOutcome::Rejected {
                    truck,
                    departure_sent,
                } => {
                    warn!(id = pkg.id, truck, "truck cannot host package, forcing departure");
                    log_departure_result(truck, departure_sent);
                }
            }

            let delay = self.backoff.next(prev_delay, &mut self.rng);
            prev_delay = Some(delay);
            std::thread::sleep(delay);
        }
    }
}
