//! # Express: the priority bypass lane.
//!
//! Express packages skip the belt and its FIFO entirely; "bypass" does not
//! mean preemption. The express role competes for the dock mutex like any
//! loader, takes its ids from the same belt-mutex-gated counter, and stamps
//! its cargo with `Express` status.
//!
//! Two delivery shapes:
//! - a single VIP package, dropped (not queued) when no truck is docked so
//!   the express path never stalls behind the dock;
//! - a batch of 3–5 packages loaded under one dock acquisition, cut short
//!   at the first overflow.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::dispatcher::{log_departure_result, try_load_once, LoadOutcome};
use crate::error::IpcError;
use crate::ipc::{Command, Ipc, RecipientTag};
use crate::policies::BackoffPolicy;
use crate::state::{ActionFlags, Package, PackageKind, PackageStatus, VOL_A, VOL_B, VOL_C};

/// The express role.
pub struct Express<'a, I: Ipc> {
    ctx: &'a I,
    backoff: BackoffPolicy,
    rng: SmallRng,
    pid: i32,
}

impl<'a, I: Ipc> Express<'a, I> {
    pub fn new(ctx: &'a I, backoff: BackoffPolicy, seed: u64) -> Self {
        Express {
            ctx,
            backoff,
            rng: SmallRng::seed_from_u64(seed),
            pid: std::process::id() as i32,
        }
    }

    /// Standby loop: waits for commands addressed to this process.
    pub fn run(&mut self) -> Result<(), IpcError> {
        info!("express standing by for VIP orders");
        let me = RecipientTag::self_tag();
        while self.ctx.is_running() {
            match self.ctx.recv_blocking(me) {
                Ok(Command::ExpressLoad) => {
                    let loaded = self.deliver_express_batch()?;
                    info!(loaded, "express batch finished, returning to standby");
                }
                Ok(Command::EndWork) => {
                    info!("end of work received");
                    break;
                }
                Ok(other) => {
                    // Stray departures can land here when a truck left early.
                    tracing::debug!(?other, "ignoring command");
                }
                Err(e) if e.is_cancellation() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Builds one VIP package and loads it directly into the docked truck.
    ///
    /// With no truck present the order is dropped and logged; a mismatched
    /// truck is signalled away and the delivery retried, exactly like the
    /// dispatcher path.
    pub fn deliver_vip_package(&mut self) -> Result<(), IpcError> {
        info!("VIP order received, preparing package");
        let weight = self.rng.random_range(1.0..=5.0);
        let mut pkg = Package::new(
            PackageKind::C,
            weight,
            VOL_C,
            ActionFlags::BY_EXPRESS,
            self.pid,
        );
        pkg.status = pkg.status | PackageStatus::EXPRESS;
        pkg.id = self.reserve_ids(1)?;

        let mut prev_delay: Option<Duration> = None;
        loop {
            if !self.ctx.is_running() {
                return Err(IpcError::ShuttingDown);
            }
            match try_load_once(self.ctx, &mut pkg, ActionFlags::BY_EXPRESS)? {
                LoadOutcome::NoTruck => {
                    warn!(id = pkg.id, "no truck for VIP package, order dropped");
                    return Ok(());
                }
                LoadOutcome::Loaded {
                    truck,
                    load,
                    max_load,
                    departure_sent,
                } => {
                    info!(id = pkg.id, truck, load, max_load, "VIP package delivered");
                    if let Some(sent) = departure_sent {
                        log_departure_result(truck, sent);
                    }
                    return Ok(());
                }
                LoadOutcome::Rejected {
                    truck,
                    departure_sent,
                } => {
                    warn!(id = pkg.id, truck, "truck rejected VIP package, forcing departure");
                    log_departure_result(truck, departure_sent);
                }
            }
            let delay = self.backoff.next(prev_delay, &mut self.rng);
            prev_delay = Some(delay);
            std::thread::sleep(delay);
        }
    }

    /// Loads a 3–5 package batch under one dock acquisition.
    ///
    /// Returns how many packages were placed. The first package the truck
    /// cannot host ends the batch with a `DEPARTURE` signal; the remainder
    /// is discarded.
    pub fn deliver_express_batch(&mut self) -> Result<usize, IpcError> {
        let wanted = self.rng.random_range(3..=5usize);
        let last_id = self.reserve_ids(wanted as u64)?;
        let first_id = last_id - wanted as u64 + 1;
        let mut batch: Vec<Package> = (0..wanted)
            .map(|n| {
                let mut pkg = self.random_package();
                pkg.id = first_id + n as u64;
                pkg
            })
            .collect();
        let pid = self.pid;

        let outcome = self.ctx.with_dock(|s| {
            if !s.dock_truck.is_present {
                return (0usize, None, None);
            }
            let truck = s.dock_truck.id;
            let mut loaded = 0usize;
            for pkg in batch.iter_mut() {
                if !s.dock_truck.admits(pkg) {
                    let sent = self.ctx.send(RecipientTag::for_pid(truck), Command::Departure);
                    return (loaded, Some(truck), Some(sent));
                }
                s.dock_truck.load(pkg);
                pkg.status = pkg.status | PackageStatus::LOADED;
                pkg.record_action(ActionFlags::LOADED_TO_TRUCK | ActionFlags::BY_EXPRESS, pid);
                loaded += 1;
            }
            (loaded, Some(truck), None)
        })?;

        match outcome {
            (0, None, _) => {
                warn!("no truck for express batch, batch dropped");
                Ok(0)
            }
            (loaded, Some(truck), overflow) => {
                if let Some(sent) = overflow {
                    warn!(loaded, wanted, truck, "express batch cut short by overflow");
                    log_departure_result(truck, sent);
                } else {
                    info!(loaded, truck, "express batch loaded");
                }
                Ok(loaded)
            }
            _ => Ok(0),
        }
    }

    /// Reserves `n` consecutive ids from the shared counter; returns the
    /// last one.
    fn reserve_ids(&self, n: u64) -> Result<u64, IpcError> {
        self.ctx.with_belt(|s| {
            s.total_packages_created += n;
            s.total_packages_created
        })
    }

    fn random_package(&mut self) -> Package {
        let (kind, volume, weight) = match self.rng.random_range(0..3) {
            0 => (PackageKind::A, VOL_A, self.rng.random_range(0.1..=8.0)),
            1 => (PackageKind::B, VOL_B, self.rng.random_range(8.0..=16.0)),
            _ => (PackageKind::C, VOL_C, self.rng.random_range(16.0..=25.0)),
        };
        let mut pkg = Package::new(kind, weight, volume, ActionFlags::BY_EXPRESS, self.pid);
        pkg.status = pkg.status | PackageStatus::EXPRESS;
        pkg
    }
}
