//! # Truck: the dock occupancy state machine.
//!
//! ```text
//! Arriving ──(dock free)──► Docked ──(DEPARTURE)──► Departing ──► EnRoute ──► Arriving
//!     │                        │
//!     └──(dock busy: wait)     └──(END_WORK)──► Done
//! ```
//!
//! A docked truck owns the dock slot: `dock_truck.id` equals its pid until
//! it departs. Before clearing the dock the truck re-checks that identity;
//! a mismatch means another process violated the single-writer rule and the
//! truck aborts its cycle rather than corrupt the successor's slot.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info};

use crate::error::IpcError;
use crate::ipc::{Command, Ipc, RecipientTag};

/// Delay before re-probing an occupied dock.
const DOCK_PROBE_DELAY: Duration = Duration::from_secs(1);

/// A truck process's view of its delivery cycles.
pub struct Truck<'a, I: Ipc> {
    ctx: &'a I,
    me: RecipientTag,
    pid: i32,
    rng: SmallRng,
}

impl<'a, I: Ipc> Truck<'a, I> {
    pub fn new(ctx: &'a I, seed: u64) -> Self {
        Truck {
            ctx,
            me: RecipientTag::self_tag(),
            pid: std::process::id() as i32,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Runs delivery cycles until `END_WORK` or shutdown, then releases the
    /// dock if this truck still occupies it.
    pub fn run(&mut self) -> Result<(), IpcError> {
        info!("driver ready, starting shift");
        let result = self.cycles();
        self.release_dock_if_occupant()?;
        match result {
            Err(e) if e.is_cancellation() => Ok(()),
            other => other,
        }
    }

    fn cycles(&mut self) -> Result<(), IpcError> {
        while self.ctx.is_running() {
            if !self.try_dock()? {
                debug!("dock occupied, waiting in queue");
                std::thread::sleep(DOCK_PROBE_DELAY);
                continue;
            }

            match self.await_departure()? {
                Command::EndWork => {
                    info!("end of work received while docked");
                    return Ok(());
                }
                _ => self.depart()?,
            }

            let en_route = Duration::from_secs_f64(self.rng.random_range(3.0..=8.0));
            debug!(?en_route, "on the road");
            std::thread::sleep(en_route);
            info!("delivery complete, returning to base");
        }
        Ok(())
    }

    /// Arriving → Docked when the dock is free; randomizes this cycle's
    /// capacities.
    fn try_dock(&mut self) -> Result<bool, IpcError> {
        let max_load = self.rng.random_range(5..=15u32);
        let max_weight = self.rng.random_range(50.0..=150.0);
        let max_volume = self.rng.random_range(150.0..=400.0);
        let pid = self.pid;

        let docked = self.ctx.with_dock(|s| {
            if s.dock_truck.is_present {
                return false;
            }
            s.dock_truck.dock(pid, max_load, max_weight, max_volume);
            true
        })?;

        if docked {
            info!(max_load, max_weight, max_volume, "arrived at dock, waiting for load");
        }
        Ok(docked)
    }

    /// Docked: blocks until a `DEPARTURE` or `END_WORK` addressed to this
    /// truck arrives. Other commands are ignored.
    fn await_departure(&mut self) -> Result<Command, IpcError> {
        loop {
            match self.ctx.recv_blocking(self.me)? {
                cmd @ (Command::Departure | Command::EndWork) => return Ok(cmd),
                other => debug!(?other, "ignoring command not meant for a docked truck"),
            }
        }
    }

    /// Departing → EnRoute: counts the completed delivery and frees the
    /// dock, guarded by the occupant identity.
    fn depart(&mut self) -> Result<(), IpcError> {
        let pid = self.pid;
        let departed = self.ctx.with_dock(|s| {
            if s.dock_truck.id != pid {
                return Err(IpcError::InvariantViolation {
                    detail: format!(
                        "dock occupant is {} but truck {} tried to depart",
                        s.dock_truck.id, pid
                    ),
                });
            }
            s.trucks_completed += 1;
            s.dock_truck.is_present = false;
            Ok((s.dock_truck.current_load, s.dock_truck.current_weight))
        })?;

        match departed {
            Ok((load, weight)) => {
                info!(load, weight, "departing");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "dock identity mismatch, aborting cycle");
                Err(e)
            }
        }
    }

    /// Shutdown path: a truck clears `is_present` only if it is the
    /// occupant.
    fn release_dock_if_occupant(&self) -> Result<(), IpcError> {
        let pid = self.pid;
        match self.ctx.with_dock(|s| {
            if s.dock_truck.is_present && s.dock_truck.id == pid {
                s.dock_truck.is_present = false;
            }
        }) {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancellation() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
