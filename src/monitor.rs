//! # Belt monitor: the observability surface over the belt.
//!
//! Reports occupancy, worker population, summed weight, and completed
//! trucks once per tick. The summed weight has a soft ceiling
//! ([`MAX_BELT_WEIGHT`]) that is warned about but never gates admission;
//! a broken belt arithmetic invariant is critical and ends the role.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::belt::Belt;
use crate::error::IpcError;
use crate::ipc::Ipc;
use crate::state::MAX_BELT_WEIGHT;

const TICK: Duration = Duration::from_secs(1);

pub struct BeltMonitor<'a, I: Ipc> {
    ctx: &'a I,
    belt: Belt<'a, I>,
}

impl<'a, I: Ipc> BeltMonitor<'a, I> {
    pub fn new(ctx: &'a I) -> Self {
        BeltMonitor {
            ctx,
            belt: Belt::new(ctx),
        }
    }

    /// Observation loop; returns when shutdown is requested.
    pub fn run(&self) -> Result<(), IpcError> {
        info!("belt monitor connected, waiting for production");
        while self.ctx.is_running() {
            let stats = match self.belt.stats() {
                Ok(stats) => stats,
                Err(e) if e.is_cancellation() => break,
                Err(e) => return Err(e),
            };
            let trucks_completed = match self.ctx.with_dock(|s| s.trucks_completed) {
                Ok(n) => n,
                Err(e) if e.is_cancellation() => break,
                Err(e) => return Err(e),
            };

            if !stats.consistent {
                error!(
                    count = stats.count,
                    capacity = stats.capacity,
                    "belt arithmetic invariant violated"
                );
                return Err(IpcError::InvariantViolation {
                    detail: "belt count does not match head/tail span".into(),
                });
            }

            info!(
                count = stats.count,
                capacity = stats.capacity,
                workers = stats.workers,
                weight = stats.total_weight,
                total_created = stats.total_created,
                trucks_completed,
                "belt status"
            );
            if stats.total_weight > MAX_BELT_WEIGHT {
                warn!(
                    weight = stats.total_weight,
                    ceiling = MAX_BELT_WEIGHT,
                    "belt mass above the observability ceiling"
                );
            }

            std::thread::sleep(TICK);
        }
        info!("belt monitor shutting down");
        Ok(())
    }
}
