//! # Worker: the package producer.
//!
//! A worker registers on the belt, then produces randomized packages in a
//! loop bounded by its session's spawn quota: each package claims one quota
//! slot for the duration of the push and releases it afterwards. Quota
//! refusals idle briefly and retry; a saturated worker population makes the
//! role exit cleanly at startup.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info};

use crate::belt::Belt;
use crate::error::IpcError;
use crate::ipc::Ipc;
use crate::sessions::SessionRegistry;
use crate::state::{ActionFlags, Package, PackageKind, VOL_A, VOL_B, VOL_C};

/// The producer role.
pub struct Worker<'a, I: Ipc> {
    ctx: &'a I,
    belt: Belt<'a, I>,
    worker_id: u32,
    think_time: Duration,
    quota_retry: Duration,
    rng: SmallRng,
}

impl<'a, I: Ipc> Worker<'a, I> {
    pub fn new(
        ctx: &'a I,
        worker_id: u32,
        think_time: Duration,
        quota_retry: Duration,
        seed: u64,
    ) -> Self {
        Worker {
            ctx,
            belt: Belt::new(ctx),
            worker_id,
            think_time,
            quota_retry,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Production loop; returns when shutdown is requested.
    pub fn run(&mut self, sessions: &SessionRegistry<'a, I>) -> Result<(), IpcError> {
        if !self.belt.register_worker()? {
            error!(worker = self.worker_id, "belt worker population saturated");
            return Ok(());
        }
        info!(worker = self.worker_id, "started shift, producing packages");

        let result = self.produce(sessions);
        self.belt.unregister_worker()?;
        info!(worker = self.worker_id, "shift ended");
        match result {
            Err(e) if e.is_cancellation() => Ok(()),
            other => other,
        }
    }

    fn produce(&mut self, sessions: &SessionRegistry<'a, I>) -> Result<(), IpcError> {
        while self.ctx.is_running() {
            if !sessions.try_spawn_process()? {
                debug!(worker = self.worker_id, "quota exhausted, idling");
                std::thread::sleep(self.quota_retry);
                continue;
            }

            let pkg = self.generate();
            let pushed = self.belt.push(pkg);
            sessions.report_process_finished()?;
            pushed?;

            // Simulated workload; orthogonal to protocol correctness.
            std::thread::sleep(self.think_time);
        }
        Ok(())
    }

    /// Rolls a package type and its weight; smaller types are lighter.
    fn generate(&mut self) -> Package {
        let (kind, volume, weight) = match self.rng.random_range(0..3) {
            0 => (PackageKind::A, VOL_A, self.rng.random_range(0.1..=8.0)),
            1 => (PackageKind::B, VOL_B, self.rng.random_range(8.0..=16.0)),
            _ => (PackageKind::C, VOL_C, self.rng.random_range(16.0..=25.0)),
        };
        Package::new(
            kind,
            weight,
            volume,
            ActionFlags::BY_WORKER,
            std::process::id() as i32,
        )
    }
}
