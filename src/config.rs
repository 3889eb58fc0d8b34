//! # Runtime configuration.
//!
//! [`Config`] defines the simulation's behavior: IPC keys, belt capacity,
//! role counts, shutdown grace period, and retry pacing. Every process uses
//! the same defaults; the orchestrator may override a few knobs through
//! `WAREHOUSE_*` environment variables (the effective belt capacity is then
//! distributed to attachers through shared state, so processes never
//! disagree with the semaphore initialization).
//!
//! # Example
//! ```
//! use dockvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.workers = 5;
//! cfg.grace = std::time::Duration::from_secs(5);
//! assert_eq!(cfg.shm_key, 1234);
//! ```

use std::time::Duration;

use crate::policies::BackoffPolicy;
use crate::state::BELT_SLOTS;

/// Global configuration for the warehouse runtime.
#[derive(Clone, Debug)]
pub struct Config {
    /// Key of the shared memory segment.
    pub shm_key: i32,
    /// Key of the semaphore set.
    pub sem_key: i32,
    /// Key of the command message queue.
    pub msg_key: i32,
    /// Effective belt capacity K, clamped to `1..=BELT_SLOTS`.
    pub belt_capacity: u32,
    /// Worker processes spawned by the orchestrator (W).
    pub workers: u32,
    /// Truck processes spawned by the orchestrator (T).
    pub trucks: u32,
    /// Delay between consecutive role spawns.
    pub startup_stagger: Duration,
    /// Maximum time to wait for children after requesting shutdown.
    pub grace: Duration,
    /// Worker think-time between produced packages.
    pub worker_think_time: Duration,
    /// Worker idle time after a quota refusal.
    pub quota_retry_delay: Duration,
    /// Dispatcher/express pacing against the dock.
    pub dock_backoff: BackoffPolicy,
    /// Seed for per-component RNGs; `None` derives one from the pid.
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    /// Defaults matching the external interface contract:
    /// keys `1234`/`5678`/`9012`, `K = 10`, `W = 3`, `T = 3`, 10s grace.
    fn default() -> Self {
        Self {
            shm_key: 1234,
            sem_key: 5678,
            msg_key: 9012,
            belt_capacity: BELT_SLOTS as u32,
            workers: 3,
            trucks: 3,
            startup_stagger: Duration::from_millis(150),
            grace: Duration::from_secs(10),
            worker_think_time: Duration::from_millis(250),
            quota_retry_delay: Duration::from_millis(500),
            dock_backoff: BackoffPolicy::default(),
            rng_seed: None,
        }
    }
}

impl Config {
    /// Builds a config from defaults plus `WAREHOUSE_*` overrides.
    ///
    /// Recognized: `WAREHOUSE_WORKERS`, `WAREHOUSE_TRUCKS`,
    /// `WAREHOUSE_BELT_CAPACITY`, `WAREHOUSE_GRACE_SECS`, `WAREHOUSE_SEED`.
    /// Unparsable values fall back to the default silently.
    pub fn from_env() -> Self {
        let mut cfg = Config::default();
        if let Some(n) = env_u32("WAREHOUSE_WORKERS") {
            cfg.workers = n;
        }
        if let Some(n) = env_u32("WAREHOUSE_TRUCKS") {
            cfg.trucks = n;
        }
        if let Some(n) = env_u32("WAREHOUSE_BELT_CAPACITY") {
            cfg.belt_capacity = n.clamp(1, BELT_SLOTS as u32);
        }
        if let Some(n) = env_u32("WAREHOUSE_GRACE_SECS") {
            cfg.grace = Duration::from_secs(u64::from(n));
        }
        if let Some(seed) = std::env::var("WAREHOUSE_SEED")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            cfg.rng_seed = Some(seed);
        }
        cfg
    }

    /// The seed for a component's RNG: configured seed, or one derived from
    /// the pid so that sibling processes do not share a schedule.
    pub fn seed_for(&self, salt: u64) -> u64 {
        let base = self
            .rng_seed
            .unwrap_or_else(|| std::process::id() as u64 ^ 0x9e37_79b9_7f4a_7c15);
        base.wrapping_add(salt)
    }
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
