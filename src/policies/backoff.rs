//! # Backoff policy for dock and quota retries.
//!
//! [`BackoffPolicy`] controls how retry delays grow while a role waits for a
//! shared resource (a docked truck, a free quota slot). It is parameterized
//! by the initial delay, a multiplicative growth factor, and a cap.
//!
//! Delays are computed against a caller-owned RNG so that a seeded component
//! replays the same schedule in tests.

use std::time::Duration;

use rand::rngs::SmallRng;

use super::JitterPolicy;

/// Retry delay policy.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Initial delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to the computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Dock-retry defaults: 200ms first, 1s cap, ×1.5 growth, equal jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(200),
            max: Duration::from_secs(1),
            factor: 1.5,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// Constant-delay policy without jitter (predictable; used in tests).
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the next delay from the previous one.
    ///
    /// - `prev == None` returns `first` clamped to `max`.
    /// - Otherwise the previous delay grows by `factor` and is capped at
    ///   `max`, then jittered.
    pub fn next(&self, prev: Option<Duration>, rng: &mut SmallRng) -> Duration {
        let unclamped = match prev {
            None => self.first,
            Some(d) => {
                let grown = d.as_secs_f64() * self.factor;
                if grown.is_finite() {
                    d.mul_f64(self.factor)
                } else {
                    self.max
                }
            }
        };
        self.jitter.apply(unclamped.min(self.max), rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn grows_by_factor_and_caps() {
        let mut rng = SmallRng::seed_from_u64(7);
        let policy = BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_millis(500),
            factor: 2.0,
            jitter: JitterPolicy::None,
        };

        let d1 = policy.next(None, &mut rng);
        assert_eq!(d1, Duration::from_millis(100));

        let d2 = policy.next(Some(d1), &mut rng);
        assert_eq!(d2, Duration::from_millis(200));

        let d3 = policy.next(Some(Duration::from_secs(20)), &mut rng);
        assert_eq!(d3, Duration::from_millis(500));
    }

    #[test]
    fn constant_policy_never_moves() {
        let mut rng = SmallRng::seed_from_u64(7);
        let policy = BackoffPolicy::constant(Duration::from_millis(50));
        let mut prev = None;
        for _ in 0..5 {
            let d = policy.next(prev, &mut rng);
            assert_eq!(d, Duration::from_millis(50));
            prev = Some(d);
        }
    }

    #[test]
    fn seeded_schedules_replay() {
        let policy = BackoffPolicy::default();
        let mut a = SmallRng::seed_from_u64(99);
        let mut b = SmallRng::seed_from_u64(99);
        let mut prev = None;
        for _ in 0..4 {
            let da = policy.next(prev, &mut a);
            let db = policy.next(prev, &mut b);
            assert_eq!(da, db);
            prev = Some(da);
        }
    }
}
