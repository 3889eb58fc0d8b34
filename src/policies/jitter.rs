//! # Jitter applied to retry delays.
//!
//! Several processes back off against the same dock; identical delays would
//! make them retake the mutex in lockstep. [`JitterPolicy`] spreads them out.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::Rng;

/// Randomization of a computed backoff delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the exact delay. Predictable; the test default.
    #[default]
    None,
    /// Random delay in `[0, delay]`.
    Full,
    /// `delay/2 + random[0, delay/2]`; keeps most of the backoff while
    /// still de-synchronizing competitors.
    Equal,
}

impl JitterPolicy {
    pub fn apply(&self, delay: Duration, rng: &mut SmallRng) -> Duration {
        let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => Duration::from_millis(rng.random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                let jitter = if half == 0 {
                    0
                } else {
                    rng.random_range(0..=half)
                };
                Duration::from_millis(half + jitter)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn full_jitter_stays_within_bounds() {
        let mut rng = SmallRng::seed_from_u64(1);
        let d = Duration::from_millis(400);
        for _ in 0..100 {
            let j = JitterPolicy::Full.apply(d, &mut rng);
            assert!(j <= d);
        }
    }

    #[test]
    fn equal_jitter_preserves_at_least_half() {
        let mut rng = SmallRng::seed_from_u64(1);
        let d = Duration::from_millis(400);
        for _ in 0..100 {
            let j = JitterPolicy::Equal.apply(d, &mut rng);
            assert!(j >= d / 2 && j <= d);
        }
    }

    #[test]
    fn zero_delay_is_a_fixed_point() {
        let mut rng = SmallRng::seed_from_u64(1);
        for policy in [JitterPolicy::None, JitterPolicy::Full, JitterPolicy::Equal] {
            assert_eq!(policy.apply(Duration::ZERO, &mut rng), Duration::ZERO);
        }
    }
}
