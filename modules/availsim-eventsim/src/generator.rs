//! The Failure-Time Generator (C2).
//!
//! Draws inter-failure intervals from an exponential distribution
//! parameterized by each component's `mttf_hours` (the memoryless property
//! lets us redraw independently per component per failure, rather than
//! maintaining per-component phase).

use crate::error::{EventSimError, EventSimResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};

/// Draws exponentially-distributed failure intervals from a seeded RNG, so a
/// run is fully reproducible given the same seed and topology.
pub struct FailureTimeGenerator {
    rng: StdRng,
}

impl FailureTimeGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Samples the next failure time for a component with the given
    /// `mttf_hours`, as an absolute simulated time offset from `now`.
    pub fn next_failure_time(&mut self, mttf_hours: f64, now: f64) -> EventSimResult<f64> {
        if mttf_hours <= 0.0 {
            return Err(EventSimError::NonPositiveMttf { mttf_hours });
        }
        let rate = 1.0 / mttf_hours;
        let exp = Exp::new(rate).expect("rate is finite and positive");
        let interval = exp.sample(&mut self.rng);
        Ok(now + interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_produces_identical_sequence() {
        let mut a = FailureTimeGenerator::new(42);
        let mut b = FailureTimeGenerator::new(42);
        for _ in 0..20 {
            let ta = a.next_failure_time(100.0, 0.0).unwrap();
            let tb = b.next_failure_time(100.0, 0.0).unwrap();
            assert_eq!(ta, tb);
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = FailureTimeGenerator::new(1);
        let mut b = FailureTimeGenerator::new(2);
        let ta = a.next_failure_time(100.0, 0.0).unwrap();
        let tb = b.next_failure_time(100.0, 0.0).unwrap();
        assert_ne!(ta, tb);
    }

    #[test]
    fn non_positive_mttf_is_rejected() {
        let mut gen = FailureTimeGenerator::new(1);
        assert!(gen.next_failure_time(0.0, 0.0).is_err());
        assert!(gen.next_failure_time(-5.0, 0.0).is_err());
    }

    #[test]
    fn sample_mean_converges_towards_mttf() {
        let mut gen = FailureTimeGenerator::new(7);
        let mttf = 50.0;
        let n = 20_000;
        let mut sum = 0.0;
        for _ in 0..n {
            sum += gen.next_failure_time(mttf, 0.0).unwrap();
        }
        let mean = sum / n as f64;
        // Exponential sample mean has std error ~ mttf/sqrt(n); 5% tolerance
        // comfortably covers sampling noise at n=20_000 without flaking.
        assert!((mean - mttf).abs() < mttf * 0.05, "mean {mean} far from {mttf}");
    }

    #[test]
    fn smaller_mttf_yields_more_frequent_failures_on_average() {
        let mut gen = FailureTimeGenerator::new(9);
        let n = 5_000;
        let mut short_sum = 0.0;
        let mut long_sum = 0.0;
        for _ in 0..n {
            short_sum += gen.next_failure_time(10.0, 0.0).unwrap();
            long_sum += gen.next_failure_time(1000.0, 0.0).unwrap();
        }
        assert!(short_sum / n as f64 < long_sum / n as f64);
    }
}
