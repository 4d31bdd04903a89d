//! Decision sources for the simulated endpoint.
//!
//! Every non-cached call draws exactly one [`Decision`]. Production runs draw
//! from [`RandomDecider`]; tests script trajectories with [`ScriptedDecider`]
//! and count draws to observe that cached replays never reach the decider.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tally_core::{EndpointConfig, Error, Result};

/// What the endpoint does with one non-cached call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Succeed immediately.
    Succeed,
    /// Return a temporary failure (503).
    TemporaryFailure,
    /// Succeed after waiting.
    DelayedSuccess(Duration),
    /// Raise a transient fault.
    Fault(String),
}

/// Source of endpoint decisions.
pub trait Decider: Send + Sync {
    /// Draw the decision for the next non-cached call.
    fn decide(&self) -> Decision;
}

/// Draws decisions from the configured failure distribution.
pub struct RandomDecider {
    config: EndpointConfig,
    rng: Mutex<StdRng>,
}

impl RandomDecider {
    /// Create a decider seeded from system entropy.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `config` fails validation.
    pub fn new(config: EndpointConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Create a reproducible decider.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `config` fails validation.
    pub fn seeded(config: EndpointConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }
}

impl Decider for RandomDecider {
    fn decide(&self) -> Decision {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let roll: f64 = rng.r#gen();

        if roll < self.config.success_rate {
            Decision::Succeed
        } else if roll < self.config.success_rate + self.config.failure_rate {
            Decision::TemporaryFailure
        } else {
            let (low, high) = (self.config.min_delay_ms, self.config.max_delay_ms);
            let millis = rng.gen_range(low.min(high)..=low.max(high));
            Decision::DelayedSuccess(Duration::from_millis(millis))
        }
    }
}

/// Replays a fixed sequence of decisions, then repeats a fallback.
pub struct ScriptedDecider {
    script: Mutex<VecDeque<Decision>>,
    fallback: Decision,
    draws: AtomicUsize,
}

impl ScriptedDecider {
    /// Script `decisions`; once exhausted every draw succeeds.
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            script: Mutex::new(decisions.into_iter().collect()),
            fallback: Decision::Succeed,
            draws: AtomicUsize::new(0),
        }
    }

    /// A decider that always returns `decision`.
    pub fn always(decision: Decision) -> Self {
        Self::new([]).with_fallback(decision)
    }

    /// Replace the decision used after the script runs out.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Decision) -> Self {
        self.fallback = fallback;
        self
    }

    /// Number of decisions drawn so far.
    pub fn draws(&self) -> usize {
        self.draws.load(Ordering::SeqCst)
    }
}

impl Decider for ScriptedDecider {
    fn decide(&self) -> Decision {
        self.draws.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn config(success: f64, failure: f64, delayed: f64) -> EndpointConfig {
        EndpointConfig {
            success_rate: success,
            failure_rate: failure,
            delayed_rate: delayed,
            min_delay_ms: 5,
            max_delay_ms: 10,
        }
    }

    #[test]
    fn test_all_success_distribution() {
        let decider = RandomDecider::seeded(config(1.0, 0.0, 0.0), 7).unwrap();
        assert!((0..100).all(|_| decider.decide() == Decision::Succeed));
    }

    #[test]
    fn test_all_failure_distribution() {
        let decider = RandomDecider::seeded(config(0.0, 1.0, 0.0), 7).unwrap();
        assert!((0..100).all(|_| decider.decide() == Decision::TemporaryFailure));
    }

    #[test]
    fn test_delays_within_bounds() {
        let decider = RandomDecider::seeded(config(0.0, 0.0, 1.0), 7).unwrap();
        for _ in 0..100 {
            match decider.decide() {
                Decision::DelayedSuccess(d) => {
                    assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(10));
                }
                other => unreachable!("unexpected decision {other:?}"),
            }
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = RandomDecider::seeded(config(0.4, 0.3, 0.3), 42).unwrap();
        let b = RandomDecider::seeded(config(0.4, 0.3, 0.3), 42).unwrap();
        let left: Vec<_> = (0..50).map(|_| a.decide()).collect();
        let right: Vec<_> = (0..50).map(|_| b.decide()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_mixed_distribution_hits_every_branch() {
        let decider = RandomDecider::seeded(config(0.4, 0.3, 0.3), 1).unwrap();
        let drawn: Vec<_> = (0..500).map(|_| decider.decide()).collect();
        assert!(drawn.contains(&Decision::Succeed));
        assert!(drawn.contains(&Decision::TemporaryFailure));
        assert!(drawn.iter().any(|d| matches!(d, Decision::DelayedSuccess(_))));
    }

    #[test]
    fn test_inverted_delay_bounds_rejected() {
        let inverted = EndpointConfig {
            min_delay_ms: 10,
            max_delay_ms: 5,
            ..config(0.0, 0.0, 1.0)
        };

        assert!(matches!(
            RandomDecider::seeded(inverted.clone(), 1),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(matches!(
            RandomDecider::new(inverted),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_rates_not_summing_to_one_rejected() {
        assert!(matches!(
            RandomDecider::seeded(config(0.5, 0.5, 0.5), 1),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_draws_stay_in_bounds_when_config_mutated_after_build() {
        let mut decider = RandomDecider::seeded(config(0.0, 0.0, 1.0), 3).unwrap();
        decider.config.min_delay_ms = 10;
        decider.config.max_delay_ms = 5;

        for _ in 0..50 {
            match decider.decide() {
                Decision::DelayedSuccess(d) => {
                    assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(10));
                }
                other => unreachable!("unexpected decision {other:?}"),
            }
        }
    }

    #[test]
    fn test_script_then_fallback() {
        let decider = ScriptedDecider::new([Decision::TemporaryFailure, Decision::Succeed])
            .with_fallback(Decision::Fault("down".into()));

        assert_eq!(decider.decide(), Decision::TemporaryFailure);
        assert_eq!(decider.decide(), Decision::Succeed);
        assert_eq!(decider.decide(), Decision::Fault("down".into()));
        assert_eq!(decider.draws(), 3);
    }

    #[test]
    fn test_always() {
        let decider = ScriptedDecider::always(Decision::TemporaryFailure);
        assert_eq!(decider.decide(), Decision::TemporaryFailure);
        assert_eq!(decider.decide(), Decision::TemporaryFailure);
        assert_eq!(decider.draws(), 2);
    }
}
