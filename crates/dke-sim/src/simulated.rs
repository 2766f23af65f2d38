//! Simulated learner with a known true ability.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dke_core::model::Item;
use dke_core::traits::ResponseSource;

/// Answers each item correctly with probability `P(correct | theta_true)`.
///
/// The generator is seeded, so the same seed and item sequence always
/// produce the same outcomes.
#[derive(Debug, Clone)]
pub struct SimulatedStudent {
    theta_true: f64,
    rng: StdRng,
    answered: usize,
}

impl SimulatedStudent {
    pub fn new(theta_true: f64, seed: u64) -> Self {
        Self {
            theta_true,
            rng: StdRng::seed_from_u64(seed),
            answered: 0,
        }
    }

    pub fn theta_true(&self) -> f64 {
        self.theta_true
    }

    /// Number of items answered so far.
    pub fn answered(&self) -> usize {
        self.answered
    }
}

impl ResponseSource for SimulatedStudent {
    fn respond(&mut self, item: &Item) -> Option<bool> {
        let p = item.p_correct(self.theta_true);
        let correct = self.rng.gen::<f64>() < p;
        self.answered += 1;
        tracing::trace!(item = %item.id, p, correct, "simulated response");
        Some(correct)
    }
}
