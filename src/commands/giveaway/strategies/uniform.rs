use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::commands::giveaway::strategies::base::{DrawOptions, GiveawayStrategy};

/// Draws winners without replacement, every remaining participant being
/// equally likely at each step.
#[derive(Debug)]
pub struct UniformDrawStrategy {
    rng: Mutex<StdRng>,
}

impl UniformDrawStrategy {
    pub fn new() -> Self {
        UniformDrawStrategy {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    // Reproducible draws for the same seed.
    pub fn with_seed(seed: u64) -> Self {
        UniformDrawStrategy {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for UniformDrawStrategy {
    fn default() -> Self {
        UniformDrawStrategy::new()
    }
}

impl GiveawayStrategy for UniformDrawStrategy {
    fn draw(&self, options: &DrawOptions) -> Vec<String> {
        let winner_count = options.effective_winner_count();
        let mut pool = options
            .participants()
            .iter()
            .cloned()
            .collect::<Vec<String>>();
        let mut winners = Vec::with_capacity(winner_count);

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        for _ in 0..winner_count {
            let index = rng.random_range(0..pool.len());
            winners.push(pool.swap_remove(index));
        }

        winners
    }
}
