//! # RandomNumberGenerator
//!
//! The `RandomNumberGenerator` struct provides a small interface over the `rand`
//! crate's `StdRng` covering everything the optimizer and the controller draw:
//! uniform reals, indices, Gaussian noise and Poisson counts.
//!
//! ## Example
//!
//! ```rust
//! use driftga::rng::RandomNumberGenerator;
//!
//! let mut rng = RandomNumberGenerator::from_seed(7);
//! let random_numbers = rng.fetch_uniform(0.0, 1.0, 5);
//!
//! for number in random_numbers {
//!     assert!((0.0..1.0).contains(&number));
//! }
//! ```

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::collections::VecDeque;

/// A wrapper around the `rand` crate's `StdRng`.
#[derive(Clone, Debug)]
pub struct RandomNumberGenerator {
    pub rng: StdRng,
}

impl RandomNumberGenerator {
    /// Creates a new `RandomNumberGenerator` instance seeded from the system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a new `RandomNumberGenerator` instance with a specific seed.
    ///
    /// This is useful for reproducible tests and benchmarks.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generates a specified number of random floating-point numbers within the given range.
    ///
    /// # Parameters
    ///
    /// - `from`: The lower bound of the range (inclusive).
    /// - `to`: The upper bound of the range (exclusive).
    /// - `num`: The number of random numbers to generate.
    pub fn fetch_uniform(&mut self, from: f64, to: f64, num: usize) -> VecDeque<f64> {
        let mut uniform_numbers = VecDeque::with_capacity(num);
        uniform_numbers.extend((0..num).map(|_| self.rng.gen_range(from..to)));
        uniform_numbers
    }

    /// Returns a uniform draw from `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Returns a uniform index from `0..upper`. `upper` must be positive.
    pub fn gen_index(&mut self, upper: usize) -> usize {
        self.rng.gen_range(0..upper)
    }

    /// Returns a draw from the standard normal distribution.
    pub fn gaussian(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    /// Returns a Poisson-distributed count using Knuth's product method:
    /// uniform draws are multiplied until the product falls below `e^-lambda`.
    pub fn poisson(&mut self, lambda: f64) -> usize {
        let threshold = (-lambda).exp();
        let mut events = 0;
        let mut acc = 1.0;
        loop {
            events += 1;
            acc *= self.next_f64();
            if acc <= threshold {
                break;
            }
        }
        events - 1
    }

    /// Returns a fresh seed, used to hand an independent generator to a worker.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.gen::<u64>()
    }
}

impl Default for RandomNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}
