//! # OptimizerOptions
//!
//! The `OptimizerOptions` struct holds the parameters of the genetic search run
//! after every drift event: population size, elitism, crossover and mutation
//! rates, tournament size, the parallel evaluation threshold and how much of the
//! search is logged.
//!
//! ## Example
//!
//! ```rust
//! use driftga::evolution::options::{LogLevel, OptimizerOptions};
//!
//! let options = OptimizerOptions::builder()
//!     .population_size(40)
//!     .num_elitism(2)
//!     .log_level(LogLevel::Minimal)
//!     .build();
//!
//! assert_eq!(options.get_population_size(), 40);
//! assert_eq!(options.get_rate_crossover(), 0.9);
//! ```

use crate::error::{GeneticError, Result};

/// How much of the search is reported through `tracing`.
///
/// - `Verbose`: one event per generation plus one per evaluated offspring.
/// - `Minimal`: one event per generation.
/// - `None`: only the start and the end of a run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Verbose,
    Minimal,
    None,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerOptions {
    population_size: usize,
    num_elitism: usize,
    rate_crossover: f64,
    rate_locus: f64,
    tournament_size: usize,
    mutation_lambda: f64,
    /// Minimum offspring batch size scored in parallel
    parallel_threshold: usize,
    log_level: LogLevel,
}

impl OptimizerOptions {
    pub fn get_population_size(&self) -> usize {
        self.population_size
    }

    pub fn get_num_elitism(&self) -> usize {
        self.num_elitism
    }

    pub fn get_rate_crossover(&self) -> f64 {
        self.rate_crossover
    }

    pub fn get_rate_locus(&self) -> f64 {
        self.rate_locus
    }

    pub fn get_tournament_size(&self) -> usize {
        self.tournament_size
    }

    pub fn get_mutation_lambda(&self) -> f64 {
        self.mutation_lambda
    }

    /// Returns the minimum number of offspring scored in parallel.
    pub fn get_parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    pub fn get_log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Sets the population size.
    pub fn set_population_size(&mut self, population_size: usize) {
        self.population_size = population_size;
    }

    /// Sets the number of elite individuals considered at each join.
    pub fn set_num_elitism(&mut self, num_elitism: usize) {
        self.num_elitism = num_elitism;
    }

    /// Sets the log level.
    pub fn set_log_level(&mut self, log_level: LogLevel) {
        self.log_level = log_level;
    }

    /// Sets the parallel threshold.
    pub fn set_parallel_threshold(&mut self, threshold: usize) {
        self.parallel_threshold = threshold;
    }

    /// Checks that the options describe a runnable search.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` when the population cannot form a
    /// crossover pair, when a rate is outside `[0, 1]`, when the tournament is
    /// empty or when the mutation rate is negative.
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(GeneticError::Configuration(
                "Population size cannot be zero".to_string(),
            ));
        }
        if self.population_size < 2 {
            return Err(GeneticError::Configuration(
                "Population size must be at least 2 to form crossover pairs".to_string(),
            ));
        }
        for (name, rate) in [
            ("Crossover rate", self.rate_crossover),
            ("Locus rate", self.rate_locus),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(GeneticError::Configuration(format!(
                    "{} must be within [0, 1], got {}",
                    name, rate
                )));
            }
        }
        if self.tournament_size < 1 {
            return Err(GeneticError::Configuration(
                "Tournament size must be at least 1".to_string(),
            ));
        }
        if !self.mutation_lambda.is_finite() || self.mutation_lambda < 0.0 {
            return Err(GeneticError::Configuration(format!(
                "Mutation rate must be a finite non-negative number, got {}",
                self.mutation_lambda
            )));
        }
        Ok(())
    }

    /// Returns a builder for creating an `OptimizerOptions` instance.
    pub fn builder() -> OptimizerOptionsBuilder {
        OptimizerOptionsBuilder::default()
    }
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            population_size: 30,
            num_elitism: 3,
            rate_crossover: 0.9,
            rate_locus: 0.5,
            tournament_size: 2,
            mutation_lambda: 1.0,
            parallel_threshold: 1000,
            log_level: LogLevel::None,
        }
    }
}

/// Builder for `OptimizerOptions`.
#[derive(Debug, Clone, Default)]
pub struct OptimizerOptionsBuilder {
    population_size: Option<usize>,
    num_elitism: Option<usize>,
    rate_crossover: Option<f64>,
    rate_locus: Option<f64>,
    tournament_size: Option<usize>,
    mutation_lambda: Option<f64>,
    parallel_threshold: Option<usize>,
    log_level: Option<LogLevel>,
}

impl OptimizerOptionsBuilder {
    pub fn population_size(mut self, value: usize) -> Self {
        self.population_size = Some(value);
        self
    }

    pub fn num_elitism(mut self, value: usize) -> Self {
        self.num_elitism = Some(value);
        self
    }

    pub fn rate_crossover(mut self, value: f64) -> Self {
        self.rate_crossover = Some(value);
        self
    }

    pub fn rate_locus(mut self, value: f64) -> Self {
        self.rate_locus = Some(value);
        self
    }

    pub fn tournament_size(mut self, value: usize) -> Self {
        self.tournament_size = Some(value);
        self
    }

    /// Sets the mean number of mutated slots per offspring.
    pub fn mutation_lambda(mut self, value: f64) -> Self {
        self.mutation_lambda = Some(value);
        self
    }

    pub fn parallel_threshold(mut self, value: usize) -> Self {
        self.parallel_threshold = Some(value);
        self
    }

    pub fn log_level(mut self, value: LogLevel) -> Self {
        self.log_level = Some(value);
        self
    }

    /// Builds the `OptimizerOptions` instance. Unset fields keep their defaults.
    pub fn build(self) -> OptimizerOptions {
        let default = OptimizerOptions::default();
        OptimizerOptions {
            population_size: self.population_size.unwrap_or(default.population_size),
            num_elitism: self.num_elitism.unwrap_or(default.num_elitism),
            rate_crossover: self.rate_crossover.unwrap_or(default.rate_crossover),
            rate_locus: self.rate_locus.unwrap_or(default.rate_locus),
            tournament_size: self.tournament_size.unwrap_or(default.tournament_size),
            mutation_lambda: self.mutation_lambda.unwrap_or(default.mutation_lambda),
            parallel_threshold: self
                .parallel_threshold
                .unwrap_or(default.parallel_threshold),
            log_level: self.log_level.unwrap_or(default.log_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = OptimizerOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.get_population_size(), 30);
        assert_eq!(options.get_num_elitism(), 3);
        assert_eq!(options.get_tournament_size(), 2);
    }

    #[test]
    fn test_zero_population_rejected() {
        let options = OptimizerOptions::builder().population_size(0).build();
        match options.validate() {
            Err(GeneticError::Configuration(msg)) => {
                assert!(msg.contains("Population size cannot be zero"))
            }
            _ => panic!("Expected Configuration error"),
        }
    }

    #[test]
    fn test_rates_out_of_range_rejected() {
        assert!(OptimizerOptions::builder()
            .rate_crossover(1.5)
            .build()
            .validate()
            .is_err());
        assert!(OptimizerOptions::builder()
            .rate_locus(-0.1)
            .build()
            .validate()
            .is_err());
        assert!(OptimizerOptions::builder()
            .mutation_lambda(f64::NAN)
            .build()
            .validate()
            .is_err());
    }
}
