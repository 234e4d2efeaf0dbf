//! # EnsembleConfig
//!
//! Parameters of an [`EnsembleController`](super::EnsembleController): pool
//! layout, weight decay, what triggers an optimization, the budget of each
//! optimization and how it is executed.
//!
//! ## Example
//!
//! ```rust
//! use driftga::ensemble::{EnsembleConfig, OptimizationMode};
//!
//! let config = EnsembleConfig::builder()
//!     .initial_size(5)
//!     .hidden_size(5)
//!     .max_size(20)
//!     .mode(OptimizationMode::Inline)
//!     .optimization_period(500)
//!     .build();
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.optimization_period(), Some(500));
//! ```

use crate::error::{GeneticError, Result};
use crate::evolution::{OptimizerOptions, StopBounds};

/// Where an optimization runs.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationMode {
    /// On the streaming thread, blocking it until the run ends.
    Inline,
    /// On the worker thread; the streaming thread waits for the result.
    Join,
    /// On the worker thread while streaming continues. The result is installed
    /// on the first example processed after it arrives.
    Detached,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleConfig {
    initial_size: usize,
    hidden_size: usize,
    max_size: usize,
    beta: f64,
    optimization_enabled: bool,
    /// Examples between two scheduled optimizations, on top of drift triggers.
    optimization_period: Option<usize>,
    epochs: u64,
    max_evaluations: u64,
    max_seconds: u64,
    buffer_capacity: usize,
    memory_capacity: usize,
    sample_before_optimization: bool,
    sample_after_optimization: bool,
    reset_buffer_on_optimization: bool,
    attribute_selection: bool,
    fitness_cache: bool,
    mode: OptimizationMode,
    seed: u64,
    optimizer: OptimizerOptions,
}

impl EnsembleConfig {
    pub fn builder() -> EnsembleConfigBuilder {
        EnsembleConfigBuilder::default()
    }

    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn optimization_enabled(&self) -> bool {
        self.optimization_enabled
    }

    pub fn optimization_period(&self) -> Option<usize> {
        self.optimization_period
    }

    pub fn epochs(&self) -> u64 {
        self.epochs
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    pub fn memory_capacity(&self) -> usize {
        self.memory_capacity
    }

    pub fn sample_before_optimization(&self) -> bool {
        self.sample_before_optimization
    }

    pub fn sample_after_optimization(&self) -> bool {
        self.sample_after_optimization
    }

    pub fn reset_buffer_on_optimization(&self) -> bool {
        self.reset_buffer_on_optimization
    }

    pub fn attribute_selection(&self) -> bool {
        self.attribute_selection
    }

    pub fn fitness_cache(&self) -> bool {
        self.fitness_cache
    }

    pub fn mode(&self) -> OptimizationMode {
        self.mode
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn optimizer(&self) -> &OptimizerOptions {
        &self.optimizer
    }

    /// Budget of one optimization: at most `max_evaluations` evaluations,
    /// `epochs` generations and `max_seconds` seconds. The search also ends
    /// after `epochs` generations' worth of steps without improvement, where a
    /// generation is one step per offspring evaluation plus the iteration itself.
    pub fn stop_bounds(&self) -> StopBounds {
        let steps_per_generation = self.optimizer.get_population_size() as u64 + 1;
        StopBounds::new(
            0,
            Some(self.max_evaluations),
            0,
            Some(self.epochs),
            Some(self.epochs.saturating_mul(steps_per_generation)),
            0,
            Some(self.max_seconds),
        )
    }

    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` for a pool that cannot hold its
    /// initial and hidden members, a decay factor outside `(0, 1]`, a zero
    /// period or epoch budget, or invalid optimizer options.
    pub fn validate(&self) -> Result<()> {
        if self.initial_size == 0 {
            return Err(GeneticError::Configuration(
                "Initial ensemble size must be at least 1".to_string(),
            ));
        }
        if self.initial_size + self.hidden_size > self.max_size {
            return Err(GeneticError::Configuration(format!(
                "Initial ({}) and hidden ({}) members exceed the maximum ensemble size ({})",
                self.initial_size, self.hidden_size, self.max_size
            )));
        }
        if !(self.beta > 0.0 && self.beta <= 1.0) {
            return Err(GeneticError::Configuration(format!(
                "Punishment factor must be within (0, 1], got {}",
                self.beta
            )));
        }
        if self.optimization_period == Some(0) {
            return Err(GeneticError::Configuration(
                "Optimization period must be at least 1".to_string(),
            ));
        }
        if self.epochs == 0 {
            return Err(GeneticError::Configuration(
                "Epoch budget must be at least 1".to_string(),
            ));
        }
        self.optimizer.validate()
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            initial_size: 10,
            hidden_size: 10,
            max_size: 50,
            beta: 0.95,
            optimization_enabled: true,
            optimization_period: None,
            epochs: 100,
            max_evaluations: 2000,
            max_seconds: 120,
            buffer_capacity: 1000,
            memory_capacity: 30,
            sample_before_optimization: false,
            sample_after_optimization: false,
            reset_buffer_on_optimization: false,
            attribute_selection: false,
            fitness_cache: false,
            mode: OptimizationMode::Join,
            seed: 1,
            optimizer: OptimizerOptions::default(),
        }
    }
}

/// Builder for `EnsembleConfig`, starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct EnsembleConfigBuilder {
    config: EnsembleConfig,
}

impl EnsembleConfigBuilder {
    pub fn initial_size(mut self, value: usize) -> Self {
        self.config.initial_size = value;
        self
    }

    pub fn hidden_size(mut self, value: usize) -> Self {
        self.config.hidden_size = value;
        self
    }

    pub fn max_size(mut self, value: usize) -> Self {
        self.config.max_size = value;
        self
    }

    pub fn beta(mut self, value: f64) -> Self {
        self.config.beta = value;
        self
    }

    pub fn optimization_enabled(mut self, value: bool) -> Self {
        self.config.optimization_enabled = value;
        self
    }

    pub fn optimization_period(mut self, value: usize) -> Self {
        self.config.optimization_period = Some(value);
        self
    }

    pub fn epochs(mut self, value: u64) -> Self {
        self.config.epochs = value;
        self
    }

    pub fn max_evaluations(mut self, value: u64) -> Self {
        self.config.max_evaluations = value;
        self
    }

    pub fn max_seconds(mut self, value: u64) -> Self {
        self.config.max_seconds = value;
        self
    }

    pub fn buffer_capacity(mut self, value: usize) -> Self {
        self.config.buffer_capacity = value;
        self
    }

    pub fn memory_capacity(mut self, value: usize) -> Self {
        self.config.memory_capacity = value;
        self
    }

    pub fn sample_before_optimization(mut self, value: bool) -> Self {
        self.config.sample_before_optimization = value;
        self
    }

    pub fn sample_after_optimization(mut self, value: bool) -> Self {
        self.config.sample_after_optimization = value;
        self
    }

    pub fn reset_buffer_on_optimization(mut self, value: bool) -> Self {
        self.config.reset_buffer_on_optimization = value;
        self
    }

    pub fn attribute_selection(mut self, value: bool) -> Self {
        self.config.attribute_selection = value;
        self
    }

    pub fn fitness_cache(mut self, value: bool) -> Self {
        self.config.fitness_cache = value;
        self
    }

    pub fn mode(mut self, value: OptimizationMode) -> Self {
        self.config.mode = value;
        self
    }

    pub fn seed(mut self, value: u64) -> Self {
        self.config.seed = value;
        self
    }

    pub fn optimizer(mut self, value: OptimizerOptions) -> Self {
        self.config.optimizer = value;
        self
    }

    pub fn build(self) -> EnsembleConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EnsembleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mode(), OptimizationMode::Join);
        assert_eq!(config.optimization_period(), None);

        let bounds = config.stop_bounds();
        assert_eq!(bounds.max_evaluations(), Some(2000));
        assert_eq!(bounds.max_generations(), Some(100));
        assert_eq!(bounds.max_without_improvement(), Some(100 * 31));
        assert_eq!(bounds.max_seconds(), Some(120));
    }

    #[test]
    fn test_pool_too_small() {
        let config = EnsembleConfig::builder()
            .initial_size(8)
            .hidden_size(5)
            .max_size(10)
            .build();
        assert!(matches!(
            config.validate(),
            Err(GeneticError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_beta_and_period() {
        assert!(EnsembleConfig::builder().beta(0.0).build().validate().is_err());
        assert!(EnsembleConfig::builder().beta(f64::NAN).build().validate().is_err());
        assert!(EnsembleConfig::builder()
            .optimization_period(0)
            .build()
            .validate()
            .is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let config = EnsembleConfig::builder().initial_size(4).seed(9).build();
        let json = serde_json::to_string(&config).unwrap();
        let back: EnsembleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
