//! # driftga
//!
//! Drift-triggered genetic re-optimization of an online classifier ensemble.
//!
//! The [`evolution`] module holds a small real-coded genetic optimizer bounded
//! by a multi-criteria [`StopCondition`]. The [`ensemble`] module uses it to
//! re-weight the members of an [`EnsembleController`] whenever its change
//! detector reports a drift, inline or on a background worker.

pub mod caching;
pub mod ensemble;
pub mod error;
pub mod evolution;
pub mod genotype;
pub mod rng;
pub mod selection;
pub mod strategy;

// Re-export commonly used types for convenience
pub use ensemble::{EnsembleConfig, EnsembleController, Example, OptimizationMode, Schema};
pub use error::{GeneticError, OptionExt, Result, ResultExt};
pub use evolution::{
    Challenge, GeneticOptimizer, OptimizationOutcome, OptimizationStatus, OptimizerOptions,
    StopBounds, StopCondition,
};
pub use genotype::Genotype;
