pub mod builder;
pub mod challenge;
pub mod optimizer;
pub mod options;
pub mod stop;

pub use builder::GeneticOptimizerBuilder;
pub use challenge::Challenge;
pub use optimizer::{EvolutionResult, GeneticOptimizer, OptimizationOutcome, OptimizationStatus};
pub use options::{LogLevel, OptimizerOptions};
pub use stop::{StopBounds, StopCondition};
