//! # BreedStrategy
//!
//! The `BreedStrategy` trait defines the interface for strategies responsible for breeding
//! offspring genotypes out of the parents picked by selection.
pub mod uniform;

use std::fmt::Debug;

use crate::{
    error::Result, evolution::options::OptimizerOptions, genotype::Genotype,
    rng::RandomNumberGenerator,
};

pub trait BreedStrategy
where
    Self: Debug + Clone + Send + Sync,
{
    /// Breeds one offspring per parent.
    ///
    /// ## Parameters
    ///
    /// - `parents`: The parents picked by selection, paired in order.
    /// - `options`: The optimizer options holding crossover and mutation rates.
    /// - `rng`: The random number generator driving crossover and mutation.
    ///
    /// ## Errors
    ///
    /// Returns `GeneticError::EmptyPopulation` if `parents` is empty.
    fn breed(
        &self,
        parents: &[Genotype],
        options: &OptimizerOptions,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<Genotype>>;
}

pub use uniform::UniformCrossoverStrategy;
