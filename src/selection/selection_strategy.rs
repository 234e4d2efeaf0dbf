use std::fmt::Debug;

use crate::error::Result;
use crate::genotype::Genotype;
use crate::rng::RandomNumberGenerator;

/// Trait for parent selection over a population of evaluated genotypes.
///
/// Costs are read from the genotypes themselves, lower being better.
///
/// # Examples
///
/// ```
/// use driftga::genotype::Genotype;
/// use driftga::rng::RandomNumberGenerator;
/// use driftga::selection::{SelectionStrategy, TournamentSelection};
///
/// let population: Vec<Genotype> = [0.4, 0.1, 0.7]
///     .iter()
///     .map(|cost| {
///         let mut genotype = Genotype::new(2);
///         genotype.set_cost(*cost);
///         genotype
///     })
///     .collect();
///
/// let mut rng = RandomNumberGenerator::from_seed(3);
/// let selection = TournamentSelection::new(2).unwrap();
/// let parents = selection.select(&population, 4, &mut rng).unwrap();
///
/// assert_eq!(parents.len(), 4);
/// ```
pub trait SelectionStrategy: Debug + Send + Sync {
    /// Selects `num_to_select` individuals from the population.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::EmptyPopulation` if the population is empty.
    fn select(
        &self,
        population: &[Genotype],
        num_to_select: usize,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<Genotype>>;
}
