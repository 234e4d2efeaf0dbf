use std::cmp::Ordering;

use crate::error::{GeneticError, Result};
use crate::genotype::Genotype;
use crate::rng::RandomNumberGenerator;
use crate::selection::selection_strategy::SelectionStrategy;

/// A selection strategy that selects individuals through tournament selection.
///
/// Each tournament draws `tournament_size` contestants uniformly at random, with
/// replacement, and keeps the one with the lowest cost. A tournament size of two
/// gives the classic binary tournament, a size of one degrades to random
/// selection.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct TournamentSelection {
    tournament_size: usize,
}

impl TournamentSelection {
    /// Creates a new TournamentSelection strategy with the specified tournament size.
    ///
    /// # Errors
    ///
    /// Returns an error if `tournament_size` is 0.
    pub fn new(tournament_size: usize) -> Result<Self> {
        if tournament_size < 1 {
            return Err(GeneticError::Configuration(
                "Tournament size must be at least 1".to_string(),
            ));
        }

        Ok(Self { tournament_size })
    }

    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }

    /// Runs a single tournament and returns the index of the winner.
    fn run_tournament(&self, population: &[Genotype], rng: &mut RandomNumberGenerator) -> usize {
        let mut best_idx = rng.gen_index(population.len());

        for _ in 1..self.tournament_size {
            let idx = rng.gen_index(population.len());
            if population[idx].compare(&population[best_idx]) == Ordering::Less {
                best_idx = idx;
            }
        }

        best_idx
    }
}

impl Default for TournamentSelection {
    /// Binary tournament.
    fn default() -> Self {
        Self { tournament_size: 2 }
    }
}

impl SelectionStrategy for TournamentSelection {
    fn select(
        &self,
        population: &[Genotype],
        num_to_select: usize,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<Genotype>> {
        if population.is_empty() {
            return Err(GeneticError::EmptyPopulation);
        }

        let selected = (0..num_to_select)
            .map(|_| population[self.run_tournament(population, rng)].clone())
            .collect();

        Ok(selected)
    }
}
