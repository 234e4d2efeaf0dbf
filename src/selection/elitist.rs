use crate::error::{GeneticError, Result};
use crate::genotype::Genotype;
use crate::rng::RandomNumberGenerator;
use crate::selection::selection_strategy::SelectionStrategy;

/// A selection strategy that keeps the best individuals of a population.
///
/// Besides plain selection it performs the generational join: the next
/// population is made of at most `num_elitism` elites of the current one,
/// followed by the best offspring.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ElitistSelection {
    /// Upper bound on the individuals carried over unchanged at each join.
    num_elitism: usize,
}

impl ElitistSelection {
    pub fn new(num_elitism: usize) -> Self {
        Self { num_elitism }
    }

    pub fn num_elitism(&self) -> usize {
        self.num_elitism
    }

    /// Builds the next generation out of the current population and its offspring.
    ///
    /// Both sides are sorted by ascending cost. An elite is carried over only
    /// while it is strictly better than the best offspring, so the best cost of
    /// the result never exceeds the best cost of either input. The remainder, up
    /// to `size`, is filled with offspring.
    pub fn join(
        &self,
        mut population: Vec<Genotype>,
        mut offspring: Vec<Genotype>,
        size: usize,
    ) -> Vec<Genotype> {
        population.sort_by(|a, b| a.compare(b));
        offspring.sort_by(|a, b| a.compare(b));

        let mut next = Vec::with_capacity(size);
        for elite in population.into_iter().take(self.num_elitism.min(size)) {
            let dominates = match offspring.first() {
                Some(best) => elite.is_evaluated() && elite.compare(best).is_lt(),
                None => true,
            };
            if !dominates {
                break;
            }
            next.push(elite);
        }

        let room = size - next.len();
        next.extend(offspring.into_iter().take(room));
        next
    }
}

impl Default for ElitistSelection {
    fn default() -> Self {
        Self { num_elitism: 3 }
    }
}

impl SelectionStrategy for ElitistSelection {
    fn select(
        &self,
        population: &[Genotype],
        num_to_select: usize,
        _rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<Genotype>> {
        if population.is_empty() {
            return Err(GeneticError::EmptyPopulation);
        }

        let mut ranked: Vec<&Genotype> = population.iter().collect();
        ranked.sort_by(|a, b| a.compare(b));

        Ok(ranked
            .into_iter()
            .take(num_to_select)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluated(cost: f64) -> Genotype {
        let mut genotype = Genotype::from_values(vec![cost]);
        genotype.set_cost(cost);
        genotype
    }

    fn costs(population: &[Genotype]) -> Vec<f64> {
        population.iter().map(|g| g.cost()).collect()
    }

    #[test]
    fn test_elitist_selection() {
        let population: Vec<Genotype> = [0.5, 0.8, 0.3, 0.9, 0.1].map(evaluated).to_vec();
        let mut rng = RandomNumberGenerator::new();

        let selected = ElitistSelection::default()
            .select(&population, 3, &mut rng)
            .unwrap();

        assert_eq!(costs(&selected), vec![0.1, 0.3, 0.5]);
    }

    #[test]
    fn test_join_keeps_dominating_elites() {
        let population = [0.1, 0.2, 0.6].map(evaluated).to_vec();
        let offspring = [0.4, 0.3, 0.5, 0.7].map(evaluated).to_vec();

        let next = ElitistSelection::new(3).join(population, offspring, 4);

        // 0.6 does not beat the best offspring and stops the elite run.
        assert_eq!(costs(&next), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_join_drops_elites_equal_to_best_offspring() {
        let population = [0.2, 0.3].map(evaluated).to_vec();
        let offspring = [0.2, 0.9].map(evaluated).to_vec();

        let next = ElitistSelection::new(1).join(population, offspring, 2);

        assert_eq!(costs(&next), vec![0.2, 0.9]);
    }

    #[test]
    fn test_join_is_monotonic() {
        let mut rng = RandomNumberGenerator::from_seed(21);
        let mut population: Vec<Genotype> =
            (0..6).map(|_| evaluated(rng.next_f64())).collect();
        let selection = ElitistSelection::new(1);

        for _ in 0..50 {
            let before = costs(&population).into_iter().fold(f64::INFINITY, f64::min);
            let offspring: Vec<Genotype> = (0..6).map(|_| evaluated(rng.next_f64())).collect();
            population = selection.join(population, offspring, 6);
            let after = costs(&population).into_iter().fold(f64::INFINITY, f64::min);

            assert_eq!(population.len(), 6);
            assert!(after <= before);
        }
    }

    #[test]
    fn test_elitist_selection_empty_population() {
        let mut rng = RandomNumberGenerator::new();
        match ElitistSelection::default().select(&[], 2, &mut rng) {
            Err(GeneticError::EmptyPopulation) => {}
            _ => panic!("Expected EmptyPopulation error"),
        }
    }
}
