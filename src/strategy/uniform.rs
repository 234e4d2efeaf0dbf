use super::BreedStrategy;
use crate::{
    error::{GeneticError, Result},
    evolution::options::OptimizerOptions,
    genotype::Genotype,
    rng::RandomNumberGenerator,
};

/// # UniformCrossoverStrategy
///
/// Parents are taken in consecutive pairs. With probability `rate_crossover` a
/// pair produces two offspring by per-locus uniform crossover, otherwise the
/// offspring are copies of the parents. Every offspring is then mutated with a
/// Poisson number of Gaussian perturbations and comes out unevaluated, so each
/// one costs an evaluation. An unpaired last parent produces no offspring.
#[derive(Debug, Clone, Default)]
pub struct UniformCrossoverStrategy;

impl BreedStrategy for UniformCrossoverStrategy {
    fn breed(
        &self,
        parents: &[Genotype],
        options: &OptimizerOptions,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<Genotype>> {
        if parents.is_empty() {
            return Err(GeneticError::EmptyPopulation);
        }

        let mut offspring = Vec::with_capacity(parents.len());
        for pair in parents.chunks_exact(2) {
            let (first, second) = (&pair[0], &pair[1]);
            if rng.next_f64() < options.get_rate_crossover() {
                let (a, b) = first.crossover_uniform(second, options.get_rate_locus(), rng);
                offspring.push(a);
                offspring.push(b);
            } else {
                offspring.push(Genotype::from_values(first.values().to_vec()));
                offspring.push(Genotype::from_values(second.values().to_vec()));
            }
        }

        for child in offspring.iter_mut() {
            child.mutate(options.get_mutation_lambda(), rng);
        }

        Ok(offspring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breed_produces_one_offspring_per_paired_parent() {
        let mut rng = RandomNumberGenerator::from_seed(8);
        let parents: Vec<Genotype> = (0..5).map(|_| Genotype::random(4, &mut rng)).collect();

        let offspring = UniformCrossoverStrategy
            .breed(&parents, &OptimizerOptions::default(), &mut rng)
            .unwrap();

        assert_eq!(offspring.len(), 4);
        assert!(offspring.iter().all(|g| g.len() == 4));
        assert!(offspring
            .iter()
            .all(|g| g.values().iter().all(|v| (0.0..=1.0).contains(v))));
    }

    #[test]
    fn test_breed_without_crossover_or_mutation_copies_unevaluated() {
        let mut rng = RandomNumberGenerator::from_seed(8);
        let parents: Vec<Genotype> = (0..4)
            .map(|i| {
                let mut genotype = Genotype::random(3, &mut rng);
                genotype.set_cost(i as f64 / 10.0);
                genotype
            })
            .collect();
        let options = OptimizerOptions::builder()
            .rate_crossover(0.0)
            .mutation_lambda(0.0)
            .build();

        let offspring = UniformCrossoverStrategy
            .breed(&parents, &options, &mut rng)
            .unwrap();

        assert_eq!(offspring.len(), 4);
        for (child, parent) in offspring.iter().zip(parents.iter()) {
            assert!(child.equals_encode(parent));
            assert!(!child.is_evaluated());
        }
    }

    #[test]
    fn test_breed_empty_parents() {
        let mut rng = RandomNumberGenerator::new();
        let result = UniformCrossoverStrategy.breed(&[], &OptimizerOptions::default(), &mut rng);
        assert!(matches!(result, Err(GeneticError::EmptyPopulation)));
    }
}
