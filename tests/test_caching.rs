use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use driftga::{
    caching::CachedChallenge,
    evolution::{Challenge, GeneticOptimizer, OptimizerOptions, StopBounds, StopCondition},
    genotype::Genotype,
    rng::RandomNumberGenerator,
};

// Counts every call that reaches the wrapped challenge.
#[derive(Debug, Clone)]
struct CostlyChallenge {
    evaluations: Arc<AtomicUsize>,
}

impl CostlyChallenge {
    fn new() -> Self {
        Self {
            evaluations: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn get_evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl Challenge for CostlyChallenge {
    fn size_encode(&self) -> usize {
        3
    }

    fn score(&self, genotype: &Genotype) -> f64 {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(1));
        let active = genotype.activation_pattern().iter().filter(|a| **a).count();
        1.0 - active as f64 / 3.0
    }
}

#[test]
fn test_direct_caching() {
    let challenge = CostlyChallenge::new();
    let cached = CachedChallenge::new(challenge.clone());

    let genotype = Genotype::from_values(vec![0.9, 0.0, 0.0]);
    let first = cached.score(&genotype);
    let second = cached.score(&genotype.clone());

    assert_eq!(first, second);
    assert_eq!(challenge.get_evaluations(), 1);
    assert_eq!(cached.inner().get_evaluations(), 1);
}

#[test]
fn test_clones_share_the_cache() {
    let challenge = CostlyChallenge::new();
    let cached = CachedChallenge::new(challenge.clone());
    let clone = cached.clone();

    cached.score(&Genotype::new(3));
    clone.score(&Genotype::new(3));

    assert_eq!(challenge.get_evaluations(), 1);
    assert_eq!(clone.cache_size(), 1);
}

#[test]
fn test_optimizer_with_cache() {
    let challenge = CostlyChallenge::new();
    let cached = CachedChallenge::new(challenge.clone());
    let stop = StopCondition::new(StopBounds::default().with_max_evaluations(120)).unwrap();
    let options = OptimizerOptions::builder()
        .population_size(10)
        .num_elitism(2)
        .build();

    let optimizer = GeneticOptimizer::new(
        cached.clone(),
        stop,
        options,
        RandomNumberGenerator::from_seed(11),
    )
    .unwrap();
    let outcome = optimizer.execute();

    assert_eq!(outcome.evaluations, 120);
    assert!(challenge.get_evaluations() as u64 <= outcome.evaluations);
    assert_eq!(cached.cache_size(), challenge.get_evaluations());
    assert_eq!(outcome.best.unwrap().score, 0.0);
}
