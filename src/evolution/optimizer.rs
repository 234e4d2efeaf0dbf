//! # GeneticOptimizer
//!
//! Runs one generational search over a [`Challenge`] under the control of a
//! [`StopCondition`]. An optimizer is consumed by [`GeneticOptimizer::execute`],
//! so every drift event gets a fresh instance.
//!
//! The run never fails outright. Scoring faults degrade the offending genotype
//! to the worst cost, and a panic inside the loop is caught and reported as
//! [`OptimizationStatus::Faulted`] next to whatever best solution was recorded
//! before it.

use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use super::{
    challenge::Challenge,
    options::{LogLevel, OptimizerOptions},
    stop::StopCondition,
};
use crate::{
    error::{GeneticError, Result},
    genotype::{Genotype, WORST_COST},
    rng::RandomNumberGenerator,
    selection::{ElitistSelection, SelectionStrategy, TournamentSelection},
    strategy::{BreedStrategy, UniformCrossoverStrategy},
};

/// The best genotype of a run and its cost.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionResult {
    pub genotype: Genotype,
    pub score: f64,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// The stop condition ended the run and at least one genotype was evaluated.
    Completed,
    /// The run ended before any genotype could be evaluated.
    NoSolution,
    /// The run was aborted by an unexpected fault.
    Faulted(String),
}

/// Result of [`GeneticOptimizer::execute`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    pub best: Option<EvolutionResult>,
    pub status: OptimizationStatus,
    pub evaluations: u64,
    pub generations: u64,
    pub elapsed_millis: u64,
}

impl OptimizationOutcome {
    /// Whether the outcome carries a configuration that may replace the live one.
    pub fn is_installable(&self) -> bool {
        self.status == OptimizationStatus::Completed && self.best.is_some()
    }
}

#[derive(Debug)]
pub struct GeneticOptimizer<C: Challenge> {
    challenge: C,
    stop_condition: StopCondition,
    options: OptimizerOptions,
    tournament: TournamentSelection,
    elitist: ElitistSelection,
    breed_strategy: UniformCrossoverStrategy,
    rng: RandomNumberGenerator,
    best: Option<EvolutionResult>,
}

impl<C: Challenge> GeneticOptimizer<C> {
    /// Creates an optimizer for one run.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` for invalid options and
    /// `GeneticError::EmptyEnsemble` when the challenge has no slot to search.
    pub fn new(
        challenge: C,
        stop_condition: StopCondition,
        options: OptimizerOptions,
        rng: RandomNumberGenerator,
    ) -> Result<Self> {
        options.validate()?;
        if challenge.size_encode() == 0 {
            return Err(GeneticError::EmptyEnsemble);
        }
        let tournament = TournamentSelection::new(options.get_tournament_size())?;
        let elitist = ElitistSelection::new(options.get_num_elitism());

        Ok(Self {
            challenge,
            stop_condition,
            options,
            tournament,
            elitist,
            breed_strategy: UniformCrossoverStrategy,
            rng,
            best: None,
        })
    }

    pub fn challenge(&self) -> &C {
        &self.challenge
    }

    pub fn options(&self) -> &OptimizerOptions {
        &self.options
    }

    pub fn stop_condition(&self) -> &StopCondition {
        &self.stop_condition
    }

    /// Runs the search until the stop condition ends it.
    pub fn execute(mut self) -> OptimizationOutcome {
        info!(
            size = self.challenge.size_encode(),
            population = self.options.get_population_size(),
            "genetic optimization started"
        );

        let status = match self.stop_condition.start() {
            Err(e) => OptimizationStatus::Faulted(e.to_string()),
            Ok(()) => match panic::catch_unwind(AssertUnwindSafe(|| self.run())) {
                Ok(Ok(())) if self.best.is_some() => OptimizationStatus::Completed,
                Ok(Ok(())) => OptimizationStatus::NoSolution,
                Ok(Err(e)) => OptimizationStatus::Faulted(e.to_string()),
                Err(payload) => OptimizationStatus::Faulted(panic_message(payload.as_ref())),
            },
        };
        self.stop_condition.stop();

        match &status {
            OptimizationStatus::Faulted(reason) => {
                warn!(%reason, "genetic optimization aborted");
            }
            _ => info!(
                best = self.best.as_ref().map(|b| b.score),
                "genetic optimization finished. {}", self.stop_condition
            ),
        }

        OptimizationOutcome {
            best: self.best,
            status,
            evaluations: self.stop_condition.performed_evaluations(),
            generations: self.stop_condition.performed_generations(),
            elapsed_millis: self.stop_condition.elapsed_millis(),
        }
    }

    fn run(&mut self) -> Result<()> {
        let size = self.options.get_population_size();
        let mut population = self.initial_population(size);
        self.evaluate_batch(&mut population);

        while self.stop_condition.is_running() {
            let parents = self.tournament.select(&population, size, &mut self.rng)?;
            let mut offspring = self
                .breed_strategy
                .breed(&parents, &self.options, &mut self.rng)?;
            self.evaluate_batch(&mut offspring);

            population = self.elitist.join(population, offspring, size);
            self.stop_condition.iteration();

            match self.options.get_log_level() {
                LogLevel::Minimal | LogLevel::Verbose => debug!(
                    generation = self.stop_condition.performed_generations(),
                    best = self.best.as_ref().map(|b| b.score),
                    leader = population.first().map(|g| g.cost()),
                    "generation completed"
                ),
                LogLevel::None => {}
            }
        }

        Ok(())
    }

    /// Up to half of the population comes from the challenge's seeds, the rest
    /// is uniform random.
    fn initial_population(&mut self, size: usize) -> Vec<Genotype> {
        let size_encode = self.challenge.size_encode();
        let mut population = Vec::with_capacity(size);

        while population.len() < size / 2 {
            match self.challenge.seed(&mut self.rng) {
                Some(genotype) if genotype.len() == size_encode => population.push(genotype),
                Some(genotype) => {
                    warn!(
                        expected = size_encode,
                        found = genotype.len(),
                        "discarding seed of the wrong size"
                    );
                    break;
                }
                None => break,
            }
        }
        let seeded = population.len();

        while population.len() < size {
            population.push(Genotype::random(size_encode, &mut self.rng));
        }

        debug!(seeded, random = size - seeded, "initial population built");
        population
    }

    /// Repairs and scores every unevaluated genotype of the batch. Genotypes
    /// reached after the stop condition ended the run stay unevaluated.
    fn evaluate_batch(&mut self, batch: &mut [Genotype]) {
        for genotype in batch.iter_mut() {
            if !genotype.is_evaluated() {
                genotype.repair();
            }
        }

        if batch.len() >= self.options.get_parallel_threshold() {
            let challenge = &self.challenge;
            let scores: Vec<Option<f64>> = batch
                .par_iter()
                .map(|genotype| (!genotype.is_evaluated()).then(|| challenge.score(genotype)))
                .collect();

            for (genotype, score) in batch.iter_mut().zip(scores) {
                if let Some(score) = score {
                    if self.stop_condition.is_running() {
                        self.settle(genotype, score);
                    }
                }
            }
        } else {
            for genotype in batch.iter_mut() {
                if genotype.is_evaluated() || !self.stop_condition.is_running() {
                    continue;
                }
                let score = self.challenge.score(genotype);
                self.settle(genotype, score);
            }
        }
    }

    fn settle(&mut self, genotype: &mut Genotype, score: f64) {
        let cost = if score.is_finite() {
            score
        } else {
            warn!(score, "non-finite cost replaced by the worst cost");
            WORST_COST
        };
        genotype.set_cost(cost);
        self.stop_condition.evaluation();

        if self.options.get_log_level() == LogLevel::Verbose {
            trace!(cost, genotype = %self.challenge.describe(genotype), "evaluated");
        }

        let improved = self.best.as_ref().map_or(true, |best| cost < best.score);
        if improved {
            self.best = Some(EvolutionResult {
                genotype: genotype.clone(),
                score: cost,
            });
            self.stop_condition.record_improvement();
            if self.options.get_log_level() != LogLevel::None {
                debug!(best = %self.challenge.describe(genotype), "new best configuration");
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "optimization panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::stop::StopBounds;

    /// Cost is the distance of the first slot to 0.9 once repaired.
    #[derive(Debug)]
    struct Target;

    impl Challenge for Target {
        fn size_encode(&self) -> usize {
            3
        }

        fn score(&self, genotype: &Genotype) -> f64 {
            (genotype.value(0) - 0.9).abs()
        }
    }

    #[derive(Debug)]
    struct Explosive;

    impl Challenge for Explosive {
        fn size_encode(&self) -> usize {
            2
        }

        fn score(&self, _genotype: &Genotype) -> f64 {
            panic!("scoring blew up")
        }
    }

    #[derive(Debug)]
    struct NotANumber;

    impl Challenge for NotANumber {
        fn size_encode(&self) -> usize {
            2
        }

        fn score(&self, _genotype: &Genotype) -> f64 {
            f64::NAN
        }
    }

    fn stop(generations: u64) -> StopCondition {
        StopCondition::new(StopBounds::default().with_max_generations(generations)).unwrap()
    }

    fn options() -> OptimizerOptions {
        OptimizerOptions::builder().population_size(10).build()
    }

    #[test]
    fn test_execute_completes() {
        let optimizer = GeneticOptimizer::new(
            Target,
            stop(20),
            options(),
            RandomNumberGenerator::from_seed(4),
        )
        .unwrap();

        let outcome = optimizer.execute();

        assert_eq!(outcome.status, OptimizationStatus::Completed);
        assert_eq!(outcome.generations, 20);
        assert!(outcome.evaluations >= 10);
        let best = outcome.best.unwrap();
        assert!(best.genotype.is_evaluated());
        assert!(best.score < 0.4);
    }

    #[test]
    fn test_zero_budget_yields_no_solution() {
        let optimizer =
            GeneticOptimizer::new(Target, stop(0), options(), RandomNumberGenerator::new())
                .unwrap();

        let outcome = optimizer.execute();

        assert_eq!(outcome.status, OptimizationStatus::NoSolution);
        assert!(outcome.best.is_none());
        assert!(!outcome.is_installable());
    }

    #[test]
    fn test_panic_is_reported_as_fault() {
        let optimizer =
            GeneticOptimizer::new(Explosive, stop(5), options(), RandomNumberGenerator::new())
                .unwrap();

        let outcome = optimizer.execute();

        match outcome.status {
            OptimizationStatus::Faulted(reason) => assert!(reason.contains("blew up")),
            other => panic!("Expected a fault, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_cost_becomes_worst() {
        let optimizer =
            GeneticOptimizer::new(NotANumber, stop(2), options(), RandomNumberGenerator::new())
                .unwrap();

        let outcome = optimizer.execute();

        assert_eq!(outcome.status, OptimizationStatus::Completed);
        assert_eq!(outcome.best.unwrap().score, WORST_COST);
    }

    #[test]
    fn test_parallel_scoring_matches_budget() {
        let options = OptimizerOptions::builder()
            .population_size(10)
            .parallel_threshold(1)
            .build();
        let bounds = StopBounds::default().with_max_evaluations(25);
        let optimizer = GeneticOptimizer::new(
            Target,
            StopCondition::new(bounds).unwrap(),
            options,
            RandomNumberGenerator::from_seed(2),
        )
        .unwrap();

        let outcome = optimizer.execute();

        assert_eq!(outcome.evaluations, 25);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = OptimizerOptions::builder().population_size(0).build();
        let result = GeneticOptimizer::new(Target, stop(1), options, RandomNumberGenerator::new());
        assert!(matches!(result, Err(GeneticError::Configuration(_))));
    }
}
