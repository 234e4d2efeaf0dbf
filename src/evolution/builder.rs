use crate::{
    error::{GeneticError, Result},
    rng::RandomNumberGenerator,
};

use super::{Challenge, GeneticOptimizer, OptimizerOptions, StopCondition};

/// Builder for [`GeneticOptimizer`]. The challenge and the stop condition are
/// required; options and the random number generator fall back to defaults.
pub struct GeneticOptimizerBuilder<C>
where
    C: Challenge,
{
    challenge: Option<C>,
    stop_condition: Option<StopCondition>,
    options: Option<OptimizerOptions>,
    rng: Option<RandomNumberGenerator>,
}

impl<C> GeneticOptimizerBuilder<C>
where
    C: Challenge,
{
    pub fn new() -> Self {
        Self {
            challenge: None,
            stop_condition: None,
            options: None,
            rng: None,
        }
    }

    pub fn with_challenge(mut self, challenge: C) -> Self {
        self.challenge = Some(challenge);
        self
    }

    pub fn with_stop_condition(mut self, stop_condition: StopCondition) -> Self {
        self.stop_condition = Some(stop_condition);
        self
    }

    pub fn with_options(mut self, options: OptimizerOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_rng(mut self, rng: RandomNumberGenerator) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn build(self) -> Result<GeneticOptimizer<C>> {
        let challenge = self
            .challenge
            .ok_or_else(|| GeneticError::Configuration("Challenge not specified".to_string()))?;

        let stop_condition = self.stop_condition.ok_or_else(|| {
            GeneticError::Configuration("Stop condition not specified".to_string())
        })?;

        GeneticOptimizer::new(
            challenge,
            stop_condition,
            self.options.unwrap_or_default(),
            self.rng.unwrap_or_default(),
        )
    }
}

impl<C> Default for GeneticOptimizerBuilder<C>
where
    C: Challenge,
{
    fn default() -> Self {
        Self::new()
    }
}
