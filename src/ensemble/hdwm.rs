//! # DynamicWeightedMajority
//!
//! The heterogeneous dynamic weighted majority baseline: a growing pool of
//! experts drawn from the learner templates, without any genetic search. Every
//! `period` examples the experts that were wrong are punished, weights are
//! rescaled so the strongest expert has weight one, experts below `theta` are
//! dropped and, if the ensemble itself was wrong, a fresh expert joins. When the
//! pool is full the weakest expert makes room for the newcomer.
//!
//! ## Example
//!
//! ```rust
//! use driftga::ensemble::{DynamicWeightedMajority, Example, HdwmConfig, Learner, NaiveBayes, Schema};
//!
//! let templates: Vec<Box<dyn Learner>> = vec![Box::new(NaiveBayes::new())];
//! let config = HdwmConfig::default().with_period(10).with_max_experts(5);
//! let mut dwm = DynamicWeightedMajority::new(config, templates, Schema::new(1, 2).unwrap()).unwrap();
//!
//! for i in 0..200 {
//!     let class = i % 2;
//!     dwm.train(&Example::new(vec![class as f64], class)).unwrap();
//! }
//! assert!(dwm.len() <= 5);
//! assert_eq!(dwm.predict(&Example::new(vec![1.0], 1)), 1);
//! ```

use tracing::debug;

use crate::ensemble::example::{Example, Schema};
use crate::ensemble::learner::{arg_max, Learner};
use crate::ensemble::member::{Member, MemberId};
use crate::error::{GeneticError, Result};
use crate::rng::RandomNumberGenerator;

/// Parameters of a [`DynamicWeightedMajority`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct HdwmConfig {
    period: u64,
    beta: f64,
    theta: f64,
    max_experts: usize,
    seed: u64,
}

impl HdwmConfig {
    /// Examples between two weight updates.
    pub fn with_period(mut self, value: u64) -> Self {
        self.period = value;
        self
    }

    /// Factor applied to the weight of a wrong expert.
    pub fn with_beta(mut self, value: f64) -> Self {
        self.beta = value;
        self
    }

    /// Rescaled weight under which an expert is dropped.
    pub fn with_theta(mut self, value: f64) -> Self {
        self.theta = value;
        self
    }

    pub fn with_max_experts(mut self, value: usize) -> Self {
        self.max_experts = value;
        self
    }

    pub fn with_seed(mut self, value: u64) -> Self {
        self.seed = value;
        self
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn max_experts(&self) -> usize {
        self.max_experts
    }

    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(GeneticError::Configuration(
                "Update period must be at least 1".to_string(),
            ));
        }
        for (name, value) in [("beta", self.beta), ("theta", self.theta)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GeneticError::Configuration(format!(
                    "{} must lie in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.max_experts < 2 {
            return Err(GeneticError::Configuration(format!(
                "At least two experts must be allowed, got {}",
                self.max_experts
            )));
        }
        Ok(())
    }
}

impl Default for HdwmConfig {
    fn default() -> Self {
        Self {
            period: 50,
            beta: 0.5,
            theta: 0.01,
            max_experts: usize::MAX,
            seed: 1,
        }
    }
}

#[derive(Debug)]
pub struct DynamicWeightedMajority {
    config: HdwmConfig,
    schema: Schema,
    templates: Vec<Box<dyn Learner>>,
    experts: Vec<Member>,
    rng: RandomNumberGenerator,
    instances_seen: u64,
    next_member_id: u64,
}

impl DynamicWeightedMajority {
    /// Starts with a single expert of weight one.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` for an invalid configuration or an
    /// empty template list.
    pub fn new(config: HdwmConfig, templates: Vec<Box<dyn Learner>>, schema: Schema) -> Result<Self> {
        config.validate()?;
        if templates.is_empty() {
            return Err(GeneticError::Configuration(
                "At least one learner template is required".to_string(),
            ));
        }

        let mut dwm = Self {
            rng: RandomNumberGenerator::from_seed(config.seed),
            config,
            schema,
            templates,
            experts: Vec::new(),
            instances_seen: 0,
            next_member_id: 0,
        };
        dwm.reset();
        Ok(dwm)
    }

    fn create_expert(&mut self) -> Member {
        let template_index = self.rng.gen_index(self.templates.len());
        let id = MemberId(self.next_member_id);
        self.next_member_id += 1;
        let mut expert = Member::new(
            id,
            self.templates[template_index].boxed_clone(),
            template_index,
            Default::default(),
        );
        expert.set_role(true, false);
        expert
    }

    /// Processes one labeled example.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Schema` when the example does not fit the schema.
    pub fn train(&mut self, example: &Example) -> Result<()> {
        self.schema.check(example)?;
        self.instances_seen += 1;
        let update = self.instances_seen % self.config.period == 0;

        let mut combined = vec![0.0; self.schema.num_classes()];
        for expert in self.experts.iter_mut() {
            let predicted = arg_max(&expert.distribution(example));
            if update && predicted != example.class() {
                expert.punish(self.config.beta, 1.0);
            }
            if let Some(slot) = combined.get_mut(predicted) {
                *slot += expert.weight();
            }
        }

        if update {
            self.rescale();
            let before = self.experts.len();
            let theta = self.config.theta;
            self.experts.retain(|expert| expert.weight() >= theta);
            if self.experts.len() < before {
                debug!(
                    removed = before - self.experts.len(),
                    instances = self.instances_seen,
                    "weak experts removed"
                );
            }

            if arg_max(&combined) != example.class() {
                if self.experts.len() >= self.config.max_experts {
                    self.remove_weakest();
                }
                let expert = self.create_expert();
                debug!(expert = %expert, instances = self.instances_seen, "expert added");
                self.experts.push(expert);
            }
        }

        for expert in self.experts.iter_mut() {
            expert.train(example);
        }
        Ok(())
    }

    /// Divides every weight by the largest one.
    fn rescale(&mut self) {
        let max = self.experts.iter().map(Member::weight).fold(0.0, f64::max);
        if max > 0.0 {
            for expert in self.experts.iter_mut() {
                expert.set_weight(expert.weight() / max);
            }
        }
    }

    fn remove_weakest(&mut self) {
        let weakest = self
            .experts
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.weight().total_cmp(&b.weight()))
            .map(|(index, _)| index);
        if let Some(index) = weakest {
            self.experts.remove(index);
        }
    }

    /// Each expert adds its weight to the class it predicts. The scores are
    /// normalized to sum to one unless every score is zero.
    pub fn votes(&self, example: &Example) -> Vec<f64> {
        let mut combined = vec![0.0; self.schema.num_classes()];
        for expert in &self.experts {
            if let Some(slot) = combined.get_mut(arg_max(&expert.distribution(example))) {
                *slot += expert.weight();
            }
        }
        let total: f64 = combined.iter().sum();
        if total > 0.0 {
            for score in combined.iter_mut() {
                *score /= total;
            }
        }
        combined
    }

    pub fn predict(&self, example: &Example) -> usize {
        arg_max(&self.votes(example))
    }

    /// Drops every expert and starts over from a single fresh one.
    pub fn reset(&mut self) {
        self.rng = RandomNumberGenerator::from_seed(self.config.seed);
        self.instances_seen = 0;
        self.experts.clear();
        let expert = self.create_expert();
        self.experts.push(expert);
    }

    pub fn config(&self) -> &HdwmConfig {
        &self.config
    }

    pub fn experts(&self) -> &[Member] {
        &self.experts
    }

    pub fn weights(&self) -> Vec<f64> {
        self.experts.iter().map(Member::weight).collect()
    }

    pub fn len(&self) -> usize {
        self.experts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experts.is_empty()
    }

    pub fn instances_seen(&self) -> u64 {
        self.instances_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::learner::Archetype;

    /// Predicts `class` no matter what.
    #[derive(Debug, Clone)]
    struct Constant {
        class: usize,
    }

    impl Learner for Constant {
        fn archetype(&self) -> Archetype {
            Archetype::Majority
        }

        fn train(&mut self, _example: &Example) {}

        fn vote_distribution(&self, _example: &Example) -> Vec<f64> {
            let mut votes = vec![0.0; 2];
            votes[self.class] = 1.0;
            votes
        }

        fn boxed_clone(&self) -> Box<dyn Learner> {
            Box::new(self.clone())
        }

        fn reset(&mut self) {}
    }

    fn dwm(config: HdwmConfig, classes: &[usize]) -> DynamicWeightedMajority {
        let templates: Vec<Box<dyn Learner>> = classes
            .iter()
            .map(|&class| Box::new(Constant { class }) as Box<dyn Learner>)
            .collect();
        DynamicWeightedMajority::new(config, templates, Schema::new(1, 2).unwrap()).unwrap()
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let schema = Schema::new(1, 2).unwrap();
        for config in [
            HdwmConfig::default().with_period(0),
            HdwmConfig::default().with_beta(1.5),
            HdwmConfig::default().with_theta(-0.1),
            HdwmConfig::default().with_max_experts(1),
        ] {
            let templates: Vec<Box<dyn Learner>> = vec![Box::new(Constant { class: 0 })];
            assert!(DynamicWeightedMajority::new(config, templates, schema).is_err());
        }
        assert!(DynamicWeightedMajority::new(HdwmConfig::default(), Vec::new(), schema).is_err());
    }

    #[test]
    fn test_starts_with_one_expert() {
        let dwm = dwm(HdwmConfig::default(), &[0]);

        assert_eq!(dwm.len(), 1);
        assert_eq!(dwm.weights(), vec![1.0]);
        assert_eq!(dwm.votes(&Example::new(vec![0.0], 1)), vec![1.0, 0.0]);
    }

    #[test]
    fn test_no_update_between_periods() {
        let mut dwm = dwm(HdwmConfig::default().with_period(3), &[0]);

        dwm.train(&Example::new(vec![0.0], 1)).unwrap();
        dwm.train(&Example::new(vec![0.0], 1)).unwrap();

        assert_eq!(dwm.weights(), vec![1.0]);
        assert_eq!(dwm.len(), 1);
    }

    #[test]
    fn test_wrong_ensemble_adds_an_expert_on_update() {
        let config = HdwmConfig::default().with_period(1).with_beta(0.5).with_theta(0.01);
        let mut dwm = dwm(config, &[0]);

        dwm.train(&Example::new(vec![0.0], 1)).unwrap();

        // Punished to 0.5, rescaled back to one, then joined by a newcomer.
        assert_eq!(dwm.weights(), vec![1.0, 1.0]);
        assert_eq!(dwm.instances_seen(), 1);
    }

    #[test]
    fn test_experts_below_theta_removed() {
        let config = HdwmConfig::default().with_period(1).with_beta(0.1).with_theta(0.5);
        let mut dwm = dwm(config, &[0, 1]);
        dwm.experts = vec![
            Member::new(MemberId(90), Box::new(Constant { class: 0 }), 0, Default::default()),
            Member::new(MemberId(91), Box::new(Constant { class: 1 }), 1, Default::default()),
        ];

        dwm.train(&Example::new(vec![0.0], 1)).unwrap();

        // The wrong expert fell to 0.1 and was dropped; the ensemble was right.
        assert_eq!(dwm.len(), 1);
        assert_eq!(dwm.experts()[0].id(), MemberId(91));
        assert_eq!(dwm.weights(), vec![1.0]);
    }

    #[test]
    fn test_full_pool_drops_weakest_expert() {
        let config = HdwmConfig::default()
            .with_period(1)
            .with_beta(0.5)
            .with_theta(0.0)
            .with_max_experts(2);
        let mut dwm = dwm(config, &[0]);
        let first = dwm.experts()[0].id();

        for _ in 0..5 {
            dwm.train(&Example::new(vec![0.0], 1)).unwrap();
            assert!(dwm.len() <= 2);
        }

        assert_eq!(dwm.len(), 2);
        assert!(dwm.experts().iter().all(|expert| expert.id() != first));
    }

    #[test]
    fn test_reset() {
        let mut dwm = dwm(HdwmConfig::default().with_period(1), &[0]);
        for _ in 0..4 {
            dwm.train(&Example::new(vec![0.0], 1)).unwrap();
        }
        assert!(dwm.len() > 1);

        dwm.reset();

        assert_eq!(dwm.len(), 1);
        assert_eq!(dwm.instances_seen(), 0);
        assert!(dwm.train(&Example::new(vec![0.0, 1.0], 0)).is_err());
    }
}
