use std::fmt::{self, Debug};

use crate::ensemble::example::Example;

/// The family a base learner belongs to. Configuration memory matches members
/// by this tag.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Archetype {
    DecisionTree,
    Bayesian,
    Linear,
    Majority,
}

impl Archetype {
    pub const ALL: [Archetype; 4] = [
        Archetype::DecisionTree,
        Archetype::Bayesian,
        Archetype::Linear,
        Archetype::Majority,
    ];

    /// Position of the tag in [`Archetype::ALL`].
    pub fn index(self) -> usize {
        match self {
            Archetype::DecisionTree => 0,
            Archetype::Bayesian => 1,
            Archetype::Linear => 2,
            Archetype::Majority => 3,
        }
    }

    /// Counts occurrences of every archetype, in [`Archetype::ALL`] order.
    pub fn histogram(archetypes: impl IntoIterator<Item = Archetype>) -> [usize; 4] {
        let mut counts = [0; 4];
        for archetype in archetypes {
            counts[archetype.index()] += 1;
        }
        counts
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Archetype::DecisionTree => 'D',
            Archetype::Bayesian => 'B',
            Archetype::Linear => 'L',
            Archetype::Majority => 'M',
        };
        write!(f, "{}", tag)
    }
}

/// An incrementally trained classifier.
///
/// Learners size themselves from the examples they see, so a learner can be
/// fed projected examples with fewer attributes than the stream schema.
pub trait Learner: Debug + Send + Sync {
    fn archetype(&self) -> Archetype;

    /// Trains on one example, honoring its sample weight.
    fn train(&mut self, example: &Example);

    /// Unnormalized class scores, indexed by class. May be shorter than the
    /// number of classes, or empty before any training.
    fn vote_distribution(&self, example: &Example) -> Vec<f64>;

    fn boxed_clone(&self) -> Box<dyn Learner>;

    /// Forgets everything learned so far.
    fn reset(&mut self);
}

impl Clone for Box<dyn Learner> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Index of the highest score, ties going to the lowest index. Empty or all-NaN
/// scores predict class 0.
pub fn arg_max(scores: &[f64]) -> usize {
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (index, score) in scores.iter().enumerate() {
        if *score > best_score {
            best = index;
            best_score = *score;
        }
    }
    best
}

/// Adds `weight` times the normalized distribution into `combined`. Zero-sum
/// distributions contribute nothing.
pub fn accumulate_vote(combined: &mut Vec<f64>, distribution: &[f64], weight: f64) {
    let total: f64 = distribution.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return;
    }
    if combined.len() < distribution.len() {
        combined.resize(distribution.len(), 0.0);
    }
    for (slot, vote) in combined.iter_mut().zip(distribution.iter()) {
        *slot += vote / total * weight;
    }
}
