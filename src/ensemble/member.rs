use std::collections::BTreeSet;
use std::fmt;

use crate::ensemble::example::Example;
use crate::ensemble::learner::{arg_max, Archetype, Learner};
use crate::rng::RandomNumberGenerator;

/// Identity of a member within one controller. A replaced slot gets a new id.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub u64);

/// One slot of the ensemble: a learner, its voting weight and its role.
#[derive(Debug, Clone)]
pub struct Member {
    id: MemberId,
    learner: Box<dyn Learner>,
    archetype: Archetype,
    template_index: usize,
    excluded: BTreeSet<usize>,
    weight: f64,
    active: bool,
    hidden: bool,
    trained: f64,
    misses: f64,
}

impl Member {
    /// Wraps a freshly reset learner. New members have weight one and are
    /// neither active nor hidden.
    pub fn new(
        id: MemberId,
        mut learner: Box<dyn Learner>,
        template_index: usize,
        excluded: BTreeSet<usize>,
    ) -> Self {
        learner.reset();
        let archetype = learner.archetype();
        Self {
            id,
            learner,
            archetype,
            template_index,
            excluded,
            weight: 1.0,
            active: false,
            hidden: false,
            trained: 0.0,
            misses: 0.0,
        }
    }

    /// Draws the attributes a new member never sees. Each attribute is excluded
    /// with a probability drawn uniformly per member, and one attribute is
    /// always kept.
    pub fn draw_excluded(num_attributes: usize, rng: &mut RandomNumberGenerator) -> BTreeSet<usize> {
        let percent = rng.next_f64();
        let mut excluded: BTreeSet<usize> = (0..num_attributes)
            .filter(|_| rng.next_f64() < percent)
            .collect();
        if num_attributes > 0 && excluded.len() == num_attributes {
            excluded.remove(&rng.gen_index(num_attributes));
        }
        excluded
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Index of the template this member was cloned from.
    pub fn template_index(&self) -> usize {
        self.template_index
    }

    pub fn excluded(&self) -> &BTreeSet<usize> {
        &self.excluded
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Active and hidden members take part in optimization.
    pub fn participates(&self) -> bool {
        self.active || self.hidden
    }

    pub fn learner(&self) -> &dyn Learner {
        self.learner.as_ref()
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    pub fn set_role(&mut self, active: bool, hidden: bool) {
        self.active = active;
        self.hidden = hidden;
    }

    pub fn distribution(&self, example: &Example) -> Vec<f64> {
        self.learner.vote_distribution(&example.project(&self.excluded))
    }

    pub fn correctly_classifies(&self, example: &Example) -> bool {
        arg_max(&self.distribution(example)) == example.class()
    }

    /// Scores the member on the example before learning from it.
    pub fn train(&mut self, example: &Example) {
        let projected = example.project(&self.excluded);
        self.trained += 1.0;
        if arg_max(&self.learner.vote_distribution(&projected)) != example.class() {
            self.misses += 1.0;
        }
        self.learner.train(&projected);
    }

    /// Prequential accuracy, one before any training.
    pub fn accuracy(&self) -> f64 {
        if self.trained == 0.0 {
            1.0
        } else {
            (self.trained - self.misses) / self.trained
        }
    }

    /// Multiplicative decay after a mistake.
    pub fn punish(&mut self, beta: f64, sample_weight: f64) {
        self.weight *= beta * sample_weight;
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{:?},{:.6})",
            self.archetype, self.template_index, self.excluded, self.weight
        )
    }
}
