//! # Problem
//!
//! The objective optimized after a drift: the misclassification rate of the
//! ensemble a genotype decodes to, measured on a snapshot of the recent
//! examples.
//!
//! Only members that are active or hidden when the problem is built take part.
//! Genotype slot `i` stands for the `i`-th participating member of the pool;
//! the mapping is fixed at construction. Members are replayed on the whole
//! snapshot once, at construction, so scoring a genotype only combines the
//! recorded votes.

use tracing::warn;

use crate::ensemble::example::Example;
use crate::ensemble::learner::{accumulate_vote, arg_max, Archetype};
use crate::ensemble::member::{Member, MemberId};
use crate::ensemble::memory::{self, EnsembleMemberConfiguration, SlotProfile};
use crate::error::{GeneticError, OptionExt, Result};
use crate::evolution::Challenge;
use crate::genotype::{Genotype, WORST_COST};
use crate::rng::RandomNumberGenerator;

#[derive(Debug, Clone)]
pub struct Problem {
    slots: Vec<SlotProfile>,
    slot_to_member: Vec<usize>,
    member_ids: Vec<MemberId>,
    labels: Vec<usize>,
    /// `votes[example][slot]`, as returned by the member.
    votes: Vec<Vec<Vec<f64>>>,
    configurations: Vec<EnsembleMemberConfiguration>,
}

impl Problem {
    /// Snapshots the participating members' votes on `examples`.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::EmptyEnsemble` when no member is active or hidden.
    pub fn new(
        members: &[Member],
        examples: &[Example],
        configurations: Vec<EnsembleMemberConfiguration>,
    ) -> Result<Self> {
        let slot_to_member: Vec<usize> = members
            .iter()
            .enumerate()
            .filter(|(_, member)| member.participates())
            .map(|(index, _)| index)
            .collect();
        if slot_to_member.is_empty() {
            return Err(GeneticError::EmptyEnsemble);
        }

        let slots = slot_to_member
            .iter()
            .map(|&index| SlotProfile {
                archetype: members[index].archetype(),
                excluded: members[index].excluded().clone(),
            })
            .collect();

        let votes = examples
            .iter()
            .map(|example| {
                slot_to_member
                    .iter()
                    .map(|&index| members[index].distribution(example))
                    .collect()
            })
            .collect();

        Ok(Self {
            slots,
            slot_to_member,
            member_ids: members.iter().map(Member::id).collect(),
            labels: examples.iter().map(Example::class).collect(),
            votes,
            configurations,
        })
    }

    /// Number of genotype slots.
    pub fn size_encode(&self) -> usize {
        self.slot_to_member.len()
    }

    /// Number of members in the pool the problem was built from.
    pub fn pool_size(&self) -> usize {
        self.member_ids.len()
    }

    /// Pool index of the member behind a slot.
    pub fn member_index(&self, slot: usize) -> usize {
        self.slot_to_member[slot]
    }

    /// Identity of every pool member when the problem was built.
    pub fn member_ids(&self) -> &[MemberId] {
        &self.member_ids
    }

    pub fn num_examples(&self) -> usize {
        self.labels.len()
    }

    pub fn slots(&self) -> &[SlotProfile] {
        &self.slots
    }

    /// Decodes a genotype into one weight per pool member. Members that did
    /// not take part, and inactive slots, get zero.
    pub fn weights(&self, genotype: &Genotype) -> Vec<f64> {
        let mut weights = vec![0.0; self.pool_size()];
        for (slot, &index) in self.slot_to_member.iter().enumerate().take(genotype.len()) {
            weights[index] = genotype.weight(slot);
        }
        weights
    }

    /// Encodes one weight per pool member back into a genotype.
    pub fn encode(&self, weights: &[f64]) -> Genotype {
        Genotype::from_values(
            self.slot_to_member
                .iter()
                .map(|&index| weights.get(index).copied().unwrap_or(0.0))
                .collect(),
        )
    }

    /// Sets the slot of pool member `member` to `weight`.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` if the member does not take part.
    pub fn set_weight(&self, genotype: &mut Genotype, member: usize, weight: f64) -> Result<()> {
        let slot = self
            .slot_to_member
            .iter()
            .position(|&index| index == member)
            .ok_or_else_genetic(|| {
                GeneticError::Configuration(format!(
                    "member {} does not take part in the optimization",
                    member
                ))
            })?;
        genotype.set_value(slot, weight);
        Ok(())
    }

    pub fn repair(&self, genotype: &mut Genotype) {
        genotype.repair();
    }

    /// Fraction of snapshot examples the decoded ensemble gets wrong.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::FitnessCalculation` for an empty snapshot or a
    /// genotype of the wrong size.
    pub fn misclassification_rate(&self, genotype: &Genotype) -> Result<f64> {
        if genotype.len() != self.size_encode() {
            return Err(GeneticError::FitnessCalculation(format!(
                "genotype has {} slots, expected {}",
                genotype.len(),
                self.size_encode()
            )));
        }
        if self.labels.is_empty() {
            return Err(GeneticError::FitnessCalculation(
                "no buffered example to evaluate on".to_string(),
            ));
        }

        let weights: Vec<f64> = (0..genotype.len()).map(|slot| genotype.weight(slot)).collect();
        let mut combined = Vec::new();
        let mut errors = 0usize;
        for (label, votes) in self.labels.iter().zip(self.votes.iter()) {
            combined.clear();
            for (distribution, weight) in votes.iter().zip(weights.iter()) {
                if *weight > 0.0 {
                    accumulate_vote(&mut combined, distribution, *weight);
                }
            }
            if arg_max(&combined) != *label {
                errors += 1;
            }
        }

        Ok(errors as f64 / self.labels.len() as f64)
    }
}

impl Challenge for Problem {
    fn size_encode(&self) -> usize {
        self.slot_to_member.len()
    }

    fn score(&self, genotype: &Genotype) -> f64 {
        match self.misclassification_rate(genotype) {
            Ok(cost) => cost,
            Err(e) => {
                warn!(error = %e, "evaluation failed, assigning the worst cost");
                WORST_COST
            }
        }
    }

    fn seed(&self, rng: &mut RandomNumberGenerator) -> Option<Genotype> {
        memory::pick(&self.configurations, rng).map(|configuration| configuration.configure(&self.slots))
    }

    fn describe(&self, genotype: &Genotype) -> String {
        let counts = Archetype::histogram(
            self.slots
                .iter()
                .enumerate()
                .filter(|(slot, _)| *slot < genotype.len() && genotype.is_active(*slot))
                .map(|(_, profile)| profile.archetype),
        );
        format!("({:.4}, {:?})", genotype.cost(), counts)
    }
}
