//! Bounded history of deployed ensemble configurations, used to seed the
//! initial population of later optimizations.

use std::collections::{BTreeSet, VecDeque};

use crate::ensemble::learner::Archetype;
use crate::ensemble::member::Member;
use crate::genotype::Genotype;
use crate::rng::RandomNumberGenerator;

/// What is remembered of one active member.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredMember {
    pub archetype: Archetype,
    pub template_index: usize,
    pub excluded: BTreeSet<usize>,
    pub weight: f64,
}

/// The archetype and attribute subset of one genotype slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotProfile {
    pub archetype: Archetype,
    pub excluded: BTreeSet<usize>,
}

/// Snapshot of the active members at some optimization event.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnsembleMemberConfiguration {
    members: Vec<ConfiguredMember>,
}

impl EnsembleMemberConfiguration {
    pub fn capture(members: &[Member]) -> Self {
        let members = members
            .iter()
            .filter(|member| member.is_active())
            .map(|member| ConfiguredMember {
                archetype: member.archetype(),
                template_index: member.template_index(),
                excluded: member.excluded().clone(),
                weight: member.weight(),
            })
            .collect();
        Self { members }
    }

    pub fn members(&self) -> &[ConfiguredMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Builds a genotype over `slots` approximating this configuration.
    ///
    /// Each remembered member claims the unused slot of the same archetype
    /// sharing the most excluded attributes, the first one on ties. Claimed
    /// slots are activated with a value growing with the remembered weight;
    /// every other slot stays inactive.
    pub fn configure(&self, slots: &[SlotProfile]) -> Genotype {
        let mut genotype = Genotype::new(slots.len());
        let mut used = vec![false; slots.len()];

        for member in &self.members {
            let mut chosen: Option<(usize, usize)> = None;
            for (slot, profile) in slots.iter().enumerate() {
                if used[slot] || profile.archetype != member.archetype {
                    continue;
                }
                let overlap = profile.excluded.intersection(&member.excluded).count();
                if chosen.map_or(true, |(_, best)| overlap > best) {
                    chosen = Some((slot, overlap));
                }
            }

            if let Some((slot, _)) = chosen {
                used[slot] = true;
                genotype.set_value(slot, seed_value(member.weight));
            }
        }

        genotype
    }
}

/// Maps a live weight in `[0, 1]` into the active half of the unit interval so
/// that a remembered member decodes as active.
fn seed_value(weight: f64) -> f64 {
    if weight > 0.0 {
        0.5 + 0.5 * weight.min(1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct ConfigurationMemory {
    configurations: VecDeque<EnsembleMemberConfiguration>,
    capacity: usize,
}

impl ConfigurationMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            configurations: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Remembers a configuration, forgetting the oldest one when full. Empty
    /// configurations carry nothing to seed from and are ignored.
    pub fn push(&mut self, configuration: EnsembleMemberConfiguration) {
        if self.capacity == 0 || configuration.is_empty() {
            return;
        }
        if self.configurations.len() == self.capacity {
            self.configurations.pop_front();
        }
        self.configurations.push_back(configuration);
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    pub fn clear(&mut self) {
        self.configurations.clear();
    }

    pub fn snapshot(&self) -> Vec<EnsembleMemberConfiguration> {
        self.configurations.iter().cloned().collect()
    }
}

/// Picks a configuration uniformly at random.
pub fn pick<'a>(
    configurations: &'a [EnsembleMemberConfiguration],
    rng: &mut RandomNumberGenerator,
) -> Option<&'a EnsembleMemberConfiguration> {
    if configurations.is_empty() {
        None
    } else {
        Some(&configurations[rng.gen_index(configurations.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(archetype: Archetype, excluded: &[usize], weight: f64) -> ConfiguredMember {
        ConfiguredMember {
            archetype,
            template_index: 0,
            excluded: excluded.iter().copied().collect(),
            weight,
        }
    }

    fn slot(archetype: Archetype, excluded: &[usize]) -> SlotProfile {
        SlotProfile {
            archetype,
            excluded: excluded.iter().copied().collect(),
        }
    }

    #[test]
    fn test_configure_matches_by_archetype_and_overlap() {
        let configuration = EnsembleMemberConfiguration {
            members: vec![
                configured(Archetype::Bayesian, &[1, 2], 0.4),
                configured(Archetype::Linear, &[], 1.0),
            ],
        };
        let slots = vec![
            slot(Archetype::Bayesian, &[0]),
            slot(Archetype::Linear, &[3]),
            slot(Archetype::Bayesian, &[2]),
            slot(Archetype::Majority, &[]),
        ];

        let genotype = configuration.configure(&slots);

        assert_eq!(genotype.activation_pattern(), vec![false, true, true, false]);
        assert!((genotype.value(2) - 0.7).abs() < 1e-12);
        assert_eq!(genotype.value(1), 1.0);
    }

    #[test]
    fn test_configure_uses_each_slot_once() {
        let configuration = EnsembleMemberConfiguration {
            members: vec![
                configured(Archetype::Majority, &[], 0.5),
                configured(Archetype::Majority, &[], 0.5),
                configured(Archetype::Majority, &[], 0.5),
            ],
        };
        let slots = vec![slot(Archetype::Majority, &[]), slot(Archetype::Majority, &[])];

        let genotype = configuration.configure(&slots);

        assert_eq!(genotype.activation_pattern(), vec![true, true]);
    }

    #[test]
    fn test_memory_is_bounded() {
        let mut memory = ConfigurationMemory::new(2);
        for weight in [0.1, 0.2, 0.3] {
            memory.push(EnsembleMemberConfiguration {
                members: vec![configured(Archetype::Linear, &[], weight)],
            });
        }
        memory.push(EnsembleMemberConfiguration::default());

        let weights: Vec<f64> = memory
            .snapshot()
            .iter()
            .map(|c| c.members()[0].weight)
            .collect();
        assert_eq!(weights, vec![0.2, 0.3]);
    }
}
