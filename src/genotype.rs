//! # Genotype
//!
//! A `Genotype` encodes one ensemble configuration as a vector of reals in
//! `[0, 1]`, one slot per member taking part in the optimization. A slot whose
//! value is above [`ACTIVATION_THRESHOLD`] activates its member with that value as
//! voting weight; any other value leaves the member out of the vote.
//!
//! ## Example
//!
//! ```rust
//! use driftga::genotype::Genotype;
//!
//! let mut genotype = Genotype::from_values(vec![0.9, 0.3, 0.6]);
//! genotype.repair();
//!
//! assert_eq!(genotype.values(), &[0.9, 0.0, 0.6]);
//! assert_eq!(genotype.activation_pattern(), vec![true, false, true]);
//! assert_eq!(genotype.weight(1), 0.0);
//! ```

use std::cmp::Ordering;

use crate::rng::RandomNumberGenerator;

/// Slot values strictly above this threshold mean "active".
pub const ACTIVATION_THRESHOLD: f64 = 0.5;

/// Cost assigned to genotypes that were not, or could not be, evaluated.
pub const WORST_COST: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Genotype {
    encode: Vec<f64>,
    cost: f64,
    evaluated: bool,
}

impl Genotype {
    /// Creates an all-inactive genotype with `size` slots.
    pub fn new(size: usize) -> Self {
        Self::from_values(vec![0.0; size])
    }

    pub fn from_values(encode: Vec<f64>) -> Self {
        Self {
            encode,
            cost: WORST_COST,
            evaluated: false,
        }
    }

    /// Creates a genotype with independent uniform values per slot.
    pub fn random(size: usize, rng: &mut RandomNumberGenerator) -> Self {
        Self::from_values(rng.fetch_uniform(0.0, 1.0, size).into())
    }

    pub fn len(&self) -> usize {
        self.encode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encode.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.encode
    }

    pub fn value(&self, slot: usize) -> f64 {
        self.encode[slot]
    }

    /// Overwrites a slot. The cached cost no longer describes the genotype, so
    /// the genotype goes back to unevaluated.
    pub fn set_value(&mut self, slot: usize, value: f64) {
        self.encode[slot] = value;
        self.invalidate();
    }

    pub fn is_active(&self, slot: usize) -> bool {
        self.encode[slot] > ACTIVATION_THRESHOLD
    }

    /// The voting weight a slot decodes to: its value when active, else zero.
    pub fn weight(&self, slot: usize) -> f64 {
        if self.is_active(slot) {
            self.encode[slot]
        } else {
            0.0
        }
    }

    pub fn activation_pattern(&self) -> Vec<bool> {
        (0..self.encode.len()).map(|slot| self.is_active(slot)).collect()
    }

    /// Forces every inactive slot to exactly zero so that genotypes decoding to
    /// the same configuration share one representation.
    pub fn repair(&mut self) {
        for value in self.encode.iter_mut() {
            if value.is_nan() || *value <= ACTIVATION_THRESHOLD {
                *value = 0.0;
            }
        }
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Stores the objective value and marks the genotype as evaluated.
    pub fn set_cost(&mut self, cost: f64) {
        self.cost = cost;
        self.evaluated = true;
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    /// Drops the cached objective value.
    pub fn invalidate(&mut self) {
        self.cost = WORST_COST;
        self.evaluated = false;
    }

    /// Orders evaluated genotypes before unevaluated ones, then by ascending cost.
    /// NaN costs sort last among evaluated genotypes.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.evaluated, other.evaluated) {
            (true, true) => self.cost.partial_cmp(&other.cost).unwrap_or_else(|| {
                if self.cost.is_nan() && other.cost.is_nan() {
                    Ordering::Equal
                } else if self.cost.is_nan() {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        }
    }

    /// Bitwise equality of the encoded values.
    pub fn equals_encode(&self, other: &Self) -> bool {
        self.encode.len() == other.encode.len()
            && self
                .encode
                .iter()
                .zip(other.encode.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    /// Per-locus uniform crossover. Each slot goes from `self` to the first
    /// offspring and from `other` to the second with probability `p_locus`, and
    /// is swapped otherwise.
    pub fn crossover_uniform(
        &self,
        other: &Self,
        p_locus: f64,
        rng: &mut RandomNumberGenerator,
    ) -> (Self, Self) {
        let mut first = Vec::with_capacity(self.encode.len());
        let mut second = Vec::with_capacity(self.encode.len());
        for (a, b) in self.encode.iter().zip(other.encode.iter()) {
            if rng.next_f64() < p_locus {
                first.push(*a);
                second.push(*b);
            } else {
                first.push(*b);
                second.push(*a);
            }
        }
        (Self::from_values(first), Self::from_values(second))
    }

    /// Adds standard Gaussian noise to a Poisson(`lambda`) number of randomly
    /// chosen slots. Values leaving `[0, 1]` wrap around by whole units.
    pub fn mutate(&mut self, lambda: f64, rng: &mut RandomNumberGenerator) {
        if self.encode.is_empty() {
            return;
        }
        let count = rng.poisson(lambda);
        for _ in 0..count {
            let slot = rng.gen_index(self.encode.len());
            self.encode[slot] = wrap_unit(self.encode[slot] + rng.gaussian());
        }
        if count > 0 {
            self.invalidate();
        }
    }
}

fn wrap_unit(mut value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    while value < 0.0 {
        value += 1.0;
    }
    while value > 1.0 {
        value -= 1.0;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_is_idempotent() {
        let mut rng = RandomNumberGenerator::from_seed(17);
        for _ in 0..200 {
            let mut genotype = Genotype::random(8, &mut rng);
            genotype.repair();
            let once = genotype.clone();
            genotype.repair();
            assert!(genotype.equals_encode(&once));
        }
    }

    #[test]
    fn test_repair_zeroes_threshold_value() {
        let mut genotype = Genotype::from_values(vec![0.5, 0.50001, 0.0]);
        genotype.repair();
        assert_eq!(genotype.values(), &[0.0, 0.50001, 0.0]);
    }

    #[test]
    fn test_set_value_invalidates() {
        let mut genotype = Genotype::new(2);
        genotype.set_cost(0.2);
        assert!(genotype.is_evaluated());

        genotype.set_value(0, 0.7);
        assert!(!genotype.is_evaluated());
        assert_eq!(genotype.cost(), WORST_COST);
    }

    #[test]
    fn test_compare_puts_unevaluated_last() {
        let mut a = Genotype::new(1);
        let b = Genotype::new(1);
        a.set_cost(0.9);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);

        let mut c = Genotype::new(1);
        c.set_cost(0.1);
        assert_eq!(c.compare(&a), Ordering::Less);
    }

    #[test]
    fn test_crossover_preserves_loci() {
        let mut rng = RandomNumberGenerator::from_seed(1);
        let a = Genotype::from_values(vec![0.1, 0.2, 0.3, 0.4]);
        let b = Genotype::from_values(vec![0.9, 0.8, 0.7, 0.6]);
        let (x, y) = a.crossover_uniform(&b, 0.5, &mut rng);

        for slot in 0..4 {
            let pair = (x.value(slot), y.value(slot));
            assert!(
                pair == (a.value(slot), b.value(slot)) || pair == (b.value(slot), a.value(slot))
            );
        }
    }

    #[test]
    fn test_mutation_stays_in_unit_interval() {
        let mut rng = RandomNumberGenerator::from_seed(99);
        let mut genotype = Genotype::random(5, &mut rng);
        for _ in 0..500 {
            genotype.mutate(3.0, &mut rng);
            assert!(genotype.values().iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_wrap_unit() {
        assert!((wrap_unit(-0.25) - 0.75).abs() < 1e-12);
        assert!((wrap_unit(1.25) - 0.25).abs() < 1e-12);
        assert!((wrap_unit(-2.5) - 0.5).abs() < 1e-12);
        assert_eq!(wrap_unit(1.0), 1.0);
    }
}
