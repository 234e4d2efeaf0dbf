use crate::{genotype::Genotype, rng::RandomNumberGenerator};

/// The objective searched by the optimizer. Costs are minimized; a well-formed
/// challenge returns values in `[0, 1]` and never fails, degrading a genotype it
/// cannot score to the worst cost instead.
pub trait Challenge: Send + Sync {
    /// Number of slots in the genotypes this challenge scores.
    fn size_encode(&self) -> usize;

    fn score(&self, genotype: &Genotype) -> f64;

    /// Proposes a starting genotype built from prior knowledge, if any.
    fn seed(&self, _rng: &mut RandomNumberGenerator) -> Option<Genotype> {
        None
    }

    /// Short human readable rendering used in logs.
    fn describe(&self, genotype: &Genotype) -> String {
        format!("({:.4})", genotype.cost())
    }
}

impl<C: Challenge + ?Sized> Challenge for std::sync::Arc<C> {
    fn size_encode(&self) -> usize {
        (**self).size_encode()
    }

    fn score(&self, genotype: &Genotype) -> f64 {
        (**self).score(genotype)
    }

    fn seed(&self, rng: &mut RandomNumberGenerator) -> Option<Genotype> {
        (**self).seed(rng)
    }

    fn describe(&self, genotype: &Genotype) -> String {
        (**self).describe(genotype)
    }
}
