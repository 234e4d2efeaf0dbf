//! # Caching Module
//!
//! Memoization of costs for challenges that are expensive to score. Repair maps
//! every "barely active" slot to exactly zero, so distinct genotypes frequently
//! decode to the same configuration and can share one cached cost.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::evolution::Challenge;
use crate::genotype::Genotype;
use crate::rng::RandomNumberGenerator;

/// A trait for values that can be used as cache keys.
pub trait CacheKey {
    /// The type of the cache key.
    type Key: Eq + Hash + Clone + Debug + Send + Sync;

    /// Values expected to receive the same cost must produce the same key.
    fn cache_key(&self) -> Self::Key;
}

impl CacheKey for Genotype {
    type Key = Vec<u64>;

    fn cache_key(&self) -> Self::Key {
        self.values().iter().map(|value| value.to_bits()).collect()
    }
}

/// A wrapper around a challenge that caches cost evaluations.
///
/// Clones share the same cache.
#[derive(Debug, Clone)]
pub struct CachedChallenge<C>
where
    C: Challenge,
{
    challenge: C,
    cache: Arc<Mutex<HashMap<Vec<u64>, f64>>>,
}

impl<C> CachedChallenge<C>
where
    C: Challenge,
{
    pub fn new(challenge: C) -> Self {
        Self {
            challenge,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns a reference to the wrapped challenge.
    pub fn inner(&self) -> &C {
        &self.challenge
    }

    /// Returns the number of cached cost evaluations.
    pub fn cache_size(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

impl<C> Challenge for CachedChallenge<C>
where
    C: Challenge,
{
    fn size_encode(&self) -> usize {
        self.challenge.size_encode()
    }

    fn score(&self, genotype: &Genotype) -> f64 {
        let key = genotype.cache_key();

        if let Some(score) = self.cache.lock().get(&key) {
            return *score;
        }

        // Scored outside the lock so parallel evaluations do not serialize.
        let score = self.challenge.score(genotype);
        self.cache.lock().insert(key, score);

        score
    }

    fn seed(&self, rng: &mut RandomNumberGenerator) -> Option<Genotype> {
        self.challenge.seed(rng)
    }

    fn describe(&self, genotype: &Genotype) -> String {
        self.challenge.describe(genotype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    struct CountingChallenge {
        evaluations: Arc<AtomicUsize>,
    }

    impl Challenge for CountingChallenge {
        fn size_encode(&self) -> usize {
            2
        }

        fn score(&self, genotype: &Genotype) -> f64 {
            self.evaluations.fetch_add(1, Ordering::SeqCst);
            genotype.values().iter().sum::<f64>() / 2.0
        }
    }

    #[test]
    fn test_cached_challenge() {
        let evaluations = Arc::new(AtomicUsize::new(0));
        let cached = CachedChallenge::new(CountingChallenge {
            evaluations: Arc::clone(&evaluations),
        });

        let first = Genotype::from_values(vec![0.7, 0.0]);
        let score = cached.score(&first);
        assert_eq!(evaluations.load(Ordering::SeqCst), 1);

        let same = Genotype::from_values(vec![0.7, 0.0]);
        assert_eq!(cached.score(&same), score);
        assert_eq!(evaluations.load(Ordering::SeqCst), 1);

        cached.score(&Genotype::from_values(vec![0.0, 0.9]));
        assert_eq!(evaluations.load(Ordering::SeqCst), 2);
        assert_eq!(cached.cache_size(), 2);

        cached.clear_cache();
        assert_eq!(cached.cache_size(), 0);
    }

    #[test]
    fn test_repaired_genotypes_share_a_key() {
        let mut a = Genotype::from_values(vec![0.8, 0.2]);
        let mut b = Genotype::from_values(vec![0.8, 0.45]);
        assert_ne!(a.cache_key(), b.cache_key());

        a.repair();
        b.repair();
        assert_eq!(a.cache_key(), b.cache_key());
    }
}
