use rand::rngs::StdRng;
use rand::SeedableRng;

/// Uniform selection of distinct indices without replacement.
///
/// Implementations must return exactly `min(k, n)` distinct indices in
/// `[0, n)`. The downsampler draws all of its randomness through this
/// trait, so a seeded sampler makes downsampling reproducible.
pub trait IndexSampler {
    /// Draw `k` distinct indices from `0..n`.
    fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize>;
}

impl<S: IndexSampler + ?Sized> IndexSampler for &mut S {
    fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        (**self).sample_indices(n, k)
    }
}

impl<S: IndexSampler + ?Sized> IndexSampler for Box<S> {
    fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        (**self).sample_indices(n, k)
    }
}

/// Default sampler backed by a seedable `StdRng`.
#[derive(Debug, Clone)]
pub struct RandomIndexSampler {
    rng: StdRng,
}

impl RandomIndexSampler {
    /// Deterministic sampler for a fixed seed.
    pub fn from_seed_u64(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Sampler seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl IndexSampler for RandomIndexSampler {
    fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        rand::seq::index::sample(&mut self.rng, n, k.min(n)).into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn samples_are_distinct_and_in_range() {
        let mut sampler = RandomIndexSampler::from_seed_u64(7);
        for (n, k) in [(10, 3), (10, 10), (1, 1), (5, 0), (3, 8)] {
            let picks = sampler.sample_indices(n, k);
            assert_eq!(picks.len(), k.min(n));
            assert!(picks.iter().all(|&idx| idx < n));
            let unique: HashSet<_> = picks.iter().copied().collect();
            assert_eq!(unique.len(), picks.len());
        }
    }

    #[test]
    fn same_seed_same_draws() {
        let mut a = RandomIndexSampler::from_seed_u64(42);
        let mut b = RandomIndexSampler::from_seed_u64(42);
        for _ in 0..5 {
            assert_eq!(a.sample_indices(100, 12), b.sample_indices(100, 12));
        }
    }
}
