//! Alias tables for O(1) categorical draws.
//!
//! Construction follows the Walker/Vose presentation: scale every probability by `k`,
//! split indices into "small" (< 1) and "large" (>= 1) stacks, and pair each small slot
//! with a large donor until one stack runs dry.
//!
//! References:
//! - Walker (1974): An efficient method for generating discrete random variables with general distributions.
//! - Vose (1991): A linear algorithm for generating random numbers with a given distribution.

use crate::{Error, Result};
use rand::Rng;

/// A discrete distribution over `0..len()` compiled for constant-time sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasTable {
    /// Acceptance threshold per slot, in `[0, 1]`.
    prob: Vec<f64>,
    /// Donor index used when the acceptance test fails.
    alias: Vec<u32>,
}

impl AliasTable {
    /// Build a table from non-negative weights (they need not sum to 1).
    ///
    /// Fails with [`Error::DegenerateDistribution`] when `weights` is empty or has no
    /// positive entry, and with [`Error::InvalidWeight`] on a negative or non-finite weight.
    pub fn new(weights: &[f64]) -> Result<Self> {
        let mut sum = 0.0;
        for (index, &weight) in weights.iter().enumerate() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidWeight { index, weight });
            }
            sum += weight;
        }
        if !(sum > 0.0) {
            return Err(Error::DegenerateDistribution);
        }

        let k = weights.len();
        let scale = k as f64 / sum;
        let mut prob: Vec<f64> = weights.iter().map(|&w| w * scale).collect();
        let mut alias: Vec<u32> = (0..k as u32).collect();

        let mut smaller: Vec<usize> = Vec::with_capacity(k);
        let mut larger: Vec<usize> = Vec::with_capacity(k);
        for (i, &p) in prob.iter().enumerate() {
            if p < 1.0 {
                smaller.push(i);
            } else {
                larger.push(i);
            }
        }

        while let (Some(small), Some(large)) = (smaller.pop(), larger.pop()) {
            alias[small] = large as u32;
            prob[large] = (prob[large] + prob[small]) - 1.0;
            if prob[large] < 1.0 {
                smaller.push(large);
            } else {
                larger.push(large);
            }
        }

        // Whatever is left over is 1 up to rounding error.
        for i in smaller.into_iter().chain(larger) {
            prob[i] = 1.0;
        }

        Ok(Self { prob, alias })
    }

    /// Number of outcomes.
    pub fn len(&self) -> usize {
        self.prob.len()
    }

    /// Always `false`: construction rejects empty weight vectors.
    pub fn is_empty(&self) -> bool {
        self.prob.is_empty()
    }

    /// Draw an index with probability proportional to its input weight.
    ///
    /// Consumes one uniform slot draw, plus one acceptance draw unless the slot is full.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let slot = rng.random_range(0..self.prob.len());
        let threshold = self.prob[slot];
        if threshold >= 1.0 || rng.random::<f64>() < threshold {
            slot
        } else {
            self.alias[slot] as usize
        }
    }

    /// The exact probability this table assigns to `index`.
    ///
    /// O(k); meant for diagnostics and tests, not for the sampling path.
    pub fn probability(&self, index: usize) -> f64 {
        let k = self.prob.len();
        if index >= k {
            return 0.0;
        }
        let donated: f64 = self
            .alias
            .iter()
            .zip(&self.prob)
            .enumerate()
            .filter(|&(slot, (&a, &p))| slot != index && a as usize == index && p < 1.0)
            .map(|(_, (_, &p))| 1.0 - p)
            .sum();
        (self.prob[index] + donated) / k as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn assert_close(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "expected |{a} - {b}| <= {eps}");
    }

    #[test]
    fn rejects_empty_and_all_zero_weights() {
        assert!(matches!(AliasTable::new(&[]), Err(Error::DegenerateDistribution)));
        assert!(matches!(
            AliasTable::new(&[0.0, 0.0]),
            Err(Error::DegenerateDistribution)
        ));
    }

    #[test]
    fn rejects_negative_and_nan_weights() {
        assert!(matches!(
            AliasTable::new(&[1.0, -0.5]),
            Err(Error::InvalidWeight { index: 1, .. })
        ));
        assert!(matches!(
            AliasTable::new(&[f64::NAN]),
            Err(Error::InvalidWeight { index: 0, .. })
        ));
    }

    #[test]
    fn single_outcome_always_returned() {
        let table = AliasTable::new(&[3.5]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..100 {
            assert_eq!(table.sample(&mut rng), 0);
        }
        assert_close(table.probability(0), 1.0, 1e-12);
    }

    #[test]
    fn implied_probabilities_match_normalized_weights() {
        // Line graph 0 -- 1 -- 2 at cur=1 from prev=0 with p=0.5, q=2: [1/p, 1/q] = [2.0, 0.5].
        let table = AliasTable::new(&[2.0, 0.5]).unwrap();
        assert_close(table.probability(0), 0.8, 1e-12);
        assert_close(table.probability(1), 0.2, 1e-12);

        let weights = [0.0, 1.0, 4.0, 2.5, 0.5];
        let total: f64 = weights.iter().sum();
        let table = AliasTable::new(&weights).unwrap();
        for (i, &w) in weights.iter().enumerate() {
            assert_close(table.probability(i), w / total, 1e-12);
        }
    }

    #[test]
    fn zero_weight_outcome_is_never_drawn() {
        let table = AliasTable::new(&[0.0, 1.0, 0.0, 1.0]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..10_000 {
            let i = table.sample(&mut rng);
            assert!(i == 1 || i == 3, "drew zero-weight index {i}");
        }
    }

    #[test]
    fn empirical_frequencies_within_one_percent() {
        let weights = [0.1, 0.2, 0.7];
        let table = AliasTable::new(&weights).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let trials = 100_000usize;
        let mut counts = [0usize; 3];
        for _ in 0..trials {
            counts[table.sample(&mut rng)] += 1;
        }
        for (i, &w) in weights.iter().enumerate() {
            let freq = counts[i] as f64 / trials as f64;
            assert_close(freq, w, 0.01);
        }
    }
}
