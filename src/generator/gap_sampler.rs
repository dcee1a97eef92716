//! Query gap sampling.
//!
//! The query region of length `L - 2K` is addressed in slots of two
//! positions, giving `space = (L - 2K) / 2` candidate offsets. Offset `o`
//! (0-based) is weighted by the power law
//!
//! ```text
//! p(i) = a * i^(a - 1) / Z,   i = o + 1,   Z = sum over i = 1..space
//! ```
//!
//! so `a = 1` is uniform and small `a` puts most of the mass on the first
//! few slots. Each row draws `K` distinct offsets without replacement.
//!
//! # Algorithm
//!
//! Weighted sampling without replacement uses Efraimidis–Spirakis keys:
//! every offset gets `key = ln(u) / w` with `u ~ U(0, 1]`, and the `K`
//! largest keys win. Sorting by descending key reproduces the order of the
//! equivalent sequential process (draw from the renormalised remaining
//! mass, remove, repeat).
//!
//! Weights are built from `(a - 1) * ln(i)` shifted by its maximum before
//! exponentiating, so large `a` cannot overflow. The `a` factor cancels in
//! the normalisation.

use crate::error::Result;
use crate::rng::{row_rng, Stage};
use ndarray::Array2;
use rand::Rng;
use rayon::prelude::*;

/// Normalised power-law weights over `i = 1..=space`.
///
/// ```
/// use mqar_dataset::generator::power_law_weights;
///
/// let p = power_law_weights(4, 1.0);
/// assert_eq!(p, vec![0.25; 4]);
/// ```
pub fn power_law_weights(space: usize, power_a: f64) -> Vec<f64> {
    let log_weights: Vec<f64> = (1..=space)
        .map(|i| (power_a - 1.0) * (i as f64).ln())
        .collect();
    let max = log_weights
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    // The largest term is exp(0) = 1, so the total is at least 1.
    let raw: Vec<f64> = log_weights.into_iter().map(|lw| (lw - max).exp()).collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Samples distinct query offsets per row from the power-law distribution.
#[derive(Debug, Clone)]
pub struct GapSampler {
    weights: Vec<f64>,
}

impl GapSampler {
    /// Create a sampler over `space` slots with shape parameter `power_a`.
    pub fn new(space: usize, power_a: f64) -> Self {
        Self {
            weights: power_law_weights(space, power_a),
        }
    }

    /// Number of candidate offsets.
    pub fn space(&self) -> usize {
        self.weights.len()
    }

    /// Normalised weight of each offset.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Draw `num_gaps` distinct offsets for each of `num_examples` rows.
    ///
    /// Offsets are in `0..space`, in draw order. `num_gaps <= space` is
    /// guaranteed by `4K <= L`.
    pub fn sample(&self, num_examples: usize, num_gaps: usize, seed: u64) -> Result<Array2<usize>> {
        debug_assert!(num_gaps <= self.space());

        let flat: Vec<usize> = (0..num_examples)
            .into_par_iter()
            .flat_map_iter(|row| self.sample_row(num_gaps, seed, row))
            .collect();

        Ok(Array2::from_shape_vec((num_examples, num_gaps), flat)?)
    }

    fn sample_row(&self, num_gaps: usize, seed: u64, row: usize) -> Vec<usize> {
        if num_gaps == 0 {
            return Vec::new();
        }

        let mut rng = row_rng(seed, Stage::Gaps, row);
        let mut keyed: Vec<(f64, usize)> = self
            .weights
            .iter()
            .enumerate()
            .map(|(offset, &w)| {
                // 1 - [0, 1) keeps u in (0, 1], so ln(u) is finite.
                let u: f64 = 1.0 - rng.gen::<f64>();
                // Offsets whose weight underflowed to zero are never preferred.
                let key = if w > 0.0 { u.ln() / w } else { f64::NEG_INFINITY };
                (key, offset)
            })
            .collect();

        if num_gaps < keyed.len() {
            keyed.select_nth_unstable_by(num_gaps - 1, |a, b| b.0.total_cmp(&a.0));
            keyed.truncate(num_gaps);
        }
        keyed.sort_unstable_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        keyed.into_iter().map(|(_, offset)| offset).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_weights_sum_to_one() {
        for &a in &[0.01, 0.1, 0.5, 1.0, 2.0] {
            let p = power_law_weights(100, a);
            let total: f64 = p.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "a = {a}: sum = {total}");
        }
    }

    #[test]
    fn test_weights_decrease_for_small_a() {
        let p = power_law_weights(50, 0.01);
        assert!(p.windows(2).all(|w| w[0] > w[1]));
        // Nearly 1/i: the first slot carries far more mass than the last.
        assert!(p[0] > 20.0 * p[49]);
    }

    #[test]
    fn test_weights_finite_for_large_a() {
        let p = power_law_weights(24, 300.0);
        assert!(p.iter().all(|w| w.is_finite()));
        assert!(p.windows(2).all(|w| w[0] <= w[1]));
        let total: f64 = p.iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "sum = {total}");
        assert!(p[23] > 0.999, "last slot = {}", p[23]);
    }

    #[test]
    fn test_large_a_picks_last_slots() {
        // At a = 300 the mass is packed into the highest offsets.
        let sampler = GapSampler::new(24, 300.0);
        let gaps = sampler.sample(500, 8, 1).unwrap();
        for row in gaps.rows() {
            let mut sorted = row.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, (16..24).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_uniform_for_a_equal_one() {
        let p = power_law_weights(10, 1.0);
        for w in p {
            assert!((w - 0.1).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_space() {
        assert!(power_law_weights(0, 0.5).is_empty());
        let sampler = GapSampler::new(0, 0.5);
        let gaps = sampler.sample(3, 0, 1).unwrap();
        assert_eq!(gaps.dim(), (3, 0));
    }

    #[test]
    fn test_rows_distinct_and_in_range() {
        let sampler = GapSampler::new(24, 0.01);
        let gaps = sampler.sample(500, 8, 42).unwrap();
        assert_eq!(gaps.dim(), (500, 8));

        for row in gaps.rows() {
            let unique: HashSet<_> = row.iter().collect();
            assert_eq!(unique.len(), 8);
            assert!(row.iter().all(|&g| g < 24));
        }
    }

    #[test]
    fn test_full_space_is_a_permutation() {
        let sampler = GapSampler::new(6, 0.3);
        let gaps = sampler.sample(20, 6, 3).unwrap();
        for row in gaps.rows() {
            let mut sorted = row.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn test_first_draw_follows_weights() {
        // The first drawn offset is distributed exactly as the weights.
        let space = 8;
        let sampler = GapSampler::new(space, 0.2);
        let n = 40_000;
        let gaps = sampler.sample(n, 3, 11).unwrap();

        let mut counts = vec![0usize; space];
        for row in gaps.rows() {
            counts[row[0]] += 1;
        }

        for (offset, &count) in counts.iter().enumerate() {
            let expected = sampler.weights()[offset];
            let observed = count as f64 / n as f64;
            assert!(
                (observed - expected).abs() < 0.015,
                "offset {offset}: observed {observed:.4}, expected {expected:.4}"
            );
        }
    }

    #[test]
    fn test_deterministic() {
        let sampler = GapSampler::new(30, 0.5);
        assert_eq!(
            sampler.sample(100, 5, 9).unwrap(),
            sampler.sample(100, 5, 9).unwrap()
        );
    }
}
