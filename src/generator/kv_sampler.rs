//! Key/value sampling.
//!
//! Each row draws `K` distinct keys and `K` distinct values, uniformly and
//! without replacement, from disjoint vocabularies. `keys[i, j]` and
//! `values[i, j]` form the ground-truth pair `j` of example `i`, in draw
//! order.

use crate::error::{ConfigError, Result};
use crate::rng::{row_rng, Stage};
use crate::vocab::VocabPartition;
use ndarray::Array2;
use rand::seq::index;
use rayon::prelude::*;
use std::ops::Range;

/// Sampled pairs for a whole batch, both `(N, K)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValuePairs {
    /// Keys in draw order
    pub keys: Array2<i64>,
    /// Values paired with `keys` by column
    pub values: Array2<i64>,
}

impl KeyValuePairs {
    /// Number of rows.
    pub fn num_examples(&self) -> usize {
        self.keys.nrows()
    }

    /// Number of pairs per row.
    pub fn num_pairs(&self) -> usize {
        self.keys.ncols()
    }
}

/// Draws disjoint key and value sets per example.
#[derive(Debug, Clone)]
pub struct KeyValueSampler {
    vocab: VocabPartition,
}

impl KeyValueSampler {
    /// Create a sampler over the given vocabulary split.
    pub fn new(vocab: VocabPartition) -> Self {
        Self { vocab }
    }

    /// Vocabulary this sampler draws from.
    pub fn vocab(&self) -> &VocabPartition {
        &self.vocab
    }

    /// Sample `num_pairs` key-value pairs for each of `num_examples` rows.
    ///
    /// Fails with [`ConfigError::PartitionTooSmall`] when `num_pairs`
    /// exceeds [`VocabPartition::max_pairs`].
    pub fn sample(&self, num_examples: usize, num_pairs: usize, seed: u64) -> Result<KeyValuePairs> {
        if num_pairs > self.vocab.max_pairs() {
            return Err(ConfigError::PartitionTooSmall {
                num_kv_pairs: num_pairs,
                key_vocab_size: self.vocab.key_count(),
                value_vocab_size: self.vocab.value_count(),
            }
            .into());
        }

        let keys = sample_rows(self.vocab.key_range(), num_examples, num_pairs, seed, Stage::Keys)?;
        let values = sample_rows(
            self.vocab.value_range(),
            num_examples,
            num_pairs,
            seed,
            Stage::Values,
        )?;

        Ok(KeyValuePairs { keys, values })
    }
}

/// Uniform draws without replacement from `tokens`, one independent stream per row.
fn sample_rows(
    tokens: Range<usize>,
    num_examples: usize,
    amount: usize,
    seed: u64,
    stage: Stage,
) -> Result<Array2<i64>> {
    let offset = tokens.start;
    let len = tokens.len();

    let flat: Vec<i64> = (0..num_examples)
        .into_par_iter()
        .flat_map_iter(|row| {
            let mut rng = row_rng(seed, stage, row);
            index::sample(&mut rng, len, amount)
                .into_iter()
                .map(move |i| (offset + i) as i64)
        })
        .collect();

    Ok(Array2::from_shape_vec((num_examples, amount), flat)?)
}
