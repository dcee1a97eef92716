//! Batch statistics.
//!
//! Gaps are recovered from the labels alone: a label at position `t`
//! belongs to the query slot `g = (t - 2K) / 2`.

use crate::config::MqarConfig;
use crate::generator::{power_law_weights, MqarBatch};
use crate::vocab::{BLANK_TOKEN, IGNORE_INDEX};
use serde::{Deserialize, Serialize};

/// Summary of a generated batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Number of rows
    pub num_examples: usize,
    /// Total number of labelled (query) positions
    pub num_queries: usize,
    /// Query count per slot `0..space`
    pub gap_histogram: Vec<usize>,
    /// Mean query slot
    pub mean_gap: f64,
    /// Fraction of input positions holding the blank token
    pub blank_fraction: f64,
}

impl BatchStats {
    /// Compute statistics for `batch` generated from `config`.
    pub fn compute(batch: &MqarBatch, config: &MqarConfig) -> Self {
        let context_size = config.context_size();
        let mut gap_histogram = vec![0usize; config.space()];
        let mut num_queries = 0usize;
        let mut gap_sum = 0usize;

        for (t, &label) in batch.labels.indexed_iter().map(|((_, t), y)| (t, y)) {
            if label == IGNORE_INDEX || t < context_size {
                continue;
            }
            let gap = (t - context_size) / 2;
            if let Some(slot) = gap_histogram.get_mut(gap) {
                *slot += 1;
            }
            num_queries += 1;
            gap_sum += gap;
        }

        let total_inputs = batch.inputs.len();
        let blanks = batch.inputs.iter().filter(|&&x| x == BLANK_TOKEN).count();

        Self {
            num_examples: batch.num_examples(),
            num_queries,
            gap_histogram,
            mean_gap: if num_queries > 0 {
                gap_sum as f64 / num_queries as f64
            } else {
                0.0
            },
            blank_fraction: if total_inputs > 0 {
                blanks as f64 / total_inputs as f64
            } else {
                0.0
            },
        }
    }

    /// Distribution of the first query's slot, i.e. the normalised power-law weights.
    pub fn expected_gap_marginal(config: &MqarConfig) -> Vec<f64> {
        power_law_weights(config.space(), config.power_a)
    }

    /// Empirical gap distribution (histogram normalised to 1).
    pub fn gap_distribution(&self) -> Vec<f64> {
        if self.num_queries == 0 {
            return vec![0.0; self.gap_histogram.len()];
        }
        self.gap_histogram
            .iter()
            .map(|&c| c as f64 / self.num_queries as f64)
            .collect()
    }

    /// Average number of queries per row.
    pub fn queries_per_example(&self) -> f64 {
        if self.num_examples == 0 {
            0.0
        } else {
            self.num_queries as f64 / self.num_examples as f64
        }
    }
}
