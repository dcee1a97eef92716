//! Query and label placement.
//!
//! For context size `C = 2K` and a gap `g` drawn for pair `j`:
//!
//! ```text
//! full row   = [ context (C) | queries (L - C + 1) ]        length L + 1
//! queries[2g]            = key_j
//! labels_full[C + 2g + 1] = value_j                          length L + 1
//!
//! inputs = full row[0 .. L]
//! labels = labels_full[1 ..= L]
//! ```
//!
//! The one-column shift between the two slices is the next-token target:
//! a query at input position `t = C + 2g` has its value at label index `t`.

use super::kv_sampler::KeyValuePairs;
use crate::error::{ConfigError, MqarError, Result};
use crate::rng::{row_rng, Stage};
use crate::vocab::{BLANK_TOKEN, IGNORE_INDEX};
use ndarray::{concatenate, s, Array2, Axis};
use rand::Rng;
use rayon::prelude::*;

/// Build `(inputs, labels)`, both `(N, input_seq_len)`.
///
/// `context` is the `(N, 2K)` block from
/// [`assemble_context`](super::assemble_context); `gaps` holds `K` distinct
/// offsets per row, each below `(input_seq_len - 2K) / 2`.
pub fn place_queries(
    context: &Array2<i64>,
    pairs: &KeyValuePairs,
    gaps: &Array2<usize>,
    input_seq_len: usize,
) -> Result<(Array2<i64>, Array2<i64>)> {
    let (num_examples, num_pairs) = pairs.keys.dim();
    let context_size = num_pairs * 2;

    if context.dim() != (num_examples, context_size) {
        return Err(MqarError::ShapeMismatch {
            what: "context block",
            expected: (num_examples, context_size),
            actual: context.dim(),
        });
    }
    if gaps.dim() != (num_examples, num_pairs) {
        return Err(MqarError::ShapeMismatch {
            what: "gaps",
            expected: (num_examples, num_pairs),
            actual: gaps.dim(),
        });
    }

    if context_size > input_seq_len {
        return Err(ConfigError::TooManyPairs {
            num_kv_pairs: num_pairs,
            required: num_pairs * 4,
            input_seq_len,
        }
        .into());
    }
    let space = (input_seq_len - context_size) / 2;
    if let Some(&gap) = gaps.iter().find(|&&g| g >= space) {
        return Err(ConfigError::Invalid(format!("query gap {gap} outside 0..{space}")).into());
    }

    let query_width = input_seq_len - context_size + 1;
    let mut queries = Array2::<i64>::from_elem((num_examples, query_width), BLANK_TOKEN);
    let mut labels_full = Array2::<i64>::from_elem((num_examples, input_seq_len + 1), IGNORE_INDEX);

    for (row, row_gaps) in gaps.outer_iter().enumerate() {
        for (j, &gap) in row_gaps.iter().enumerate() {
            queries[[row, gap * 2]] = pairs.keys[[row, j]];
            labels_full[[row, gap * 2 + context_size + 1]] = pairs.values[[row, j]];
        }
    }

    let examples = concatenate(Axis(1), &[context.view(), queries.view()])?;
    let inputs = examples.slice(s![.., ..input_seq_len]).to_owned();
    let labels = labels_full.slice(s![.., 1..]).to_owned();

    Ok((inputs, labels))
}

/// Replace every blank input with a uniform token from `0..vocab_size`.
///
/// Labels are not touched. A replacement may itself be `0`.
pub fn fill_noise(inputs: &mut Array2<i64>, vocab_size: usize, seed: u64) {
    if vocab_size == 0 {
        return;
    }

    inputs
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(row, mut tokens)| {
            let mut rng = row_rng(seed, Stage::Noise, row);
            for token in tokens.iter_mut() {
                // Drawn for every position so the stream does not depend on where the blanks are.
                let noise = rng.gen_range(0..vocab_size) as i64;
                if *token == BLANK_TOKEN {
                    *token = noise;
                }
            }
        });
}
