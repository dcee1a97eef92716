//! Fixed-size minibatches over a generated batch.
//!
//! Training loops consume the dataset as `(num_batches, batch_size, L)`
//! tensors and usually run for more steps than one epoch holds, so
//! [`Minibatches::cycle`] wraps the index around.

use crate::error::{ConfigError, Result};
use crate::generator::MqarBatch;
use ndarray::{Array3, ArrayView2, Axis};

/// One minibatch: `(batch_size, L)` views of inputs and labels.
#[derive(Debug, Clone, Copy)]
pub struct Minibatch<'a> {
    /// Input tokens
    pub inputs: ArrayView2<'a, i64>,
    /// Label tokens
    pub labels: ArrayView2<'a, i64>,
}

/// A batch reshaped into `N / batch_size` minibatches.
#[derive(Debug, Clone)]
pub struct Minibatches {
    inputs: Array3<i64>,
    labels: Array3<i64>,
}

impl Minibatches {
    /// Reshape `batch` into minibatches of `batch_size` rows.
    ///
    /// `batch.num_examples()` must be a non-zero multiple of `batch_size`.
    pub fn new(batch: &MqarBatch, batch_size: usize) -> Result<Self> {
        let n = batch.num_examples();
        if batch_size == 0 || n == 0 || n % batch_size != 0 {
            return Err(ConfigError::Invalid(format!(
                "{n} examples cannot be split into batches of {batch_size}"
            ))
            .into());
        }

        let shape = (n / batch_size, batch_size, batch.seq_len());
        let inputs = batch.inputs.to_owned().into_shape(shape)?;
        let labels = batch.labels.to_owned().into_shape(shape)?;

        Ok(Self { inputs, labels })
    }

    /// Number of minibatches.
    pub fn len(&self) -> usize {
        self.inputs.len_of(Axis(0))
    }

    /// True if there are no minibatches.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows per minibatch.
    pub fn batch_size(&self) -> usize {
        self.inputs.len_of(Axis(1))
    }

    /// Minibatch `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<Minibatch<'_>> {
        if index >= self.len() {
            return None;
        }
        Some(Minibatch {
            inputs: self.inputs.index_axis(Axis(0), index),
            labels: self.labels.index_axis(Axis(0), index),
        })
    }

    /// Minibatch `index % len()`.
    pub fn cycle(&self, index: usize) -> Minibatch<'_> {
        let index = index % self.len();
        Minibatch {
            inputs: self.inputs.index_axis(Axis(0), index),
            labels: self.labels.index_axis(Axis(0), index),
        }
    }

    /// Iterate over the minibatches once, in order.
    pub fn iter(&self) -> impl Iterator<Item = Minibatch<'_>> + '_ {
        self.inputs
            .outer_iter()
            .zip(self.labels.outer_iter())
            .map(|(inputs, labels)| Minibatch { inputs, labels })
    }

    /// Reshaped inputs, `(num_batches, batch_size, L)`.
    pub fn inputs(&self) -> &Array3<i64> {
        &self.inputs
    }

    /// Reshaped labels, `(num_batches, batch_size, L)`.
    pub fn labels(&self) -> &Array3<i64> {
        &self.labels
    }
}
