//! Token space layout.
//!
//! The vocabulary `{0 .. vocab_size}` is split in three:
//!
//! ```text
//! 0                     blank / fill token (never a key or value)
//! 1 .. V/2              key vocabulary     (V/2 - 1 tokens)
//! V/2 .. V              value vocabulary   (V - V/2 tokens)
//! ```
//!
//! Labels additionally use [`IGNORE_INDEX`], which lies outside the
//! vocabulary and marks positions excluded from loss and metrics.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Token used for every input position that is neither context nor query.
pub const BLANK_TOKEN: i64 = 0;

/// Label sentinel for positions excluded from the loss.
///
/// Matches the default `ignore_index` of PyTorch's cross-entropy loss.
pub const IGNORE_INDEX: i64 = -100;

/// Disjoint key and value vocabularies for a given vocabulary size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabPartition {
    vocab_size: usize,
    keys: Range<usize>,
    values: Range<usize>,
}

impl VocabPartition {
    /// Split `vocab_size` tokens at the midpoint.
    ///
    /// ```
    /// use mqar_dataset::vocab::VocabPartition;
    ///
    /// let vocab = VocabPartition::new(12);
    /// assert_eq!(vocab.key_range(), 1..6);
    /// assert_eq!(vocab.value_range(), 6..12);
    /// ```
    pub fn new(vocab_size: usize) -> Self {
        let mid = vocab_size / 2;
        // With vocab_size < 2 both partitions collapse; keys never include 0.
        let keys = 1..mid.max(1);
        let values = mid.max(1)..vocab_size.max(1);
        Self {
            vocab_size,
            keys,
            values,
        }
    }

    /// Total vocabulary size, blank token included.
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Key tokens, `1 .. V/2`.
    pub fn key_range(&self) -> Range<usize> {
        self.keys.clone()
    }

    /// Value tokens, `V/2 .. V`.
    pub fn value_range(&self) -> Range<usize> {
        self.values.clone()
    }

    /// Number of key tokens.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Number of value tokens.
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Largest number of key-value pairs a single example can hold.
    pub fn max_pairs(&self) -> usize {
        self.key_count().min(self.value_count())
    }

    /// Is `token` a key?
    #[inline]
    pub fn is_key(&self, token: i64) -> bool {
        token >= 0 && self.keys.contains(&(token as usize))
    }

    /// Is `token` a value?
    #[inline]
    pub fn is_value(&self, token: i64) -> bool {
        token >= 0 && self.values.contains(&(token as usize))
    }

    /// Is `token` inside `{0 .. vocab_size}`?
    #[inline]
    pub fn contains(&self, token: i64) -> bool {
        token >= 0 && (token as usize) < self.vocab_size
    }
}
