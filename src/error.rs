//! Error types.
//!
//! Configuration problems are reported as [`ConfigError`] and are always
//! raised before any sampling or allocation happens. Everything else
//! (I/O, serialization, NumPy export) is wrapped by [`MqarError`].

use thiserror::Error;

/// Invalid generator or dataset configuration.
///
/// Each variant names the invariant that failed together with the values
/// that broke it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `input_seq_len` must be even: keys and values come in pairs and the
    /// query region is addressed in units of two positions.
    #[error("input_seq_len must be even, got {input_seq_len}")]
    OddSequenceLength {
        /// Requested sequence length
        input_seq_len: usize,
    },

    /// `vocab_size` must be at least `input_seq_len`.
    #[error("vocab_size ({vocab_size}) must be >= input_seq_len ({input_seq_len})")]
    VocabTooSmall {
        /// Requested vocabulary size
        vocab_size: usize,
        /// Requested sequence length
        input_seq_len: usize,
    },

    /// `4 * num_kv_pairs` must fit in `input_seq_len`.
    #[error(
        "4 * num_kv_pairs ({required}) must be <= input_seq_len ({input_seq_len}), \
         num_kv_pairs = {num_kv_pairs}"
    )]
    TooManyPairs {
        /// Requested number of key-value pairs
        num_kv_pairs: usize,
        /// `4 * num_kv_pairs`
        required: usize,
        /// Requested sequence length
        input_seq_len: usize,
    },

    /// `num_kv_pairs` exceeds the smaller of the key and value vocabularies.
    #[error(
        "num_kv_pairs ({num_kv_pairs}) exceeds vocabulary partition \
         (keys: {key_vocab_size}, values: {value_vocab_size})"
    )]
    PartitionTooSmall {
        /// Requested number of key-value pairs
        num_kv_pairs: usize,
        /// Number of tokens in the key vocabulary
        key_vocab_size: usize,
        /// Number of tokens in the value vocabulary
        value_vocab_size: usize,
    },

    /// `power_a` must be finite and strictly positive.
    #[error("power_a must be finite and > 0, got {power_a}")]
    InvalidPowerA {
        /// Requested power-law shape parameter
        power_a: f64,
    },

    /// Any other invalid setting (dataset splits, batch sizes, ...).
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum MqarError {
    /// Configuration rejected before generation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Two arrays that must agree in shape do not.
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// What was being compared
        what: &'static str,
        /// Expected shape
        expected: (usize, usize),
        /// Actual shape
        actual: (usize, usize),
    },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ndarray reshape/construction error.
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Failed writing a `.npy` file.
    #[error("failed to write npy: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    /// Failed reading a `.npy` file.
    #[error("failed to read npy: {0}")]
    NpyRead(#[from] ndarray_npy::ReadNpyError),

    /// Failed parsing TOML.
    #[error("failed to parse TOML: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Failed serializing TOML.
    #[error("failed to serialize TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Failed (de)serializing JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A generated batch failed post-generation checks.
    #[error("generated batch failed validation: {0}")]
    Validation(String),

    /// The rayon thread pool could not be built.
    #[error("failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl MqarError {
    /// True if this error came from configuration validation.
    pub fn is_config_error(&self) -> bool {
        matches!(self, MqarError::Config(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MqarError>;
