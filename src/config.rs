//! Generator configuration.
//!
//! [`MqarConfig`] is the immutable record that fully determines a generated
//! batch. Together with its seed it is all that is needed to reproduce a
//! dataset, so it serializes to TOML or JSON and is validated on load.
//!
//! # Invariants
//!
//! - `input_seq_len` is even
//! - `vocab_size >= input_seq_len`
//! - `4 * num_kv_pairs <= input_seq_len`
//! - `num_kv_pairs` fits in both the key and the value vocabulary
//! - `power_a` is finite and `> 0`
//!
//! # Example
//!
//! ```
//! use mqar_dataset::config::MqarConfig;
//!
//! let config = MqarConfig::default()
//!     .with_vocab_size(8192)
//!     .with_input_seq_len(256)
//!     .with_num_kv_pairs(32)
//!     .with_seed(7);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.context_size(), 64);
//! assert_eq!(config.space(), 96);
//! ```

use crate::error::{ConfigError, Result};
use crate::vocab::VocabPartition;
use std::fs;
use std::path::Path;

/// Configuration of one generated batch.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MqarConfig {
    /// Vocabulary size `V`, blank token included.
    ///
    /// Large vocabularies (> 1k) separate recall-capable architectures from
    /// the rest more clearly.
    pub vocab_size: usize,

    /// Number of examples (rows) `N`.
    pub num_examples: usize,

    /// Sequence length `L` of both inputs and labels. Must be even.
    pub input_seq_len: usize,

    /// Master seed.
    pub seed: u64,

    /// Power-law shape parameter for query gaps.
    ///
    /// - `1.0`: uniform over the query region
    /// - `< 1.0`: queries cluster near the start of the query region
    pub power_a: f64,

    /// Number of key-value pairs `K` per example.
    pub num_kv_pairs: usize,

    /// Replace blank input positions with uniform random tokens.
    #[serde(default, alias = "random_non_queries")]
    pub fill_noise: bool,
}

impl Default for MqarConfig {
    fn default() -> Self {
        Self {
            vocab_size: 64,
            num_examples: 100_000,
            input_seq_len: 64,
            seed: 42,
            power_a: 0.01,
            num_kv_pairs: 8,
            fill_noise: false,
        }
    }
}

impl MqarConfig {
    /// Create a configuration with explicit values (not validated).
    pub fn new(
        vocab_size: usize,
        num_examples: usize,
        input_seq_len: usize,
        seed: u64,
        power_a: f64,
        num_kv_pairs: usize,
        fill_noise: bool,
    ) -> Self {
        Self {
            vocab_size,
            num_examples,
            input_seq_len,
            seed,
            power_a,
            num_kv_pairs,
            fill_noise,
        }
    }

    /// Set vocabulary size.
    pub fn with_vocab_size(mut self, vocab_size: usize) -> Self {
        self.vocab_size = vocab_size;
        self
    }

    /// Set number of examples.
    pub fn with_num_examples(mut self, num_examples: usize) -> Self {
        self.num_examples = num_examples;
        self
    }

    /// Set sequence length.
    pub fn with_input_seq_len(mut self, input_seq_len: usize) -> Self {
        self.input_seq_len = input_seq_len;
        self
    }

    /// Set master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set power-law shape parameter.
    pub fn with_power_a(mut self, power_a: f64) -> Self {
        self.power_a = power_a;
        self
    }

    /// Set number of key-value pairs.
    pub fn with_num_kv_pairs(mut self, num_kv_pairs: usize) -> Self {
        self.num_kv_pairs = num_kv_pairs;
        self
    }

    /// Enable or disable noise fill.
    pub fn with_fill_noise(mut self, fill_noise: bool) -> Self {
        self.fill_noise = fill_noise;
        self
    }

    /// Key/value vocabulary split for this configuration.
    pub fn vocab(&self) -> VocabPartition {
        VocabPartition::new(self.vocab_size)
    }

    /// Length of the context block, `2K`.
    pub fn context_size(&self) -> usize {
        self.num_kv_pairs * 2
    }

    /// Number of query slots, `(L - 2K) / 2`.
    ///
    /// Each slot spans two positions: the query token and the following
    /// position.
    pub fn space(&self) -> usize {
        self.input_seq_len.saturating_sub(self.context_size()) / 2
    }

    /// Check every invariant, in order, and report the first violation.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.input_seq_len % 2 != 0 {
            return Err(ConfigError::OddSequenceLength {
                input_seq_len: self.input_seq_len,
            });
        }

        if self.vocab_size < self.input_seq_len {
            return Err(ConfigError::VocabTooSmall {
                vocab_size: self.vocab_size,
                input_seq_len: self.input_seq_len,
            });
        }

        let required = self.num_kv_pairs.saturating_mul(4);
        if required > self.input_seq_len {
            return Err(ConfigError::TooManyPairs {
                num_kv_pairs: self.num_kv_pairs,
                required,
                input_seq_len: self.input_seq_len,
            });
        }

        let vocab = self.vocab();
        if self.num_kv_pairs > vocab.max_pairs() {
            return Err(ConfigError::PartitionTooSmall {
                num_kv_pairs: self.num_kv_pairs,
                key_vocab_size: vocab.key_count(),
                value_vocab_size: vocab.value_count(),
            });
        }

        if !self.power_a.is_finite() || self.power_a <= 0.0 {
            return Err(ConfigError::InvalidPowerA {
                power_a: self.power_a,
            });
        }

        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load and validate configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: MqarConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load and validate configuration from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: MqarConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = MqarConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.context_size(), 16);
        assert_eq!(config.space(), 24);
    }

    #[test]
    fn test_odd_sequence_length_rejected() {
        let config = MqarConfig::default().with_input_seq_len(63);
        assert_eq!(
            config.validate(),
            Err(ConfigError::OddSequenceLength { input_seq_len: 63 })
        );
    }

    #[test]
    fn test_vocab_smaller_than_sequence_rejected() {
        let config = MqarConfig::default().with_vocab_size(32);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::VocabTooSmall { vocab_size: 32, input_seq_len: 64 })
        ));
    }

    #[test]
    fn test_too_many_pairs_rejected() {
        let config = MqarConfig::default().with_num_kv_pairs(17);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooManyPairs { num_kv_pairs: 17, .. })
        ));

        // Exactly 4K == L is allowed.
        let config = MqarConfig::default().with_num_kv_pairs(16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_power_a_must_be_positive() {
        for bad in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            let config = MqarConfig::default().with_power_a(bad);
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidPowerA { .. })),
                "power_a = {bad} should be rejected"
            );
        }
        assert!(MqarConfig::default().with_power_a(1.0).validate().is_ok());
    }

    #[test]
    fn test_checks_run_in_order() {
        // Odd length is reported even though the vocabulary is also too small.
        let config = MqarConfig::default()
            .with_input_seq_len(65)
            .with_vocab_size(10);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OddSequenceLength { .. })
        ));
    }

    #[test]
    fn test_zero_pairs_is_valid() {
        let config = MqarConfig::default().with_num_kv_pairs(0);
        assert!(config.validate().is_ok());
        assert_eq!(config.context_size(), 0);
        assert_eq!(config.space(), 32);
    }

    #[test]
    fn test_save_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mqar.toml");

        let config = MqarConfig::default().with_seed(43).with_fill_noise(true);
        config.save_toml(&path).unwrap();

        let loaded = MqarConfig::load_toml(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mqar.json");

        let config = MqarConfig::default().with_power_a(1.0);
        config.save_json(&path).unwrap();

        let loaded = MqarConfig::load_json(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");

        let config = MqarConfig::default().with_input_seq_len(31);
        config.save_toml(&path).unwrap();

        let err = MqarConfig::load_toml(&path).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_random_non_queries_alias() {
        let toml_str = r#"
            vocab_size = 64
            num_examples = 10
            input_seq_len = 64
            seed = 1
            power_a = 0.01
            num_kv_pairs = 4
            random_non_queries = true
        "#;
        let config: MqarConfig = toml::from_str(toml_str).unwrap();
        assert!(config.fill_noise);
    }
}
