//! Dataset Export Configuration
//!
//! Describes a whole MQAR dataset: the task shared by every split, the
//! splits themselves (size, seed, optional power-law override), the
//! minibatch size the split sizes are rounded to, and where to write.
//!
//! # Example TOML
//!
//! ```toml
//! output_dir = "data/mqar/v8192_l256"
//! batch_size = 64
//!
//! [experiment]
//! name = "MQAR 256"
//! version = "1.0.0"
//!
//! [task]
//! vocab_size = 8192
//! input_seq_len = 256
//! num_kv_pairs = 32
//! power_a = 0.01
//! fill_noise = false
//!
//! [processing]
//! threads = 8
//! validate = true
//!
//! [[splits]]
//! name = "train"
//! num_examples = 100000
//! seed = 42
//!
//! [[splits]]
//! name = "valid"
//! num_examples = 3000
//! seed = 43
//! ```

use crate::config::MqarConfig;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Task Configuration
// ============================================================================

/// Task parameters shared by every split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Vocabulary size, blank token included
    pub vocab_size: usize,

    /// Sequence length (even)
    pub input_seq_len: usize,

    /// Key-value pairs per example
    pub num_kv_pairs: usize,

    /// Power-law shape parameter for query gaps
    #[serde(default = "default_power_a")]
    pub power_a: f64,

    /// Replace blank inputs with random tokens
    #[serde(default, alias = "random_non_queries")]
    pub fill_noise: bool,
}

fn default_power_a() -> f64 {
    0.01
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            vocab_size: 64,
            input_seq_len: 64,
            num_kv_pairs: 8,
            power_a: default_power_a(),
            fill_noise: false,
        }
    }
}

// ============================================================================
// Split Configuration
// ============================================================================

/// One named split of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Split name, used as the file prefix (e.g. `"train"`)
    pub name: String,

    /// Requested number of examples, before rounding to the batch size
    pub num_examples: usize,

    /// Master seed for this split
    pub seed: u64,

    /// Override of the task's `power_a` for this split only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_a: Option<f64>,
}

impl SplitConfig {
    /// Create a split without a power-law override.
    pub fn new(name: &str, num_examples: usize, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            num_examples,
            seed,
            power_a: None,
        }
    }

    /// Use a different `power_a` for this split.
    pub fn with_power_a(mut self, power_a: f64) -> Self {
        self.power_a = Some(power_a);
        self
    }

    /// Number of examples after rounding down to a multiple of `batch_size`.
    pub fn rounded_examples(&self, batch_size: usize) -> usize {
        if batch_size == 0 {
            return 0;
        }
        self.num_examples / batch_size * batch_size
    }
}

fn default_splits() -> Vec<SplitConfig> {
    vec![
        SplitConfig::new("train", 100_000, 42),
        SplitConfig::new("valid", 3_000, 43),
    ]
}

// ============================================================================
// Processing Configuration
// ============================================================================

/// Configuration for parallel processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Number of generator threads (rayon default if not specified).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Re-check every split with the batch validator before writing it.
    #[serde(default = "default_validate")]
    pub validate: bool,

    /// Enable verbose progress reporting.
    #[serde(default)]
    pub verbose: bool,
}

fn default_validate() -> bool {
    true
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            threads: None,
            validate: true,
            verbose: false,
        }
    }
}

impl ProcessingConfig {
    /// Validate the processing configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.threads == Some(0) {
            return Err("threads must be > 0".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Experiment Metadata
// ============================================================================

/// Metadata for experiment tracking and reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentInfo {
    /// Experiment name
    pub name: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Version
    #[serde(default = "default_version")]
    pub version: String,

    /// Tags for categorization
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Default for ExperimentInfo {
    fn default() -> Self {
        Self {
            name: "Unnamed Experiment".to_string(),
            description: None,
            version: default_version(),
            tags: Vec::new(),
        }
    }
}

// ============================================================================
// Main Dataset Configuration
// ============================================================================

/// Complete dataset export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Directory the splits are written to
    pub output_dir: PathBuf,

    /// Split sizes are rounded down to a multiple of this
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Experiment metadata
    #[serde(default)]
    pub experiment: ExperimentInfo,

    /// Task parameters
    #[serde(default)]
    pub task: TaskConfig,

    /// Processing configuration
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Splits, written in order
    #[serde(default = "default_splits")]
    pub splits: Vec<SplitConfig>,
}

fn default_batch_size() -> usize {
    64
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self::new(TaskConfig::default(), "data/mqar")
    }
}

impl DatasetConfig {
    /// Create a configuration with the default train/valid splits.
    pub fn new<P: AsRef<Path>>(task: TaskConfig, output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            batch_size: default_batch_size(),
            experiment: ExperimentInfo::default(),
            task,
            processing: ProcessingConfig::default(),
            splits: default_splits(),
        }
    }

    /// Set experiment metadata.
    pub fn with_experiment(mut self, experiment: ExperimentInfo) -> Self {
        self.experiment = experiment;
        self
    }

    /// Replace all splits.
    pub fn with_splits(mut self, splits: Vec<SplitConfig>) -> Self {
        self.splits = splits;
        self
    }

    /// Set the batch size used for rounding.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set processing configuration.
    pub fn with_processing(mut self, processing: ProcessingConfig) -> Self {
        self.processing = processing;
        self
    }

    /// Set the output directory.
    pub fn with_output_dir<P: AsRef<Path>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.as_ref().to_path_buf();
        self
    }

    /// Look up a split by name.
    pub fn split(&self, name: &str) -> Option<&SplitConfig> {
        self.splits.iter().find(|s| s.name == name)
    }

    /// Generator configuration for `split`, with rounded size and any override applied.
    pub fn to_mqar_config(&self, split: &SplitConfig) -> MqarConfig {
        MqarConfig::new(
            self.task.vocab_size,
            split.rounded_examples(self.batch_size),
            self.task.input_seq_len,
            split.seed,
            split.power_a.unwrap_or(self.task.power_a),
            self.task.num_kv_pairs,
            self.task.fill_noise,
        )
    }

    /// Validate the complete configuration.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be > 0".to_string()));
        }

        self.processing
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("processing: {e}")))?;

        if self.splits.is_empty() {
            return Err(ConfigError::Invalid("at least one split is required".to_string()));
        }

        let mut names = HashSet::new();
        for split in &self.splits {
            if split.name.trim().is_empty() {
                return Err(ConfigError::Invalid("split names must not be empty".to_string()));
            }
            if split.name.contains(|c: char| c == '/' || c == '\\') || split.name.contains("..") {
                return Err(ConfigError::Invalid(format!(
                    "split name '{}' must not contain path separators or '..'",
                    split.name
                )));
            }
            if !names.insert(split.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate split name '{}'",
                    split.name
                )));
            }
            if split.num_examples < self.batch_size {
                return Err(ConfigError::Invalid(format!(
                    "split '{}': {} examples is less than one batch of {}",
                    split.name, split.num_examples, self.batch_size
                )));
            }
            self.to_mqar_config(split).validate()?;
        }

        Ok(())
    }

    /// Load configuration from TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: DatasetConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load configuration from JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: DatasetConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_matches_reference_sweep() {
        let config = DatasetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 64);

        let train = config.split("train").unwrap();
        assert_eq!(train.seed, 42);
        assert_eq!(train.rounded_examples(64), 99_968);

        let valid = config.split("valid").unwrap();
        assert_eq!(valid.seed, 43);
        assert_eq!(valid.rounded_examples(64), 2_944);
    }

    #[test]
    fn test_to_mqar_config_applies_override() {
        let config = DatasetConfig::default().with_splits(vec![
            SplitConfig::new("train", 1000, 1),
            SplitConfig::new("test", 640, 2).with_power_a(1.0),
        ]);

        let train = config.to_mqar_config(&config.splits[0]);
        assert_eq!(train.num_examples, 960);
        assert_eq!(train.power_a, 0.01);
        assert_eq!(train.seed, 1);

        let test = config.to_mqar_config(&config.splits[1]);
        assert_eq!(test.num_examples, 640);
        assert_eq!(test.power_a, 1.0);
    }

    #[test]
    fn test_validation_failures() {
        let base = DatasetConfig::default();

        assert!(base.clone().with_batch_size(0).validate().is_err());
        assert!(base.clone().with_splits(vec![]).validate().is_err());

        let dup = base.clone().with_splits(vec![
            SplitConfig::new("a", 100, 1),
            SplitConfig::new("a", 100, 2),
        ]);
        assert!(matches!(dup.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("duplicate")));

        let tiny = base.clone().with_splits(vec![SplitConfig::new("a", 10, 1)]);
        assert!(tiny.validate().is_err());

        let bad_override = base
            .clone()
            .with_splits(vec![SplitConfig::new("a", 100, 1).with_power_a(-1.0)]);
        assert!(matches!(
            bad_override.validate(),
            Err(ConfigError::InvalidPowerA { .. })
        ));

        for name in ["../escape", "nested/train", "a\\b", ".."] {
            let escaping = base.clone().with_splits(vec![SplitConfig::new(name, 100, 1)]);
            assert!(
                matches!(escaping.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("path")),
                "{name} accepted"
            );
        }

        let mut bad_task = base;
        bad_task.task.input_seq_len = 65;
        assert!(matches!(
            bad_task.validate(),
            Err(ConfigError::OddSequenceLength { .. })
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dataset.toml");

        let config = DatasetConfig::default()
            .with_experiment(ExperimentInfo {
                name: "roundtrip".to_string(),
                description: Some("toml".to_string()),
                tags: vec!["mqar".to_string()],
                ..Default::default()
            })
            .with_splits(vec![
                SplitConfig::new("train", 256, 7),
                SplitConfig::new("test", 128, 8).with_power_a(0.5),
            ])
            .with_processing(ProcessingConfig {
                threads: Some(2),
                ..Default::default()
            });

        config.save_toml(&path).unwrap();
        let loaded = DatasetConfig::load_toml(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dataset.json");

        let config = DatasetConfig::default().with_batch_size(32);
        config.save_json(&path).unwrap();
        assert_eq!(DatasetConfig::load_json(&path).unwrap(), config);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let toml_str = r#"
            output_dir = "out"

            [task]
            vocab_size = 128
            input_seq_len = 64
            num_kv_pairs = 4
        "#;
        let config: DatasetConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.splits.len(), 2);
        assert_eq!(config.task.power_a, 0.01);
        assert!(config.processing.validate);
        assert_eq!(config.experiment.version, "1.0.0");
    }
}
