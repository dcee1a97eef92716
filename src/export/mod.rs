//! Data Export Module
//!
//! Writes generated batches as NumPy arrays for Python/PyTorch training
//! code, with a JSON sidecar describing how the arrays were produced.
//!
//! # Layout
//!
//! For a split called `train`:
//!
//! ```text
//! train_inputs.npy     int64 [N, L]
//! train_labels.npy     int64 [N, L]   (-100 = ignore)
//! train_metadata.json  ExportMetadata
//! ```
//!
//! [`export_dataset`] drives a full [`DatasetConfig`]: generate, optionally
//! validate, and write every split, plus a copy of the configuration.
//!
//! # Example
//!
//! ```no_run
//! use mqar_dataset::export::{export_dataset, DatasetConfig};
//!
//! let config = DatasetConfig::load_toml("configs/mqar_256.toml")?;
//! let result = export_dataset(&config)?;
//! println!("{} examples written", result.total_examples());
//! # Ok::<(), mqar_dataset::MqarError>(())
//! ```

pub mod dataset_config;

pub use dataset_config::{DatasetConfig, ExperimentInfo, ProcessingConfig, SplitConfig, TaskConfig};

use crate::config::MqarConfig;
use crate::error::{MqarError, Result};
use crate::generator::{GeneratorOptions, MqarBatch, SequenceGenerator};
use crate::stats::BatchStats;
use crate::validation::BatchValidator;
use crate::vocab::{BLANK_TOKEN, IGNORE_INDEX};
use ndarray::Array2;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// File name written next to the splits by [`export_dataset`].
pub const DATASET_CONFIG_FILE: &str = "dataset_config.toml";

/// Metadata written alongside each exported split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Configuration the batch was generated from
    pub config: MqarConfig,

    /// Shape of the inputs array `[N, L]`
    pub inputs_shape: [usize; 2],

    /// Shape of the labels array `[N, L]`
    pub labels_shape: [usize; 2],

    /// Element type of both arrays
    pub dtype: String,

    /// Label value excluded from the loss
    pub ignore_index: i64,

    /// Input filler token
    pub blank_token: i64,

    /// Key vocabulary `[start, end)`
    pub key_vocab: [usize; 2],

    /// Value vocabulary `[start, end)`
    pub value_vocab: [usize; 2],

    /// Total number of query positions
    pub n_queries: usize,

    /// Version of this crate
    pub generator_version: String,

    /// Export timestamp (RFC 3339)
    pub export_timestamp: String,
}

impl ExportMetadata {
    /// Describe `batch`, generated from `config`.
    pub fn new(batch: &MqarBatch, config: &MqarConfig) -> Self {
        let vocab = config.vocab();
        let key_range = vocab.key_range();
        let value_range = vocab.value_range();
        let n_queries = batch.labels.iter().filter(|&&y| y != IGNORE_INDEX).count();

        Self {
            config: config.clone(),
            inputs_shape: [batch.inputs.nrows(), batch.inputs.ncols()],
            labels_shape: [batch.labels.nrows(), batch.labels.ncols()],
            dtype: "int64".to_string(),
            ignore_index: IGNORE_INDEX,
            blank_token: BLANK_TOKEN,
            key_vocab: [key_range.start, key_range.end],
            value_vocab: [value_range.start, value_range.end],
            n_queries,
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            export_timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Paths written for one split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    /// `{name}_inputs.npy`
    pub inputs: PathBuf,
    /// `{name}_labels.npy`
    pub labels: PathBuf,
    /// `{name}_metadata.json`
    pub metadata: PathBuf,
}

/// NumPy exporter - writes `.npy` pairs and a JSON sidecar per split.
#[derive(Debug, Clone)]
pub struct NumpyExporter {
    output_dir: PathBuf,
}

impl NumpyExporter {
    /// Create new NumPy exporter
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Directory files are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Paths used for split `name`.
    pub fn paths(&self, name: &str) -> ExportedFiles {
        ExportedFiles {
            inputs: self.output_dir.join(format!("{name}_inputs.npy")),
            labels: self.output_dir.join(format!("{name}_labels.npy")),
            metadata: self.output_dir.join(format!("{name}_metadata.json")),
        }
    }

    /// Export `batch` as split `name`.
    ///
    /// Creates the output directory if needed.
    pub fn export(&self, name: &str, batch: &MqarBatch, config: &MqarConfig) -> Result<ExportedFiles> {
        fs::create_dir_all(&self.output_dir)?;
        let paths = self.paths(name);

        write_array(&paths.inputs, &batch.inputs)?;
        write_array(&paths.labels, &batch.labels)?;

        let metadata = ExportMetadata::new(batch, config);
        let file = BufWriter::new(File::create(&paths.metadata)?);
        serde_json::to_writer_pretty(file, &metadata)?;

        log::info!(
            "exported split '{}' [{} x {}] to {}",
            name,
            batch.num_examples(),
            batch.seq_len(),
            self.output_dir.display()
        );

        Ok(paths)
    }

    /// Read split `name` back from disk.
    pub fn load(&self, name: &str) -> Result<MqarBatch> {
        let paths = self.paths(name);
        let inputs = read_array(&paths.inputs)?;
        let labels = read_array(&paths.labels)?;

        if inputs.dim() != labels.dim() {
            return Err(MqarError::ShapeMismatch {
                what: "labels vs inputs",
                expected: inputs.dim(),
                actual: labels.dim(),
            });
        }

        Ok(MqarBatch { inputs, labels })
    }

    /// Read the metadata sidecar of split `name`.
    pub fn load_metadata(&self, name: &str) -> Result<ExportMetadata> {
        let file = BufReader::new(File::open(self.paths(name).metadata)?);
        Ok(serde_json::from_reader(file)?)
    }
}

fn write_array(path: &Path, array: &Array2<i64>) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    array.write_npy(writer)?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

fn read_array(path: &Path) -> Result<Array2<i64>> {
    let reader = File::open(path)?;
    Ok(Array2::<i64>::read_npy(reader)?)
}

//=============================================================================
// Dataset Export
//=============================================================================

/// Result of exporting a single split.
#[derive(Debug, Clone)]
pub struct SplitExportResult {
    /// Split name
    pub name: String,
    /// Configuration the split was generated from
    pub config: MqarConfig,
    /// Files written
    pub files: ExportedFiles,
    /// Statistics of the generated batch
    pub stats: BatchStats,
    /// Whether the batch validator ran on this split
    pub validated: bool,
    /// Generation and export time
    pub elapsed: Duration,
}

/// Result of exporting a whole dataset.
#[derive(Debug, Clone)]
pub struct DatasetExportResult {
    /// Output directory
    pub output_dir: PathBuf,
    /// Copy of the dataset configuration written next to the splits
    pub config_path: PathBuf,
    /// Per-split results, in configuration order
    pub splits: Vec<SplitExportResult>,
    /// Total wall-clock time
    pub elapsed: Duration,
}

impl DatasetExportResult {
    /// Total number of examples across splits.
    pub fn total_examples(&self) -> usize {
        self.splits.iter().map(|s| s.config.num_examples).sum()
    }

    /// Result for split `name`.
    pub fn split(&self, name: &str) -> Option<&SplitExportResult> {
        self.splits.iter().find(|s| s.name == name)
    }

    /// Iterate over split results.
    pub fn iter(&self) -> impl Iterator<Item = &SplitExportResult> {
        self.splits.iter()
    }
}

/// Generate and export every split of `dataset`.
///
/// The configuration is validated first; nothing is written if it is rejected.
/// With `processing.validate` set, a split that fails the batch validator
/// aborts the export with [`MqarError::Validation`]. Files already written
/// by then (`dataset_config.toml` and earlier splits) are left in place.
pub fn export_dataset(dataset: &DatasetConfig) -> Result<DatasetExportResult> {
    dataset.validate()?;
    let start = Instant::now();

    fs::create_dir_all(&dataset.output_dir)?;
    let config_path = dataset.output_dir.join(DATASET_CONFIG_FILE);
    dataset.save_toml(&config_path)?;

    let exporter = NumpyExporter::new(&dataset.output_dir);
    let mut options = GeneratorOptions::new();
    if let Some(threads) = dataset.processing.threads {
        options = options.with_threads(threads);
    }

    log::info!(
        "exporting '{}' ({} splits) to {}",
        dataset.experiment.name,
        dataset.splits.len(),
        dataset.output_dir.display()
    );

    let mut splits = Vec::with_capacity(dataset.splits.len());
    for split in &dataset.splits {
        let split_start = Instant::now();
        let config = dataset.to_mqar_config(split);

        let batch = SequenceGenerator::new(config.clone())?
            .with_options(options.clone())
            .generate()?;

        if dataset.processing.validate {
            let report = BatchValidator::new().validate(&batch, &config);
            if report.has_errors() {
                return Err(MqarError::Validation(format!(
                    "split '{}': {}",
                    split.name,
                    report.errors().join("; ")
                )));
            }
        }

        let stats = BatchStats::compute(&batch, &config);
        let files = exporter.export(&split.name, &batch, &config)?;

        if dataset.processing.verbose {
            log::info!(
                "split '{}': {} examples, {} queries, mean gap {:.2}",
                split.name,
                stats.num_examples,
                stats.num_queries,
                stats.mean_gap
            );
        }

        splits.push(SplitExportResult {
            name: split.name.clone(),
            config,
            files,
            stats,
            validated: dataset.processing.validate,
            elapsed: split_start.elapsed(),
        });
    }

    Ok(DatasetExportResult {
        output_dir: dataset.output_dir.clone(),
        config_path,
        splits,
        elapsed: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small_batch() -> (MqarBatch, MqarConfig) {
        let config = MqarConfig::new(64, 8, 32, 5, 0.5, 4, false);
        let batch = SequenceGenerator::new(config.clone()).unwrap().generate().unwrap();
        (batch, config)
    }

    #[test]
    fn test_export_writes_three_files() {
        let temp_dir = TempDir::new().unwrap();
        let exporter = NumpyExporter::new(temp_dir.path().join("nested"));
        let (batch, config) = small_batch();

        let files = exporter.export("train", &batch, &config).unwrap();
        assert!(files.inputs.ends_with("train_inputs.npy"));
        assert!(files.inputs.exists());
        assert!(files.labels.exists());
        assert!(files.metadata.exists());
    }

    #[test]
    fn test_export_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let exporter = NumpyExporter::new(temp_dir.path());
        let (batch, config) = small_batch();

        exporter.export("valid", &batch, &config).unwrap();
        assert_eq!(exporter.load("valid").unwrap(), batch);
    }

    #[test]
    fn test_metadata_contents() {
        let temp_dir = TempDir::new().unwrap();
        let exporter = NumpyExporter::new(temp_dir.path());
        let (batch, config) = small_batch();

        exporter.export("train", &batch, &config).unwrap();
        let metadata = exporter.load_metadata("train").unwrap();

        assert_eq!(metadata.config, config);
        assert_eq!(metadata.inputs_shape, [8, 32]);
        assert_eq!(metadata.labels_shape, [8, 32]);
        assert_eq!(metadata.ignore_index, -100);
        assert_eq!(metadata.blank_token, 0);
        assert_eq!(metadata.key_vocab, [1, 32]);
        assert_eq!(metadata.value_vocab, [32, 64]);
        assert_eq!(metadata.n_queries, 32);
        assert_eq!(metadata.dtype, "int64");
        assert!(chrono::DateTime::parse_from_rfc3339(&metadata.export_timestamp).is_ok());
    }

    #[test]
    fn test_load_missing_split_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let exporter = NumpyExporter::new(temp_dir.path());
        assert!(matches!(exporter.load("nope"), Err(MqarError::Io(_))));
    }

    #[test]
    fn test_export_dataset_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");
        let dataset = DatasetConfig::default()
            .with_output_dir(&out)
            .with_batch_size(0);

        let err = export_dataset(&dataset).unwrap_err();
        assert!(err.is_config_error());
        assert!(!out.exists());
    }
}
