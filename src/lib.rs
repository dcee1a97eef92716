//! MQAR Dataset
//!
//! Synthetic multi-query associative recall (MQAR) data for evaluating
//! sequence models.
//!
//! # Overview
//!
//! Every example is a token sequence of length `L` made of two regions:
//!
//! ```text
//! ┌──────────────────────────┬───────────────────────────────────────────┐
//! │ context: k v k v ... k v │ queries: keys re-appear at even offsets   │
//! │ 2K tokens                │ L - 2K tokens, blank (0) everywhere else  │
//! └──────────────────────────┴───────────────────────────────────────────┘
//! ```
//!
//! The label at a query position is the value that was paired with that key
//! in the context; every other label is [`IGNORE_INDEX`]. How far queries
//! sit from the start of the query region follows a power law with shape
//! `power_a`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  config       - MqarConfig and its invariants                   │
//! │  vocab        - key/value vocabulary split, sentinel tokens     │
//! │  generator/   - sampling stages and SequenceGenerator           │
//! │  batching     - fixed-size minibatches for training loops       │
//! │  validation   - post-hoc checks on generated batches            │
//! │  stats        - gap histograms and fill statistics              │
//! │  export/      - NumPy export and dataset configuration          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use mqar_dataset::{generate, IGNORE_INDEX};
//!
//! let (inputs, labels) = generate(8192, 4, 256, 42, 0.01, 32, false)?;
//! assert_eq!(inputs.dim(), (4, 256));
//!
//! let queries = labels.iter().filter(|&&y| y != IGNORE_INDEX).count();
//! assert_eq!(queries, 4 * 32);
//! # Ok::<(), mqar_dataset::MqarError>(())
//! ```

pub mod batching;
pub mod config;
pub mod error;
pub mod export;
pub mod generator;
pub mod prelude;
pub mod rng;
pub mod stats;
pub mod validation;
pub mod vocab;

// Re-exports - Config and errors
pub use config::MqarConfig;
pub use error::{ConfigError, MqarError, Result};

// Re-exports - Generation
pub use generator::{
    assemble_context, fill_noise, generate, place_queries, power_law_weights, GapSampler,
    GeneratorOptions, KeyValuePairs, KeyValueSampler, MqarBatch, SequenceGenerator,
};
pub use vocab::{VocabPartition, BLANK_TOKEN, IGNORE_INDEX};

// Re-exports - Downstream
pub use batching::{Minibatch, Minibatches};
pub use stats::BatchStats;
pub use validation::{BatchValidator, ValidationConfig, ValidationLevel, ValidationResult};

// Re-exports - Export
pub use export::{
    export_dataset, DatasetConfig, DatasetExportResult, ExportMetadata, NumpyExporter,
    SplitConfig, SplitExportResult,
};
