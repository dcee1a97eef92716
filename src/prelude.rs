//! Prelude module for convenient imports.
//!
//! ```
//! use mqar_dataset::prelude::*;
//!
//! let config = MqarConfig::default().with_num_examples(128);
//! let batch = SequenceGenerator::new(config.clone())?.generate()?;
//! let minibatches = Minibatches::new(&batch, 64)?;
//! assert_eq!(minibatches.len(), 2);
//! assert!(BatchValidator::new().validate(&batch, &config).is_valid());
//! # Ok::<(), MqarError>(())
//! ```
//!
//! # What's Included
//!
//! ## Generation
//! - [`MqarConfig`] - Generator configuration
//! - [`SequenceGenerator`], [`GeneratorOptions`], [`MqarBatch`]
//! - [`generate`] - One-call generation
//!
//! ## Downstream
//! - [`Minibatches`] - `(batches, batch_size, L)` view for training loops
//! - [`BatchValidator`], [`ValidationResult`]
//! - [`BatchStats`]
//!
//! ## Export
//! - [`NumpyExporter`], [`DatasetConfig`], [`export_dataset`]

pub use crate::batching::{Minibatch, Minibatches};
pub use crate::config::MqarConfig;
pub use crate::error::{ConfigError, MqarError, Result};
pub use crate::export::{export_dataset, DatasetConfig, NumpyExporter, SplitConfig, TaskConfig};
pub use crate::generator::{generate, GeneratorOptions, MqarBatch, SequenceGenerator};
pub use crate::stats::BatchStats;
pub use crate::validation::{BatchValidator, ValidationLevel, ValidationResult};
pub use crate::vocab::{VocabPartition, BLANK_TOKEN, IGNORE_INDEX};
