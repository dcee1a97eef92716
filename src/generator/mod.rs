//! MQAR batch generation.
//!
//! Generation runs four stages over the whole batch:
//!
//! ```text
//! KeyValueSampler ──► assemble_context ──┐
//!        │                               ├──► place_queries ──► fill_noise (optional)
//!        └──────────► GapSampler ────────┘
//! ```
//!
//! Every stage works row by row with an independent random stream, so the
//! result for a given [`MqarConfig`] does not depend on the number of worker
//! threads.
//!
//! # Example
//!
//! ```
//! use mqar_dataset::generator::SequenceGenerator;
//! use mqar_dataset::{MqarConfig, IGNORE_INDEX};
//!
//! let config = MqarConfig::new(128, 16, 64, 7, 0.5, 8, false);
//! let batch = SequenceGenerator::new(config)?.generate()?;
//!
//! assert_eq!(batch.inputs.dim(), (16, 64));
//! for row in batch.labels.rows() {
//!     assert_eq!(row.iter().filter(|&&l| l != IGNORE_INDEX).count(), 8);
//! }
//! # Ok::<(), mqar_dataset::MqarError>(())
//! ```

mod gap_sampler;
mod kv_sampler;
mod layout;
mod placer;

pub use gap_sampler::{power_law_weights, GapSampler};
pub use kv_sampler::{KeyValuePairs, KeyValueSampler};
pub use layout::assemble_context;
pub use placer::{fill_noise, place_queries};

use crate::config::MqarConfig;
use crate::error::Result;
use ndarray::Array2;

/// Execution settings that do not affect the generated values.
#[derive(Debug, Clone, Default)]
pub struct GeneratorOptions {
    /// Number of worker threads.
    ///
    /// - `None`: Use Rayon default (typically num_cpus)
    /// - `Some(n)`: Use exactly n threads
    pub num_threads: Option<usize>,
}

impl GeneratorOptions {
    /// Options with the rayon default thread count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of threads to use.
    ///
    /// # Panics
    ///
    /// Panics if threads is 0.
    pub fn with_threads(mut self, threads: usize) -> Self {
        assert!(threads > 0, "Thread count must be > 0");
        self.num_threads = Some(threads);
        self
    }

    /// Thread count that will actually be used.
    pub fn effective_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(rayon::current_num_threads)
    }
}

/// A generated batch: `inputs` and `labels`, both `(N, L)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqarBatch {
    /// Token ids fed to the model.
    pub inputs: Array2<i64>,
    /// Next-token targets, [`IGNORE_INDEX`](crate::IGNORE_INDEX) except at query positions.
    pub labels: Array2<i64>,
}

impl MqarBatch {
    /// Number of examples.
    pub fn num_examples(&self) -> usize {
        self.inputs.nrows()
    }

    /// Sequence length.
    pub fn seq_len(&self) -> usize {
        self.inputs.ncols()
    }

    /// Split into `(inputs, labels)`.
    pub fn into_parts(self) -> (Array2<i64>, Array2<i64>) {
        (self.inputs, self.labels)
    }
}

/// Generates MQAR batches for one validated configuration.
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    config: MqarConfig,
    options: GeneratorOptions,
}

impl SequenceGenerator {
    /// Validate `config` and build a generator for it.
    ///
    /// Nothing is allocated if the configuration is rejected.
    pub fn new(config: MqarConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            options: GeneratorOptions::default(),
        })
    }

    /// Replace the execution options.
    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    /// The configuration this generator was built with.
    pub fn config(&self) -> &MqarConfig {
        &self.config
    }

    /// The execution options in use.
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Generate the full batch on a local thread pool.
    pub fn generate(&self) -> Result<MqarBatch> {
        let threads = self.options.effective_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;

        log::debug!(
            "generating {} MQAR examples (V={}, L={}, K={}, a={}) on {} threads",
            self.config.num_examples,
            self.config.vocab_size,
            self.config.input_seq_len,
            self.config.num_kv_pairs,
            self.config.power_a,
            threads
        );

        pool.install(|| self.run_stages())
    }

    fn run_stages(&self) -> Result<MqarBatch> {
        let config = &self.config;
        let n = config.num_examples;
        let k = config.num_kv_pairs;

        let pairs = KeyValueSampler::new(config.vocab()).sample(n, k, config.seed)?;
        log::debug!("sampled key/value pairs {:?}", pairs.keys.dim());

        let context = assemble_context(&pairs.keys, &pairs.values)?;

        let gaps = GapSampler::new(config.space(), config.power_a).sample(n, k, config.seed)?;
        log::debug!("sampled query gaps over {} slots", config.space());

        let (mut inputs, labels) = place_queries(&context, &pairs, &gaps, config.input_seq_len)?;

        if config.fill_noise {
            fill_noise(&mut inputs, config.vocab_size, config.seed);
            log::debug!("filled blank inputs with noise");
        }

        Ok(MqarBatch { inputs, labels })
    }
}

/// Generate `(inputs, labels)` in one call.
///
/// Equivalent to building an [`MqarConfig`] and running a
/// [`SequenceGenerator`] with default options.
///
/// ```
/// use mqar_dataset::generate;
///
/// let (inputs, labels) = generate(12, 1, 16, 0, 1.0, 2, false)?;
/// assert_eq!(inputs.dim(), (1, 16));
/// assert_eq!(labels.dim(), (1, 16));
///
/// assert!(generate(12, 1, 15, 0, 1.0, 2, false).is_err());
/// # Ok::<(), mqar_dataset::MqarError>(())
/// ```
pub fn generate(
    vocab_size: usize,
    num_examples: usize,
    input_seq_len: usize,
    seed: u64,
    power_a: f64,
    num_kv_pairs: usize,
    fill_noise: bool,
) -> Result<(Array2<i64>, Array2<i64>)> {
    let config = MqarConfig::new(
        vocab_size,
        num_examples,
        input_seq_len,
        seed,
        power_a,
        num_kv_pairs,
        fill_noise,
    );
    Ok(SequenceGenerator::new(config)?.generate()?.into_parts())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, MqarError};
    use crate::vocab::{BLANK_TOKEN, IGNORE_INDEX};

    #[test]
    fn test_options_default_threads() {
        let options = GeneratorOptions::new();
        assert!(options.num_threads.is_none());
        assert_eq!(options.effective_threads(), rayon::current_num_threads());
        assert_eq!(GeneratorOptions::new().with_threads(3).effective_threads(), 3);
    }

    #[test]
    #[should_panic(expected = "Thread count must be > 0")]
    fn test_zero_threads_panics() {
        let _ = GeneratorOptions::new().with_threads(0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = MqarConfig::default().with_power_a(0.0);
        let err = SequenceGenerator::new(config).unwrap_err();
        assert!(matches!(
            err,
            MqarError::Config(ConfigError::InvalidPowerA { .. })
        ));
    }

    #[test]
    fn test_batch_shapes() {
        let config = MqarConfig::default().with_num_examples(32);
        let batch = SequenceGenerator::new(config).unwrap().generate().unwrap();
        assert_eq!(batch.num_examples(), 32);
        assert_eq!(batch.seq_len(), 64);
        assert_eq!(batch.labels.dim(), (32, 64));
    }

    #[test]
    fn test_context_then_blank_region() {
        let config = MqarConfig::new(64, 8, 32, 1, 0.5, 4, false);
        let batch = SequenceGenerator::new(config.clone()).unwrap().generate().unwrap();
        let vocab = config.vocab();

        for (inputs, labels) in batch.inputs.rows().into_iter().zip(batch.labels.rows()) {
            for c in 0..8 {
                if c % 2 == 0 {
                    assert!(vocab.is_key(inputs[c]));
                } else {
                    assert!(vocab.is_value(inputs[c]));
                }
                assert_eq!(labels[c], IGNORE_INDEX);
            }
            // Odd offsets from the start of the query region stay blank.
            for t in (9..32).step_by(2) {
                assert_eq!(inputs[t], BLANK_TOKEN);
            }
        }
    }

    #[test]
    fn test_thread_count_does_not_change_output() {
        let config = MqarConfig::new(256, 200, 128, 17, 0.1, 16, true);
        let single = SequenceGenerator::new(config.clone())
            .unwrap()
            .with_options(GeneratorOptions::new().with_threads(1))
            .generate()
            .unwrap();
        let many = SequenceGenerator::new(config)
            .unwrap()
            .with_options(GeneratorOptions::new().with_threads(4))
            .generate()
            .unwrap();
        assert_eq!(single, many);
    }

    #[test]
    fn test_generate_fn_matches_generator() {
        let (inputs, labels) = generate(64, 10, 64, 3, 0.01, 8, false).unwrap();
        let config = MqarConfig::new(64, 10, 64, 3, 0.01, 8, false);
        let batch = SequenceGenerator::new(config).unwrap().generate().unwrap();
        assert_eq!(inputs, batch.inputs);
        assert_eq!(labels, batch.labels);
    }
}
