//! Batch Validation Module
//!
//! Re-checks a generated batch against its configuration using only the
//! final `inputs` and `labels` arrays. Useful as a sanity pass before a
//! dataset is written to disk, and as an oracle in tests.
//!
//! # Checks
//!
//! 1. **Shape**: both arrays are `(N, L)`
//! 2. **Token ranges**: inputs in `[0, V)`, labels in the value vocabulary or ignored
//! 3. **Context block**: keys at even positions, values at odd, unique per row
//! 4. **Label sparsity**: exactly `K` labelled positions per row
//! 5. **Query placement**: labelled positions sit at even offsets in the query region
//! 6. **Pairing**: each query's label is the value paired with its key
//! 7. **Blank fill**: everything else is blank when noise is off
//!
//! # Usage
//!
//! ```
//! use mqar_dataset::validation::BatchValidator;
//! use mqar_dataset::{MqarConfig, SequenceGenerator};
//!
//! let config = MqarConfig::default().with_num_examples(64);
//! let batch = SequenceGenerator::new(config.clone())?.generate()?;
//!
//! let result = BatchValidator::new().validate(&batch, &config);
//! assert!(result.is_valid(), "{result}");
//! # Ok::<(), mqar_dataset::MqarError>(())
//! ```

use crate::config::MqarConfig;
use crate::generator::MqarBatch;
use crate::vocab::{BLANK_TOKEN, IGNORE_INDEX};
use ndarray::ArrayView1;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Validation result for a single check.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    /// Batch satisfies the check
    Valid,
    /// Suspicious but not wrong
    Warning(String),
    /// Batch violates the check
    Error(String),
}

impl ValidationLevel {
    /// Check if this result indicates valid data.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationLevel::Valid)
    }

    /// Check if this result is a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationLevel::Warning(_))
    }

    /// Check if this result is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, ValidationLevel::Error(_))
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Valid => write!(f, "Valid"),
            ValidationLevel::Warning(msg) => write!(f, "Warning: {msg}"),
            ValidationLevel::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Aggregated validation result.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    results: Vec<(String, ValidationLevel)>,
}

impl ValidationResult {
    /// Create a new empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation result.
    pub fn add(&mut self, check_name: &str, level: ValidationLevel) {
        self.results.push((check_name.to_string(), level));
    }

    /// Check if all validations passed (no errors or warnings).
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|(_, level)| level.is_valid())
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_error())
    }

    /// Check if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_warning())
    }

    /// All warnings as `"check: message"`.
    pub fn warnings(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Warning(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    /// All errors as `"check: message"`.
    pub fn errors(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Error(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    /// Level recorded for `check_name`, if that check ran.
    pub fn level(&self, check_name: &str) -> Option<&ValidationLevel> {
        self.results
            .iter()
            .find(|(name, _)| name == check_name)
            .map(|(_, level)| level)
    }

    /// Get all results.
    pub fn all_results(&self) -> &[(String, ValidationLevel)] {
        &self.results
    }

    /// Get the number of checks performed.
    pub fn check_count(&self) -> usize {
        self.results.len()
    }

    /// Get the number of passed checks.
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|(_, l)| l.is_valid()).count()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passed = self.passed_count();
        let total = self.check_count();
        writeln!(f, "Validation: {passed}/{total} checks passed")?;

        for (name, level) in &self.results {
            if !level.is_valid() {
                writeln!(f, "  - {name}: {level}")?;
            }
        }

        Ok(())
    }
}

/// Configuration for batch validation.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Only inspect the first `n` rows (`None` = all rows)
    pub max_rows: Option<usize>,

    /// Check that every label matches the value paired with its query key
    pub check_pairing: bool,

    /// Check that non-context, non-query inputs are blank (skipped when noise is on)
    pub check_blank_fill: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_rows: None,
            check_pairing: true,
            check_blank_fill: true,
        }
    }
}

/// Validator for generated MQAR batches.
#[derive(Debug, Clone, Default)]
pub struct BatchValidator {
    config: ValidationConfig,
}

impl BatchValidator {
    /// Create a new validator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with custom configuration.
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate `batch` against the configuration that produced it.
    pub fn validate(&self, batch: &MqarBatch, config: &MqarConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        let expected = (config.num_examples, config.input_seq_len);
        let shape = if batch.inputs.dim() != expected {
            ValidationLevel::Error(format!(
                "inputs are {:?}, expected {expected:?}",
                batch.inputs.dim()
            ))
        } else if batch.labels.dim() != expected {
            ValidationLevel::Error(format!(
                "labels are {:?}, expected {expected:?}",
                batch.labels.dim()
            ))
        } else {
            ValidationLevel::Valid
        };
        let shape_ok = shape.is_valid();
        result.add("shape", shape);
        if !shape_ok {
            self.log_findings(&result);
            return result;
        }

        let rows = self
            .config
            .max_rows
            .map_or(batch.num_examples(), |m| m.min(batch.num_examples()));
        if rows == 0 {
            result.add("rows", ValidationLevel::Warning("batch has no examples".into()));
        }

        let vocab = config.vocab();
        let vocab_size = config.vocab_size as i64;
        let context_size = config.context_size();
        let num_pairs = config.num_kv_pairs;

        result.add(
            "token_range",
            per_row(batch, rows, |inputs, labels| {
                if let Some(t) = inputs.iter().position(|&x| !(0..vocab_size).contains(&x)) {
                    return Some(format!("input {} at position {t} outside [0, {vocab_size})", inputs[t]));
                }
                labels
                    .iter()
                    .position(|&y| y != IGNORE_INDEX && !vocab.is_value(y))
                    .map(|t| format!("label {} at position {t} is not a value token", labels[t]))
            }),
        );

        result.add(
            "context_keys",
            per_row(batch, rows, |inputs, _| {
                let keys: Vec<i64> = (0..context_size).step_by(2).map(|c| inputs[c]).collect();
                if let Some(&k) = keys.iter().find(|&&k| !vocab.is_key(k)) {
                    return Some(format!("context key {k} outside the key vocabulary"));
                }
                has_duplicate(&keys).map(|k| format!("key {k} appears twice in the context"))
            }),
        );

        result.add(
            "context_values",
            per_row(batch, rows, |inputs, _| {
                let values: Vec<i64> = (1..context_size).step_by(2).map(|c| inputs[c]).collect();
                if let Some(&v) = values.iter().find(|&&v| !vocab.is_value(v)) {
                    return Some(format!("context value {v} outside the value vocabulary"));
                }
                has_duplicate(&values).map(|v| format!("value {v} appears twice in the context"))
            }),
        );

        result.add(
            "label_sparsity",
            per_row(batch, rows, |_, labels| {
                let count = labels.iter().filter(|&&y| y != IGNORE_INDEX).count();
                (count != num_pairs).then(|| format!("{count} labelled positions, expected {num_pairs}"))
            }),
        );

        result.add(
            "query_placement",
            per_row(batch, rows, |_, labels| {
                query_positions(labels)
                    .find(|&t| t < context_size || (t - context_size) % 2 != 0)
                    .map(|t| format!("label at position {t} is not a query slot"))
            }),
        );

        if self.config.check_pairing {
            result.add(
                "pairing",
                per_row(batch, rows, |inputs, labels| {
                    let pairs: HashMap<i64, i64> = (0..num_pairs)
                        .map(|j| (inputs[2 * j], inputs[2 * j + 1]))
                        .collect();
                    let mut queried = HashSet::new();
                    for t in query_positions(labels) {
                        let key = inputs[t];
                        match pairs.get(&key) {
                            Some(&value) if value == labels[t] => {}
                            Some(&value) => {
                                return Some(format!(
                                    "query {key} at position {t} labelled {}, context pairs it with {value}",
                                    labels[t]
                                ))
                            }
                            None => return Some(format!("query {key} at position {t} is not a context key")),
                        }
                        if !queried.insert(key) {
                            return Some(format!("key {key} queried twice"));
                        }
                    }
                    None
                }),
            );
        }

        if self.config.check_blank_fill && !config.fill_noise {
            result.add(
                "blank_fill",
                per_row(batch, rows, |inputs, labels| {
                    (context_size..inputs.len())
                        .find(|&t| labels[t] == IGNORE_INDEX && inputs[t] != BLANK_TOKEN)
                        .map(|t| format!("position {t} holds {} instead of blank", inputs[t]))
                }),
            );
        }

        self.log_findings(&result);
        result
    }

    fn log_findings(&self, result: &ValidationResult) {
        for (name, level) in result.all_results() {
            if !level.is_valid() {
                log::warn!("batch validation {name}: {level}");
            }
        }
    }
}

/// Run `check` on the first `rows` rows; report how many failed and the first message.
fn per_row<F>(batch: &MqarBatch, rows: usize, mut check: F) -> ValidationLevel
where
    F: FnMut(ArrayView1<'_, i64>, ArrayView1<'_, i64>) -> Option<String>,
{
    let mut failures = 0usize;
    let mut first = None;

    for row in 0..rows {
        if let Some(msg) = check(batch.inputs.row(row), batch.labels.row(row)) {
            failures += 1;
            first.get_or_insert_with(|| format!("row {row}: {msg}"));
        }
    }

    match first {
        None => ValidationLevel::Valid,
        Some(msg) => ValidationLevel::Error(format!("{failures} row(s) failed, first {msg}")),
    }
}

fn query_positions<'a>(labels: ArrayView1<'a, i64>) -> impl Iterator<Item = usize> + 'a {
    labels
        .into_iter()
        .enumerate()
        .filter(|&(_, &y)| y != IGNORE_INDEX)
        .map(|(t, _)| t)
}

fn has_duplicate(tokens: &[i64]) -> Option<i64> {
    let mut seen = HashSet::with_capacity(tokens.len());
    tokens.iter().copied().find(|&t| !seen.insert(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::SequenceGenerator;

    fn sample(config: &MqarConfig) -> MqarBatch {
        SequenceGenerator::new(config.clone()).unwrap().generate().unwrap()
    }

    #[test]
    fn test_generated_batch_is_valid() {
        let config = MqarConfig::new(128, 50, 64, 3, 0.1, 12, false);
        let result = BatchValidator::new().validate(&sample(&config), &config);
        assert!(result.is_valid(), "{result}");
        assert_eq!(result.check_count(), 8);
    }

    #[test]
    fn test_noise_batch_skips_blank_check() {
        let config = MqarConfig::new(64, 20, 64, 3, 0.5, 8, true);
        let result = BatchValidator::new().validate(&sample(&config), &config);
        assert!(result.is_valid(), "{result}");
        assert!(result.level("blank_fill").is_none());
    }

    #[test]
    fn test_detects_broken_pairing() {
        let config = MqarConfig::new(64, 4, 32, 0, 1.0, 4, false);
        let mut batch = sample(&config);

        // Swap the first two context values in row 2.
        let (v0, v1) = (batch.inputs[[2, 1]], batch.inputs[[2, 3]]);
        batch.inputs[[2, 1]] = v1;
        batch.inputs[[2, 3]] = v0;

        let result = BatchValidator::new().validate(&batch, &config);
        assert!(result.level("pairing").unwrap().is_error());
        assert!(result.level("context_values").unwrap().is_valid());
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].contains("row 2"));
    }

    #[test]
    fn test_detects_extra_label() {
        let config = MqarConfig::new(64, 2, 32, 0, 1.0, 2, false);
        let mut batch = sample(&config);
        batch.labels[[0, 1]] = 40;

        let result = BatchValidator::new().validate(&batch, &config);
        assert!(result.level("label_sparsity").unwrap().is_error());
        assert!(result.level("query_placement").unwrap().is_error());
    }

    #[test]
    fn test_detects_stray_token() {
        let config = MqarConfig::new(64, 2, 32, 0, 1.0, 2, false);
        let mut batch = sample(&config);
        let last = config.input_seq_len - 1;
        batch.inputs[[1, last]] = 7;

        let result = BatchValidator::new().validate(&batch, &config);
        assert!(result.level("blank_fill").unwrap().is_error());
    }

    #[test]
    fn test_shape_mismatch_stops_early() {
        let config = MqarConfig::new(64, 3, 32, 0, 1.0, 2, false);
        let batch = sample(&config);
        let other = config.clone().with_num_examples(4);

        let result = BatchValidator::new().validate(&batch, &other);
        assert!(result.has_errors());
        assert_eq!(result.check_count(), 1);
    }

    #[test]
    fn test_max_rows_limits_scan() {
        let config = MqarConfig::new(64, 4, 32, 0, 1.0, 2, false);
        let mut batch = sample(&config);
        batch.inputs[[3, 31]] = 9;

        let validator = BatchValidator::with_config(ValidationConfig {
            max_rows: Some(3),
            ..Default::default()
        });
        assert!(validator.validate(&batch, &config).is_valid());
    }

    #[test]
    fn test_result_display() {
        let mut result = ValidationResult::new();
        result.add("a", ValidationLevel::Valid);
        result.add("b", ValidationLevel::Warning("odd".into()));
        let text = result.to_string();
        assert!(text.contains("1/2 checks passed"));
        assert!(text.contains("b: Warning: odd"));
        assert_eq!(result.warnings(), vec!["b: odd".to_string()]);
    }
}
