//! Reference model shared by every engine component.
//!
//! - [`OfferingIdentity`]: tuple identity of a deployable catalog entry
//! - [`ValidationResult`]: every finding of one validation pass
//! - [`RunResult`] / [`AggregateReport`]: permutation batch outcomes

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::FailureCategory;

pub use addonval_catalog::{DependencyDeclaration, UnitConfig};

/// Canonical message appended by a clean validation pass.
pub const VALIDATION_SUCCESS_MESSAGE: &str =
    "actually deployed configs are same as expected deployed configs";

/// Identity of one catalog entry: `(name, version, flavor)`.
///
/// Equality is structural and case-sensitive on all three fields. Used
/// directly as a map key; the `name:version:flavor` string form exists for
/// display only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfferingIdentity {
    pub name: String,
    pub version: String,
    pub flavor: String,
}

impl OfferingIdentity {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        flavor: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            flavor: flavor.into(),
        }
    }

    /// `name:version:flavor`.
    pub fn composite_key(&self) -> String {
        format!("{}:{}:{}", self.name, self.version, self.flavor)
    }
}

impl fmt::Display for OfferingIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.composite_key())
    }
}

/// Split a composite key on `:`.
///
/// Yields exactly three parts only when no field contains a colon. The
/// engine never parses keys back; this exists to pin down that limitation.
pub fn split_composite_key(key: &str) -> Vec<&str> {
    key.split(':').collect()
}

/// An edge whose target was not found among the deployed units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyError {
    pub unit: OfferingIdentity,
    pub missing_dependency: OfferingIdentity,
    /// Deployed entries sharing the missing dependency's name.
    pub available_alternatives: Vec<OfferingIdentity>,
}

/// A required input left without a value on a deployed config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MissingInput {
    pub config_name: String,
    pub offering_name: String,
    pub input_name: String,
}

/// Expected/actual count pair recorded when the lists differ in length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Every finding of one validation pass.
///
/// # Invariants
///
/// `is_valid` is `true` iff every error-bearing field is empty and
/// `count_mismatch` is `None`. `messages` holds the canonical success line
/// or one count summary per non-empty category; both are derived by
/// [`ValidationResult::finalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub dependency_errors: Vec<DependencyError>,
    pub unexpected_configs: Vec<OfferingIdentity>,
    pub missing_configs: Vec<OfferingIdentity>,
    pub missing_inputs: Vec<MissingInput>,
    pub configuration_errors: Vec<String>,
    pub messages: Vec<String>,
    #[serde(default)]
    pub count_mismatch: Option<CountMismatch>,
}

impl ValidationResult {
    /// Whether any error-bearing field is populated.
    pub fn has_errors(&self) -> bool {
        !self.dependency_errors.is_empty()
            || !self.unexpected_configs.is_empty()
            || !self.missing_configs.is_empty()
            || !self.missing_inputs.is_empty()
            || !self.configuration_errors.is_empty()
            || self.count_mismatch.is_some()
    }

    /// Recompute `is_valid` and regenerate the summary `messages`.
    pub fn finalize(&mut self) {
        self.is_valid = !self.has_errors();
        self.messages.clear();
        if self.is_valid {
            self.messages.push(VALIDATION_SUCCESS_MESSAGE.to_string());
            return;
        }
        if !self.dependency_errors.is_empty() {
            self.messages.push(format!(
                "dependency validation failed: {} unmet dependencies",
                self.dependency_errors.len()
            ));
        }
        if !self.unexpected_configs.is_empty() {
            self.messages.push(format!(
                "found {} unexpected configs deployed",
                self.unexpected_configs.len()
            ));
        }
        if !self.missing_configs.is_empty() {
            self.messages.push(format!(
                "found {} missing configs that were expected but not deployed",
                self.missing_configs.len()
            ));
        }
        if let Some(CountMismatch { expected, actual }) = self.count_mismatch {
            self.messages.push(format!(
                "deployed config count mismatch: expected {expected}, actual {actual}"
            ));
        }
        if !self.missing_inputs.is_empty() {
            let configs: BTreeSet<&str> = self
                .missing_inputs
                .iter()
                .map(|m| m.config_name.as_str())
                .collect();
            self.messages.push(format!(
                "missing required inputs: {} inputs across {} configs",
                self.missing_inputs.len(),
                configs.len()
            ));
        }
    }

    /// Merge missing-input findings and re-derive validity.
    ///
    /// Adds one configuration-error line per affected config.
    pub fn record_missing_inputs(&mut self, missing: &[MissingInput]) {
        if missing.is_empty() {
            return;
        }
        let mut by_config: Vec<(&str, &str, Vec<&str>)> = Vec::new();
        for m in missing {
            match by_config
                .iter_mut()
                .find(|(c, o, _)| *c == m.config_name && *o == m.offering_name)
            {
                Some((_, _, inputs)) => inputs.push(&m.input_name),
                None => by_config.push((&m.config_name, &m.offering_name, vec![&m.input_name])),
            }
        }
        for (config, offering, inputs) in by_config {
            self.configuration_errors.push(format!(
                "{config} ({offering}): missing required inputs: {}",
                inputs.join(", ")
            ));
        }
        self.missing_inputs.extend(missing.iter().cloned());
        self.finalize();
    }
}

/// Outcome of one permutation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub name: String,
    pub prefix: String,
    pub unit_config: UnitConfig,
    pub passed: bool,
    /// `None` when the run failed before validation.
    #[serde(default)]
    pub validation_result: Option<ValidationResult>,
    /// Pre-validation failures (unresolvable offering or version).
    #[serde(default)]
    pub resolution_errors: Vec<String>,
    #[serde(default)]
    pub transient_errors: Vec<String>,
    #[serde(default)]
    pub runtime_errors: Vec<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl RunResult {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>, unit_config: UnitConfig) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            unit_config,
            ..Self::default()
        }
    }

    /// File a failure message under its category's bucket.
    ///
    /// Validation-category failures seen outside the validator are
    /// pre-validation resolution failures.
    pub fn record_failure(&mut self, category: FailureCategory, message: String) {
        match category {
            FailureCategory::Runtime => self.runtime_errors.push(message),
            FailureCategory::Transient => self.transient_errors.push(message),
            FailureCategory::Validation => self.resolution_errors.push(message),
        }
    }

    /// Root-level dependency names the run disabled.
    pub fn disabled_dependencies(&self) -> BTreeSet<String> {
        self.unit_config
            .disabled_dependency_names()
            .into_iter()
            .collect()
    }

    /// Whether validation ran and found problems.
    pub fn has_validation_failure(&self) -> bool {
        self.validation_result
            .as_ref()
            .is_some_and(|v| !v.is_valid)
    }

    /// Whether the only failure signals are transient or runtime errors.
    pub fn failed_only_on_infrastructure(&self) -> bool {
        !self.passed
            && !self.has_validation_failure()
            && self.resolution_errors.is_empty()
            && (!self.transient_errors.is_empty() || !self.runtime_errors.is_empty())
    }

    /// Every free-text message attached to the run, in a stable order.
    pub fn all_messages(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        if let Some(v) = &self.validation_result {
            out.extend(v.messages.iter().map(String::as_str));
            out.extend(v.configuration_errors.iter().map(String::as_str));
        }
        out.extend(self.resolution_errors.iter().map(String::as_str));
        out.extend(self.transient_errors.iter().map(String::as_str));
        out.extend(self.runtime_errors.iter().map(String::as_str));
        out
    }

    /// Short description of the addon under test and its overrides.
    pub fn addon_summary(&self) -> String {
        let cfg = &self.unit_config;
        let mut summary = format!("{} ({})", cfg.offering_name, cfg.offering_flavor);
        let disabled = cfg.disabled_dependency_names();
        if !disabled.is_empty() {
            summary.push_str(&format!(" disabled: [{}]", disabled.join(", ")));
        }
        summary
    }
}

/// Collected outcomes of one permutation batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub batch_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub total_runs: usize,
    pub passed_runs: usize,
    pub failed_runs: usize,
    pub results: Vec<RunResult>,
}

impl AggregateReport {
    pub fn from_results(results: Vec<RunResult>) -> Self {
        let total_runs = results.len();
        let passed_runs = results.iter().filter(|r| r.passed).count();
        Self {
            batch_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            total_runs,
            passed_runs,
            failed_runs: total_runs - passed_runs,
            results,
        }
    }

    /// Pass rate as a percentage; `0.0` for an empty batch.
    pub fn pass_rate(&self) -> f64 {
        if self.total_runs == 0 {
            0.0
        } else {
            self.passed_runs as f64 * 100.0 / self.total_runs as f64
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}
