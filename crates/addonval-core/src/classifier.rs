//! Error classification for validation and run messages.
//!
//! Every component that needs to know what a message *means* goes through
//! this module: [`classify`] maps text onto the closed [`ErrorType`]
//! taxonomy, [`categorize`] separates validation findings from transient and
//! runtime failures, and the extractors pull structured data (cycle chains,
//! missing input lists) out of classified messages.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Closed taxonomy of message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Success,
    UnexpectedConfig,
    MissingConfig,
    DependencyError,
    InputValidation,
    CircularDependency,
    General,
}

impl ErrorType {
    pub fn label(self) -> &'static str {
        match self {
            ErrorType::Success => "success",
            ErrorType::UnexpectedConfig => "unexpected config",
            ErrorType::MissingConfig => "missing config",
            ErrorType::DependencyError => "dependency error",
            ErrorType::InputValidation => "input validation",
            ErrorType::CircularDependency => "circular dependency",
            ErrorType::General => "general",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered match table; first hit wins.
const PATTERNS: &[(ErrorType, &[&str])] = &[
    (
        ErrorType::Success,
        &["actually deployed configs are same as expected deployed configs"],
    ),
    (
        ErrorType::UnexpectedConfig,
        &["unexpected config", "unexpected deployment", "deployed but not expected"],
    ),
    (
        ErrorType::MissingConfig,
        &["missing config", "missing deployment", "expected but not deployed"],
    ),
    (
        ErrorType::CircularDependency,
        &["circular dependency", "dependency cycle", "cycle detected"],
    ),
    (
        ErrorType::DependencyError,
        &[
            "dependency validation failed",
            "dependency error",
            "missing dependency",
            "unmet dependenc",
            "required dependency",
        ],
    ),
    (
        ErrorType::InputValidation,
        &[
            "missing required input",
            "required input",
            "invalid input",
            "input validation",
        ],
    ),
];

/// Classify a message. Matching is case-insensitive.
pub fn classify(message: &str) -> ErrorType {
    let lower = message.to_lowercase();
    PATTERNS
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ErrorType::General)
}

/// Whether a message is success noise that reports should drop.
pub fn should_filter(message: &str) -> bool {
    classify(message) == ErrorType::Success
}

/// Failure origin, per the run error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Deterministic given expected/actual state.
    Validation,
    /// Collaborator-side infrastructure trouble.
    Transient,
    /// Defect inside the run itself.
    Runtime,
}

const RUNTIME_NEEDLES: &[&str] = &[
    "panicked",
    "nil pointer dereference",
    "null pointer dereference",
    "index out of bounds",
    "called `option::unwrap()`",
    "called `result::unwrap()`",
];

const TRANSIENT_NEEDLES: &[&str] = &[
    "timeout",
    "timed out",
    "deadline exceeded",
    "rate limit",
    "too many requests",
    "connection reset",
    "connection refused",
    "temporarily unavailable",
    "service unavailable",
    "bad gateway",
    "gateway timeout",
    "internal server error",
];

/// Status codes count only next to `http`/`status`, so identifiers that
/// happen to contain `429` or `5xx` digits do not match.
fn retryable_status() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:http|status)(?:\s+code)?[\s:=]*(?:429|5\d\d)\b")
            .expect("valid status regex")
    })
}

/// Decide which bucket an opaque error message belongs in.
///
/// Typed errors carry their own category (see
/// [`CoreError::category`](crate::error::CoreError::category)); this is for
/// text with no structure left, such as collaborator messages from saved
/// reports.
pub fn categorize(message: &str) -> FailureCategory {
    let lower = message.to_lowercase();
    if RUNTIME_NEEDLES.iter().any(|n| lower.contains(n)) {
        FailureCategory::Runtime
    } else if TRANSIENT_NEEDLES.iter().any(|n| lower.contains(n))
        || retryable_status().is_match(&lower)
    {
        FailureCategory::Transient
    } else {
        FailureCategory::Validation
    }
}

fn circular_chain() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:circular dependency|dependency cycle|cycle detected)[^:]*:\s*(.+)$")
            .expect("valid cycle regex")
    })
}

/// Extract the chain (`a -> b -> a`) from a circular-dependency message.
///
/// Whitespace around arrows is normalised so identical chains compare equal.
pub fn extract_circular_chain(message: &str) -> Option<String> {
    if classify(message) != ErrorType::CircularDependency {
        return None;
    }
    let raw = circular_chain().captures(message.trim())?.get(1)?.as_str();
    let parts: Vec<&str> = raw
        .split("->")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 2 {
        return None;
    }
    Some(parts.join(" -> "))
}

fn missing_inputs_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?P<config>[^()]+?)\s*\((?P<offering>[^()]+)\)\s*:\s*missing required inputs?\s*:\s*(?P<inputs>.+)$")
            .expect("valid missing-inputs regex")
    })
}

/// A parsed `"<config> (<offering>): missing required inputs: a, b"` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingInputsLine {
    pub config_name: String,
    pub offering_name: String,
    pub inputs: Vec<String>,
}

/// Parse a configuration-error line reporting missing required inputs.
pub fn parse_missing_inputs(message: &str) -> Option<MissingInputsLine> {
    if classify(message) != ErrorType::InputValidation {
        return None;
    }
    let caps = missing_inputs_line().captures(message)?;
    let inputs: Vec<String> = caps["inputs"]
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if inputs.is_empty() {
        return None;
    }
    Some(MissingInputsLine {
        config_name: caps["config"].trim().to_string(),
        offering_name: caps["offering"].trim().to_string(),
        inputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VALIDATION_SUCCESS_MESSAGE;

    #[test]
    fn success_message_is_filtered() {
        assert_eq!(classify(VALIDATION_SUCCESS_MESSAGE), ErrorType::Success);
        assert!(should_filter(VALIDATION_SUCCESS_MESSAGE));
    }

    #[test]
    fn missing_required_inputs_is_input_validation() {
        assert_eq!(
            classify("missing required inputs: x"),
            ErrorType::InputValidation
        );
        assert!(!should_filter("missing required inputs: x"));
    }

    #[test]
    fn order_puts_missing_config_before_dependency() {
        assert_eq!(
            classify("missing configs caused dependency error"),
            ErrorType::MissingConfig
        );
        assert_eq!(
            classify("Circular dependency detected, dependency error follows"),
            ErrorType::CircularDependency
        );
        assert_eq!(
            classify("Found 2 unexpected configs deployed"),
            ErrorType::UnexpectedConfig
        );
    }

    #[test]
    fn unknown_text_falls_back_to_general() {
        assert_eq!(classify("something odd happened"), ErrorType::General);
        assert_eq!(classify(""), ErrorType::General);
    }

    #[test]
    fn categorize_splits_transient_and_runtime() {
        assert_eq!(
            categorize("request timed out after 30s"),
            FailureCategory::Transient
        );
        assert_eq!(
            categorize("HTTP 502 from projects API"),
            FailureCategory::Transient
        );
        assert_eq!(
            categorize("run panicked: index out of bounds"),
            FailureCategory::Runtime
        );
        assert_eq!(
            categorize("status code: 429 from catalog"),
            FailureCategory::Transient
        );
        assert_eq!(
            categorize("version not found for offering"),
            FailureCategory::Validation
        );
    }

    #[test]
    fn digits_inside_identifiers_are_not_status_codes() {
        assert_eq!(
            categorize("version not found: offering off-logs has no version with locator 1082e7d2-5429-4c1d-9e3a-0b1931fc.d4295b1e"),
            FailureCategory::Validation
        );
        assert_eq!(
            categorize("no version of off-cos satisfies '>=1.500.0' in flavor standard"),
            FailureCategory::Validation
        );
        assert_eq!(
            categorize("offering panic-button-dereference not found"),
            FailureCategory::Validation
        );
    }

    #[test]
    fn circular_chain_is_normalised() {
        let chain = extract_circular_chain("circular dependency detected: a ->b->  a");
        assert_eq!(chain.as_deref(), Some("a -> b -> a"));
        assert_eq!(extract_circular_chain("missing configs: 2"), None);
    }

    #[test]
    fn parse_missing_inputs_line() {
        let parsed =
            parse_missing_inputs("logs-cfg (cloud-logs): missing required inputs: cos_crn, kms_crn")
                .unwrap();
        assert_eq!(parsed.config_name, "logs-cfg");
        assert_eq!(parsed.offering_name, "cloud-logs");
        assert_eq!(parsed.inputs, vec!["cos_crn", "kms_crn"]);
        assert!(parse_missing_inputs("missing required inputs: x").is_none());
    }
}
