//! Cross-run pattern mining over failed runs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::classifier::{classify, extract_circular_chain, parse_missing_inputs, ErrorType};
use crate::model::RunResult;

/// Confidence attached to a suspected root cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Unknown,
}

/// Recurring missing input correlated with the runs' disabled dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootCausePattern {
    pub offering_name: String,
    pub input_name: String,
    pub count: usize,
    pub run_names: Vec<String>,
    /// Dependency names disabled in every contributing run.
    pub common_disabled: Vec<String>,
    pub suspected_root_cause: Option<String>,
    pub confidence: Confidence,
}

/// A validation finding that recurs across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPattern {
    pub error_type: ErrorType,
    pub pattern: String,
    pub count: usize,
    pub run_names: Vec<String>,
}

/// Tokens shared by input names and the offerings that supply them.
const CORRELATION_KEYWORDS: &[&str] = &[
    "cos",
    "kms",
    "logs",
    "monitoring",
    "atracker",
    "event_notifications",
    "secrets_manager",
    "scc",
    "vpc",
    "hpcs",
];

fn normalize(name: &str) -> String {
    name.to_lowercase().replace('-', "_")
}

fn correlates(input_name: &str, candidate: &str) -> bool {
    let input = normalize(input_name);
    let candidate = normalize(candidate);
    if input.contains(&candidate) {
        return true;
    }
    CORRELATION_KEYWORDS
        .iter()
        .any(|kw| input.contains(kw) && candidate.contains(kw))
}

/// Pick a root cause from the disabled dependencies common to a group.
fn suspect(input_name: &str, common: &BTreeSet<String>) -> (Option<String>, Confidence) {
    match common.len() {
        0 => (None, Confidence::Unknown),
        1 => (common.iter().next().cloned(), Confidence::High),
        _ => {
            let matches: Vec<&String> = common.iter().filter(|c| correlates(input_name, c)).collect();
            match matches.as_slice() {
                [only] => (Some((*only).clone()), Confidence::High),
                _ => (None, Confidence::Unknown),
            }
        }
    }
}

/// `(offering, input)` pairs a run reported as missing.
fn missing_input_pairs(run: &RunResult) -> BTreeSet<(String, String)> {
    let mut pairs = BTreeSet::new();
    let Some(validation) = &run.validation_result else {
        return pairs;
    };
    for m in &validation.missing_inputs {
        pairs.insert((m.offering_name.clone(), m.input_name.clone()));
    }
    // Saved results may only carry the rendered lines.
    for line in &validation.configuration_errors {
        if let Some(parsed) = parse_missing_inputs(line) {
            for input in parsed.inputs {
                pairs.insert((parsed.offering_name.clone(), input));
            }
        }
    }
    pairs
}

/// Whether a failed run feeds at least one root-cause or validation pattern.
pub(crate) fn contributes_to_patterns(run: &RunResult) -> bool {
    !missing_input_pairs(run).is_empty() || !validation_findings(run).is_empty()
}

/// Group missing inputs across failed runs and intersect their disabled sets.
pub fn mine_root_causes<'a>(failed: impl IntoIterator<Item = &'a RunResult>) -> Vec<RootCausePattern> {
    let mut groups: BTreeMap<(String, String), Vec<&RunResult>> = BTreeMap::new();
    for run in failed {
        for pair in missing_input_pairs(run) {
            groups.entry(pair).or_default().push(run);
        }
    }

    let mut patterns: Vec<RootCausePattern> = groups
        .into_iter()
        .map(|((offering_name, input_name), runs)| {
            let mut common: Option<BTreeSet<String>> = None;
            for run in &runs {
                let disabled = run.disabled_dependencies();
                common = Some(match common {
                    None => disabled,
                    Some(acc) => acc.intersection(&disabled).cloned().collect(),
                });
            }
            let common = common.unwrap_or_default();
            let (suspected_root_cause, confidence) = suspect(&input_name, &common);
            RootCausePattern {
                offering_name,
                input_name,
                count: runs.len(),
                run_names: runs.iter().map(|r| r.name.clone()).collect(),
                common_disabled: common.into_iter().collect(),
                suspected_root_cause,
                confidence,
            }
        })
        .collect();

    patterns.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.offering_name.cmp(&b.offering_name))
            .then_with(|| a.input_name.cmp(&b.input_name))
    });
    patterns
}

/// Distinct `(type, text)` findings of one run.
fn validation_findings(run: &RunResult) -> BTreeSet<(ErrorType, String)> {
    let mut findings = BTreeSet::new();
    if let Some(v) = &run.validation_result {
        for e in &v.dependency_errors {
            findings.insert((
                ErrorType::DependencyError,
                format!("{} requires {}", e.unit, e.missing_dependency),
            ));
        }
        for u in &v.unexpected_configs {
            findings.insert((ErrorType::UnexpectedConfig, u.composite_key()));
        }
        for m in &v.missing_configs {
            findings.insert((ErrorType::MissingConfig, m.composite_key()));
        }
    }
    for message in run.all_messages() {
        if let Some(chain) = extract_circular_chain(message) {
            findings.insert((ErrorType::CircularDependency, chain));
        }
    }
    findings
}

/// Count recurring validation findings, most frequent first.
pub fn mine_validation_patterns<'a>(
    failed: impl IntoIterator<Item = &'a RunResult>,
) -> Vec<ValidationPattern> {
    let mut groups: BTreeMap<(ErrorType, String), Vec<String>> = BTreeMap::new();
    for run in failed {
        for key in validation_findings(run) {
            groups.entry(key).or_default().push(run.name.clone());
        }
    }
    let mut patterns: Vec<ValidationPattern> = groups
        .into_iter()
        .map(|((error_type, pattern), run_names)| ValidationPattern {
            error_type,
            pattern,
            count: run_names.len(),
            run_names,
        })
        .collect();
    patterns.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.error_type.cmp(&b.error_type))
            .then_with(|| a.pattern.cmp(&b.pattern))
    });
    patterns
}

/// One recommendation per root-cause and per circular-dependency pattern.
pub fn action_items(roots: &[RootCausePattern], validation: &[ValidationPattern]) -> Vec<String> {
    let mut items = Vec::new();
    for p in roots {
        match (&p.suspected_root_cause, p.confidence) {
            (Some(cause), Confidence::High) => items.push(format!(
                "Set input '{}' on {} when '{}' is disabled, or declare '{}' as a required dependency ({} runs affected)",
                p.input_name, p.offering_name, cause, cause, p.count
            )),
            _ => items.push(format!(
                "Investigate missing input '{}' on {}: no single disabled dependency explains it ({} runs affected)",
                p.input_name, p.offering_name, p.count
            )),
        }
    }
    for p in validation
        .iter()
        .filter(|p| p.error_type == ErrorType::CircularDependency)
    {
        items.push(format!(
            "Break the circular dependency {} in the catalog metadata ({} runs affected)",
            p.pattern, p.count
        ));
    }
    items
}

/// Histogram of classified messages across failed runs, success filtered.
pub fn error_distribution<'a>(
    failed: impl IntoIterator<Item = &'a RunResult>,
) -> BTreeMap<ErrorType, usize> {
    let mut counts = BTreeMap::new();
    for run in failed {
        let mut messages: Vec<&str> = Vec::new();
        if let Some(v) = &run.validation_result {
            messages.extend(v.messages.iter().map(String::as_str));
            // The summary message already counts structured missing inputs.
            let summarised = !v.missing_inputs.is_empty();
            messages.extend(
                v.configuration_errors
                    .iter()
                    .filter(|l| !(summarised && parse_missing_inputs(l).is_some()))
                    .map(String::as_str),
            );
        }
        messages.extend(run.resolution_errors.iter().map(String::as_str));
        for kind in messages.into_iter().map(classify) {
            if kind != ErrorType::Success {
                *counts.entry(kind).or_insert(0) += 1;
            }
        }
    }
    counts
}
