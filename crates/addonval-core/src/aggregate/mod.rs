//! Permutation batch aggregation.
//!
//! [`aggregate`] turns a batch of independent [`RunResult`]s into one
//! [`AggregateAnalysis`]: a structured report per failed run, root-cause
//! patterns for recurring missing inputs, recurring validation findings,
//! action items and a completeness check. Rendering lives in [`report`].

mod patterns;
pub mod report;

pub use patterns::{
    action_items, error_distribution, mine_root_causes, mine_validation_patterns, Confidence,
    RootCausePattern, ValidationPattern,
};
pub use report::{
    read_report_json, render_batch_report, render_failure_report, write_report_json,
    ReportArtifact,
};

use serde::{Deserialize, Serialize};

use crate::classifier::{parse_missing_inputs, should_filter, ErrorType};
use crate::model::{AggregateReport, RunResult};

/// Batch-level counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_runs: usize,
    pub passed_runs: usize,
    pub failed_runs: usize,
    pub pass_rate: f64,
    pub error_distribution: Vec<ErrorCount>,
    /// Failed runs whose only signal was a transient or runtime error.
    pub infrastructure_failures: usize,
    /// Failed runs that never reached validation.
    pub resolution_failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCount {
    pub error_type: ErrorType,
    pub count: usize,
}

/// One titled bullet list inside a failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub lines: Vec<String>,
}

/// Structured per-run failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub name: String,
    pub prefix: String,
    pub addon: String,
    pub sections: Vec<ReportSection>,
}

/// Whether the patterns account for every failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completeness {
    pub failed_runs: usize,
    pub accounted_runs: usize,
    pub unexplained_runs: Vec<String>,
    /// Set when `accounted_runs < failed_runs`.
    pub notice: Option<String>,
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        self.notice.is_none()
    }
}

/// Everything derived from one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateAnalysis {
    pub summary: BatchSummary,
    pub failure_reports: Vec<FailureReport>,
    pub root_cause_patterns: Vec<RootCausePattern>,
    pub validation_patterns: Vec<ValidationPattern>,
    pub action_items: Vec<String>,
    pub completeness: Completeness,
}

/// Analyse a batch.
pub fn aggregate(report: &AggregateReport) -> AggregateAnalysis {
    let failed: Vec<&RunResult> = report.failed().collect();

    let root_cause_patterns = mine_root_causes(failed.iter().copied());
    let validation_patterns = mine_validation_patterns(failed.iter().copied());
    let action_items = action_items(&root_cause_patterns, &validation_patterns);

    let infrastructure_failures = failed
        .iter()
        .filter(|r| r.failed_only_on_infrastructure())
        .count();
    let resolution_failures = failed
        .iter()
        .filter(|r| !r.resolution_errors.is_empty())
        .count();

    let summary = BatchSummary {
        total_runs: report.total_runs,
        passed_runs: report.passed_runs,
        failed_runs: report.failed_runs,
        pass_rate: report.pass_rate(),
        error_distribution: error_distribution(failed.iter().copied())
            .into_iter()
            .map(|(error_type, count)| ErrorCount { error_type, count })
            .collect(),
        infrastructure_failures,
        resolution_failures,
    };

    let completeness = check_completeness(report.failed_runs, &failed);

    AggregateAnalysis {
        summary,
        failure_reports: failed.iter().map(|r| failure_report(r)).collect(),
        root_cause_patterns,
        validation_patterns,
        action_items,
        completeness,
    }
}

/// Runs are matched by position in `failed`, never by name: generated
/// names are not guaranteed unique.
fn check_completeness(failed_runs: usize, failed: &[&RunResult]) -> Completeness {
    let unexplained_runs: Vec<String> = failed
        .iter()
        .filter(|r| {
            !(patterns::contributes_to_patterns(r)
                || r.failed_only_on_infrastructure()
                || !r.resolution_errors.is_empty())
        })
        .map(|r| r.name.clone())
        .collect();
    let accounted_runs = failed_runs.saturating_sub(unexplained_runs.len());
    let notice = (accounted_runs < failed_runs).then(|| {
        format!(
            "analysis incomplete: {} of {} failed runs are not explained by any pattern ({})",
            failed_runs - accounted_runs,
            failed_runs,
            unexplained_runs.join(", ")
        )
    });

    Completeness {
        failed_runs,
        accounted_runs,
        unexplained_runs,
        notice,
    }
}

fn section(title: &str, lines: Vec<String>) -> Option<ReportSection> {
    (!lines.is_empty()).then(|| ReportSection {
        title: title.to_string(),
        lines,
    })
}

/// Build the structured report of one failed run.
pub fn failure_report(run: &RunResult) -> FailureReport {
    let mut sections = Vec::new();

    if let Some(v) = &run.validation_result {
        let mut by_config: Vec<(String, Vec<String>)> = Vec::new();
        for m in &v.missing_inputs {
            let key = format!("{} ({})", m.config_name, m.offering_name);
            match by_config.iter_mut().find(|(k, _)| *k == key) {
                Some((_, inputs)) => inputs.push(m.input_name.clone()),
                None => by_config.push((key, vec![m.input_name.clone()])),
            }
        }
        sections.extend(section(
            "Missing required inputs",
            by_config
                .into_iter()
                .map(|(config, inputs)| format!("{config}: {}", inputs.join(", ")))
                .collect(),
        ));

        sections.extend(section(
            "Dependency errors",
            v.dependency_errors
                .iter()
                .map(|e| {
                    if e.available_alternatives.is_empty() {
                        format!("{} requires {} (not deployed in any version)", e.unit, e.missing_dependency)
                    } else {
                        let alts: Vec<String> =
                            e.available_alternatives.iter().map(|a| a.to_string()).collect();
                        format!(
                            "{} requires {} (deployed instead: {})",
                            e.unit,
                            e.missing_dependency,
                            alts.join(", ")
                        )
                    }
                })
                .collect(),
        ));
        sections.extend(section(
            "Unexpected configs",
            v.unexpected_configs.iter().map(|c| c.to_string()).collect(),
        ));
        sections.extend(section(
            "Missing configs",
            v.missing_configs.iter().map(|c| c.to_string()).collect(),
        ));

        // Missing-input lines are already listed above when structured.
        let structured = !v.missing_inputs.is_empty();
        sections.extend(section(
            "Configuration errors",
            v.configuration_errors
                .iter()
                .filter(|l| !should_filter(l))
                .filter(|l| !(structured && parse_missing_inputs(l).is_some()))
                .cloned()
                .collect(),
        ));
        sections.extend(section(
            "Validation messages",
            v.messages.iter().filter(|m| !should_filter(m)).cloned().collect(),
        ));
    }

    sections.extend(section("Resolution errors", run.resolution_errors.clone()));
    sections.extend(section("Transient errors", run.transient_errors.clone()));
    sections.extend(section("Runtime errors", run.runtime_errors.clone()));

    FailureReport {
        name: run.name.clone(),
        prefix: run.prefix.clone(),
        addon: run.addon_summary(),
        sections,
    }
}
