//! Text and JSON renderings of a batch.
//!
//! The batch report is emitted in a fixed section order that log consumers
//! grep for: summary, passed count, failed details, error distribution,
//! aggregated analysis.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{aggregate, AggregateAnalysis, Confidence, FailureReport};
use crate::model::AggregateReport;

const BOX_WIDTH: usize = 78;

pub const SECTION_SUMMARY: &str = "=== BATCH SUMMARY ===";
pub const SECTION_PASSED: &str = "=== PASSED ===";
pub const SECTION_FAILED: &str = "=== FAILED RUN DETAILS ===";
pub const SECTION_DISTRIBUTION: &str = "=== ERROR DISTRIBUTION ===";
pub const SECTION_ANALYSIS: &str = "=== AGGREGATED ANALYSIS ===";

/// Persisted form of a batch: raw results plus the derived analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportArtifact {
    pub schema_version: String,
    pub report: AggregateReport,
    pub analysis: AggregateAnalysis,
}

impl ReportArtifact {
    pub fn new(report: AggregateReport) -> Self {
        let analysis = aggregate(&report);
        Self {
            schema_version: "1.0".to_string(),
            report,
            analysis,
        }
    }
}

/// Write the batch report and its analysis as pretty JSON.
pub fn write_report_json(path: &Path, artifact: &ReportArtifact) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact).context("serialize batch report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Read a report written by [`write_report_json`].
pub fn read_report_json(path: &Path) -> Result<ReportArtifact> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    let artifact = serde_json::from_str(&raw).with_context(|| format!("parse {:?}", path))?;
    Ok(artifact)
}

fn boxed_line(out: &mut String, text: &str) {
    let inner = BOX_WIDTH - 4;
    let mut line: String = text.chars().take(inner).collect();
    let pad = inner.saturating_sub(line.chars().count());
    line.push_str(&" ".repeat(pad));
    out.push_str(&format!("║ {line} ║\n"));
}

/// Render one failed run as a bordered block.
pub fn render_failure_report(report: &FailureReport) -> String {
    let rule = "═".repeat(BOX_WIDTH - 2);
    let mut out = String::new();
    out.push_str(&format!("╔{rule}╗\n"));
    boxed_line(&mut out, &format!("FAILED: {}", report.name));
    boxed_line(&mut out, &format!("prefix: {}", report.prefix));
    boxed_line(&mut out, &format!("addon:  {}", report.addon));
    out.push_str(&format!("╚{rule}╝\n"));
    for section in &report.sections {
        out.push_str(&format!("  {}:\n", section.title));
        for line in &section.lines {
            out.push_str(&format!("    • {line}\n"));
        }
    }
    out
}

/// Render the full batch report.
pub fn render_batch_report(report: &AggregateReport, analysis: &AggregateAnalysis) -> String {
    let summary = &analysis.summary;
    let mut out = String::new();

    out.push_str(SECTION_SUMMARY);
    out.push('\n');
    out.push_str(&format!(
        "total runs: {}\nfailed runs: {}\npass rate: {:.1}%\n\n",
        summary.total_runs, summary.failed_runs, summary.pass_rate
    ));

    out.push_str(SECTION_PASSED);
    out.push('\n');
    out.push_str(&format!("{}/{} runs passed\n", summary.passed_runs, summary.total_runs));
    for run in report.results.iter().filter(|r| r.passed) {
        out.push_str(&format!("  ✓ {} [{}]\n", run.name, run.prefix));
    }
    out.push('\n');

    out.push_str(SECTION_FAILED);
    out.push('\n');
    if analysis.failure_reports.is_empty() {
        out.push_str("none\n");
    }
    for failure in &analysis.failure_reports {
        out.push_str(&render_failure_report(failure));
        out.push('\n');
    }
    out.push('\n');

    out.push_str(SECTION_DISTRIBUTION);
    out.push('\n');
    for entry in &summary.error_distribution {
        out.push_str(&format!("  {:<22} {}\n", entry.error_type.label(), entry.count));
    }
    if summary.infrastructure_failures > 0 {
        out.push_str(&format!(
            "  {:<22} {}\n",
            "infrastructure only", summary.infrastructure_failures
        ));
    }
    if summary.resolution_failures > 0 {
        out.push_str(&format!(
            "  {:<22} {}\n",
            "pre-validation", summary.resolution_failures
        ));
    }
    out.push('\n');

    out.push_str(SECTION_ANALYSIS);
    out.push('\n');
    if !analysis.root_cause_patterns.is_empty() {
        out.push_str("Root-cause patterns:\n");
        for p in &analysis.root_cause_patterns {
            out.push_str(&format!(
                "  - {} missing '{}' in {} runs",
                p.offering_name, p.input_name, p.count
            ));
            match (&p.suspected_root_cause, p.confidence) {
                (Some(cause), Confidence::High) => {
                    out.push_str(&format!(" -> suspected root cause: '{cause}' disabled (HIGH)\n"))
                }
                _ => out.push_str(" -> root cause unknown\n"),
            }
        }
    }
    if !analysis.validation_patterns.is_empty() {
        out.push_str("Validation patterns:\n");
        for p in &analysis.validation_patterns {
            out.push_str(&format!("  - [{}] {} ({}x)\n", p.error_type, p.pattern, p.count));
        }
    }
    if !analysis.action_items.is_empty() {
        out.push_str("Action items:\n");
        for (idx, item) in analysis.action_items.iter().enumerate() {
            out.push_str(&format!("  {}. {item}\n", idx + 1));
        }
    }
    match &analysis.completeness.notice {
        Some(notice) => out.push_str(&format!("WARNING: {notice}\n")),
        None if summary.failed_runs > 0 => out.push_str("All failed runs are explained by the patterns above.\n"),
        None => {}
    }
    out
}
