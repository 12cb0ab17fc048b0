//! Structured lifecycle events for permutation runs.
//!
//! Every event is an `info!` record with an `event` field
//! (`run.started`, `run.finished`, `graph.built`, `validation.completed`,
//! `batch.completed`) so log pipelines can filter on it.

use tracing::{info, info_span, Span};

/// Span scoping every record of one run; attach with `Instrument`.
pub fn run_span(run_name: &str, prefix: &str) -> Span {
    info_span!("addonval.run", run = %run_name, prefix = %prefix)
}

pub fn emit_run_started(run_name: &str, prefix: &str, disabled: &[String]) {
    info!(
        event = "run.started",
        run = %run_name,
        prefix = %prefix,
        disabled = %disabled.join(","),
    );
}

pub fn emit_run_finished(run_name: &str, duration_ms: u64, passed: bool) {
    info!(
        event = "run.finished",
        run = %run_name,
        duration_ms = duration_ms,
        passed = passed,
    );
}

pub fn emit_graph_built(run_name: &str, expected: usize, edges: usize, cycles: usize) {
    info!(
        event = "graph.built",
        run = %run_name,
        expected = expected,
        edges = edges,
        cycles = cycles,
    );
}

pub fn emit_validation_completed(run_name: &str, valid: bool, findings: usize) {
    info!(
        event = "validation.completed",
        run = %run_name,
        valid = valid,
        findings = findings,
    );
}

pub fn emit_batch_completed(total: usize, passed: usize, failed: usize) {
    info!(
        event = "batch.completed",
        total = total,
        passed = passed,
        failed = failed,
    );
}

/// Teardown failures never fail the run; they are only logged.
pub fn emit_teardown_error(run_name: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "run.teardown_error", run = %run_name, error = %error);
}
