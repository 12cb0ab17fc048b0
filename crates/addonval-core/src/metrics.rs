//! Global atomic counters.
//!
//! Incremented at the call site; [`Metrics::flush`] emits them as one
//! `info!` event at the end of a batch.

use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    runs_started: AtomicU64,
    runs_failed: AtomicU64,
    panics_recovered: AtomicU64,
    lookups: AtomicU64,
    nodes_expanded: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            runs_started: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
            panics_recovered: AtomicU64::new(0),
            lookups: AtomicU64::new(0),
            nodes_expanded: AtomicU64::new(0),
        }
    }

    pub fn inc_runs_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_runs_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_panics_recovered(&self) {
        self.panics_recovered.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "panics_recovered", "counter incremented");
    }

    /// Collaborator lookups issued by the graph builder and projector.
    pub fn inc_lookups(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_nodes_expanded(&self) {
        self.nodes_expanded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            runs_started = self.runs_started(),
            runs_failed = self.runs_failed(),
            panics_recovered = self.panics_recovered(),
            lookups = self.lookups(),
            nodes_expanded = self.nodes_expanded(),
        );
    }

    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::Relaxed)
    }

    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::Relaxed)
    }

    pub fn panics_recovered(&self) -> u64 {
        self.panics_recovered.load(Ordering::Relaxed)
    }

    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn nodes_expanded(&self) -> u64 {
        self.nodes_expanded.load(Ordering::Relaxed)
    }

    /// Reset all counters (tests only share the global through this).
    pub fn reset(&self) {
        self.runs_started.store(0, Ordering::Relaxed);
        self.runs_failed.store(0, Ordering::Relaxed);
        self.panics_recovered.store(0, Ordering::Relaxed);
        self.lookups.store(0, Ordering::Relaxed);
        self.nodes_expanded.store(0, Ordering::Relaxed);
    }
}
