//! Dependency graph resolution.
//!
//! [`GraphBuilder`] expands a root unit into a [`DependencyGraphResult`];
//! [`render_dependency_tree`] turns one into an indented tree for logs.

mod builder;
mod tree;

pub use builder::{is_included, resolve_flavor, DisabledOfferings, GraphBuilder};
pub use tree::render_dependency_tree;

use std::collections::{BTreeMap, BTreeSet};

use crate::model::OfferingIdentity;

/// Arena entry for one expanded unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUnit {
    pub identity: OfferingIdentity,
    pub catalog_id: String,
    pub offering_id: String,
    pub version_locator: String,
    /// Child identities in declaration order.
    pub dependencies: Vec<OfferingIdentity>,
}

/// Output of one build.
///
/// `expected` is an append-only list: a unit reached through two different
/// paths (a diamond) appears twice, because visitation is tracked per path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraphResult {
    pub edges: BTreeMap<OfferingIdentity, Vec<OfferingIdentity>>,
    pub expected: Vec<OfferingIdentity>,
    /// Union of every version locator marked visited during the build.
    pub visited: BTreeSet<String>,
    pub nodes: BTreeMap<OfferingIdentity, ResolvedUnit>,
    /// Closed paths found while expanding, first element repeated at the end.
    pub cycles: Vec<Vec<OfferingIdentity>>,
}

impl DependencyGraphResult {
    /// Record `parent -> child` once.
    pub fn add_edge(&mut self, parent: &OfferingIdentity, child: &OfferingIdentity) {
        let children = self.edges.entry(parent.clone()).or_default();
        if !children.contains(child) {
            children.push(child.clone());
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// `circular dependency detected: a -> b -> a`, one per cycle.
    pub fn cycle_messages(&self) -> Vec<String> {
        self.cycles
            .iter()
            .map(|c| format!("circular dependency detected: {}", builder::render_chain(c)))
            .collect()
    }
}
