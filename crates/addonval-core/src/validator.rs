//! Expected-vs-deployed reconciliation.
//!
//! [`validate`] diffs the dependency graph and expected list produced by the
//! graph builder against the identities recovered by the projector. It is a
//! pure function: every check always runs and every finding lands in the
//! returned [`ValidationResult`].

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::classifier::FailureCategory;
use crate::error::ProjectionError;
use crate::graph::DependencyGraphResult;
use crate::model::{CountMismatch, DependencyError, OfferingIdentity, ValidationResult};
use crate::projector::Projection;

/// Validate `actual` against the expected graph.
///
/// Checks, all unconditional:
/// 1. every edge target is deployed (exact identity), otherwise a
///    [`DependencyError`] listing same-name deployments as alternatives;
/// 2. every deployed unit was expected;
/// 3. every expected unit was deployed;
/// 4. expected and actual lists have the same length.
pub fn validate(
    edges: &BTreeMap<OfferingIdentity, Vec<OfferingIdentity>>,
    expected: &[OfferingIdentity],
    actual: &[OfferingIdentity],
) -> ValidationResult {
    let actual_set: HashSet<&OfferingIdentity> = actual.iter().collect();
    let expected_set: HashSet<&OfferingIdentity> = expected.iter().collect();
    let mut result = ValidationResult::default();

    for (unit, dependencies) in edges {
        for dependency in dependencies {
            if actual_set.contains(dependency) {
                continue;
            }
            let available_alternatives = actual
                .iter()
                .filter(|a| a.name == dependency.name)
                .cloned()
                .collect();
            result.dependency_errors.push(DependencyError {
                unit: unit.clone(),
                missing_dependency: dependency.clone(),
                available_alternatives,
            });
        }
    }

    result.unexpected_configs = actual
        .iter()
        .filter(|a| !expected_set.contains(a))
        .cloned()
        .collect();

    result.missing_configs = expected
        .iter()
        .filter(|e| !actual_set.contains(e))
        .cloned()
        .collect();

    if expected.len() != actual.len() {
        result.count_mismatch = Some(CountMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }

    result.finalize();
    debug!(
        valid = result.is_valid,
        dependency_errors = result.dependency_errors.len(),
        unexpected = result.unexpected_configs.len(),
        missing = result.missing_configs.len(),
        "validation completed"
    );
    result
}

/// Validation of one deploy plus the projection failures that were not
/// about deployed state.
#[derive(Debug, Clone, Default)]
pub struct DeploymentCheck {
    pub validation: ValidationResult,
    /// Projection failures caused by unavailable collaborators.
    pub infrastructure_errors: Vec<ProjectionError>,
}

/// Validate a projected deploy against its dependency graph.
///
/// Cycles and deterministic projection failures become configuration
/// errors; transient projection failures are handed back instead so they
/// never make the deploy itself invalid. Missing inputs are recorded last.
pub fn validate_deployment(graph: &DependencyGraphResult, projection: Projection) -> DeploymentCheck {
    let mut validation = validate(&graph.edges, &graph.expected, &projection.actually_deployed);
    validation.configuration_errors.extend(graph.cycle_messages());

    let mut infrastructure_errors = Vec::new();
    for error in projection.errors {
        match error.category() {
            FailureCategory::Validation => validation.configuration_errors.push(error.to_string()),
            FailureCategory::Transient | FailureCategory::Runtime => infrastructure_errors.push(error),
        }
    }

    validation.finalize();
    validation.record_missing_inputs(&projection.missing_inputs);
    DeploymentCheck {
        validation,
        infrastructure_errors,
    }
}
