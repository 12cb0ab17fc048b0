//! One permutation run: deploy, resolve, project, validate.

use std::sync::{Arc, OnceLock};

use addonval_catalog::{AddonPlatform, CatalogService, ProjectConfig, ProjectService, SharedCatalog};
use tracing::{info, warn};

use crate::error::{catalog_category, CoreError};
use crate::graph::GraphBuilder;
use crate::model::{RunResult, UnitConfig};
use crate::obs;
use crate::permutation::Permutation;
use crate::projector::Projector;
use crate::validator::validate_deployment;

/// Collaborator handles shared by every run of a batch.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogService>,
    pub projects: Arc<dyn ProjectService>,
}

impl Collaborators {
    pub fn new(catalog: Arc<dyn CatalogService>, projects: Arc<dyn ProjectService>) -> Self {
        Self { catalog, projects }
    }

    /// Both handles backed by one platform.
    pub fn from_platform<P: AddonPlatform + 'static>(platform: Arc<P>) -> Self {
        Self {
            catalog: platform.clone(),
            projects: platform,
        }
    }
}

/// File a build or setup error under the bucket its variant belongs to.
pub fn record_error(run: &mut RunResult, error: &CoreError) {
    run.record_failure(error.category(), error.to_string());
}

/// Root config with shared catalog coordinates filled in where absent.
fn resolve_root(config: &UnitConfig, shared: &SharedCatalog) -> UnitConfig {
    let mut root = config.clone();
    if root.catalog_id.is_empty() {
        root.catalog_id = shared.catalog_id.clone();
    }
    if root.offering_id.is_empty() {
        root.offering_id = shared.offering_id.clone();
    }
    if root.version_locator.is_empty() {
        root.version_locator = shared.version_locator.clone();
    }
    root
}

/// Execute one permutation against the shared catalog.
///
/// `deployed_project` is set as soon as a deploy succeeds so teardown can
/// find the project even if the rest of the run panics.
pub async fn execute_run(
    collaborators: Collaborators,
    shared: SharedCatalog,
    permutation: Permutation,
    project_name: String,
    deployed_project: Arc<OnceLock<String>>,
) -> RunResult {
    let Permutation {
        name,
        prefix,
        unit_config,
    } = permutation;
    let root = resolve_root(&unit_config, &shared);
    let mut run = RunResult::new(name.clone(), prefix.clone(), unit_config);

    let project = ProjectConfig {
        project_name,
        prefix,
    };
    let deployed = match collaborators
        .projects
        .deploy_addon_to_project(&root, &project)
        .await
    {
        Ok(deployed) => deployed,
        Err(e) => {
            run.record_failure(catalog_category(&e), e.to_string());
            return run;
        }
    };
    if let Some(first) = deployed.first() {
        deployed_project.set(first.project_id.clone()).ok();
    }

    let builder = GraphBuilder::new(Arc::clone(&collaborators.catalog));
    let graph = match builder
        .build(
            &root.catalog_id,
            &root.offering_id,
            &root.version_locator,
            &root.offering_flavor,
            &root,
        )
        .await
    {
        Ok(graph) => graph,
        Err(e) => {
            record_error(&mut run, &e);
            return run;
        }
    };
    obs::emit_graph_built(&name, graph.expected.len(), graph.edge_count(), graph.cycles.len());

    let projector = Projector::new(
        Arc::clone(&collaborators.catalog),
        Arc::clone(&collaborators.projects),
    );
    let projection = projector.project(&deployed).await;
    for warning in &projection.warnings {
        warn!(run = %name, warning = %warning, "projection warning");
    }

    let check = validate_deployment(&graph, projection);
    for error in &check.infrastructure_errors {
        run.record_failure(error.category(), error.to_string());
    }
    let validation = check.validation;

    let findings = validation.dependency_errors.len()
        + validation.unexpected_configs.len()
        + validation.missing_configs.len()
        + validation.configuration_errors.len();
    obs::emit_validation_completed(&name, validation.is_valid, findings);

    run.passed = validation.is_valid
        && run.transient_errors.is_empty()
        && run.runtime_errors.is_empty()
        && run.resolution_errors.is_empty();
    if !run.passed {
        info!(run = %name, messages = ?validation.messages, "run failed validation");
    }
    run.validation_result = Some(validation);
    run
}

#[cfg(test)]
mod tests {
    use super::*;

    use addonval_catalog::CatalogError;

    #[test]
    fn record_error_routes_by_variant() {
        let mut run = RunResult::default();
        record_error(
            &mut run,
            &CoreError::Catalog(CatalogError::Unavailable("429 Too Many Requests".to_string())),
        );
        record_error(
            &mut run,
            &CoreError::VersionNotFound {
                offering_id: "off-x".to_string(),
                locator: "cat.x-1".to_string(),
            },
        );
        assert_eq!(run.transient_errors.len(), 1);
        assert_eq!(run.resolution_errors.len(), 1);
        assert!(run.runtime_errors.is_empty());
    }

    #[test]
    fn identifiers_that_look_like_status_codes_stay_resolution_errors() {
        let mut run = RunResult::default();
        record_error(
            &mut run,
            &CoreError::VersionNotFound {
                offering_id: "off-logs".to_string(),
                locator: "1082e7d2-5429-4c1d-9e3a-0b1931fc.d4295b1e".to_string(),
            },
        );
        record_error(
            &mut run,
            &CoreError::Catalog(CatalogError::VersionNotFound {
                offering_id: "off-cos".to_string(),
                constraint: ">=1.500.0".to_string(),
                flavor: "standard".to_string(),
            }),
        );
        assert_eq!(run.resolution_errors.len(), 2);
        assert!(run.transient_errors.is_empty());
        assert!(!run.failed_only_on_infrastructure());
    }

    #[test]
    fn root_inherits_shared_coordinates() {
        let shared = SharedCatalog {
            catalog_id: "cat".to_string(),
            offering_id: "off".to_string(),
            version_locator: "cat.v1".to_string(),
        };
        let config = UnitConfig {
            offering_name: "cloud-logs".to_string(),
            catalog_id: "other".to_string(),
            ..UnitConfig::default()
        };
        let root = resolve_root(&config, &shared);
        assert_eq!(root.catalog_id, "other");
        assert_eq!(root.offering_id, "off");
        assert_eq!(root.version_locator, "cat.v1");
    }
}
