//! Batch execution: shared catalog, panic recovery, teardown, aggregation.

mod common;

use std::sync::Arc;

use addonval_catalog::fakes::MemoryPlatform;
use addonval_catalog::{
    CatalogResult, CatalogService, ConfigDetails, DeployedConfig, Offering, OfferingImport,
    ProjectConfig, ProjectService, ResolvedVersion, SharedCatalog, UnitConfig, VersionMetadata,
};
use addonval_core::{
    aggregate, generate_permutations, BatchConfig, Collaborators, Confidence, PermutationRunner,
};
use async_trait::async_trait;

use common::*;

fn optional_names() -> Vec<String> {
    vec!["cos".to_string(), "kms".to_string()]
}

#[tokio::test]
async fn batch_mines_one_root_cause_per_disabled_supplier() {
    let platform = Arc::new(logs_platform());
    let runner = PermutationRunner::new(
        Collaborators::from_platform(platform.clone()),
        logs_import(),
        BatchConfig::immediate(),
    );
    let permutations = generate_permutations(&logs_root(), &optional_names());
    let report = runner.run_batch(permutations).await;

    assert_eq!(report.total_runs, 3);
    assert_eq!(report.failed_runs, 3);
    assert_eq!(platform.setup_calls(), 1);
    assert_eq!(platform.undeployed_projects().len(), 3);

    let analysis = aggregate(&report);
    assert_eq!(analysis.root_cause_patterns.len(), 2);
    for pattern in &analysis.root_cause_patterns {
        assert_eq!(pattern.count, 2);
        assert_eq!(pattern.confidence, Confidence::High);
        let cause = pattern.suspected_root_cause.as_deref().unwrap();
        assert!(pattern.input_name.starts_with(cause));
    }
    assert!(analysis.completeness.is_complete());
}

#[tokio::test]
async fn default_configuration_passes() {
    let platform = Arc::new(logs_platform());
    let runner = PermutationRunner::new(
        Collaborators::from_platform(platform),
        logs_import(),
        BatchConfig::immediate(),
    );
    let default_run = addonval_core::Permutation::new("cloud-logs-default", logs_root());
    let report = runner.run_batch(vec![default_run]).await;
    assert_eq!(report.passed_runs, 1, "{:?}", report.results[0].all_messages());
    assert!(report.results[0].duration_ms < 60_000);
}

const UUID_LOCATOR: &str = "1082e7d2-5429-4c1d-9e3a-0b1931fc.d4295b1e";

#[tokio::test]
async fn unresolvable_versions_are_resolution_failures() {
    let mut fixture = logs_fixture();
    fixture.offerings[0].versions[0].version_locator = UUID_LOCATOR.to_string();
    fixture.offerings[0].versions[0].dependencies[0].version_constraint = ">=1.500.0".to_string();
    let platform = Arc::new(MemoryPlatform::from_fixture(fixture));

    let mut unknown_root = logs_root();
    unknown_root.version_locator = format!("{UUID_LOCATOR}0");
    let mut pinned_root = logs_root();
    pinned_root.version_locator = UUID_LOCATOR.to_string();

    let runner = PermutationRunner::new(
        Collaborators::from_platform(platform.clone()),
        logs_import(),
        BatchConfig::immediate(),
    );
    let report = runner
        .run_batch(vec![
            addonval_core::Permutation::new("cloud-logs-unknown-version", unknown_root),
            addonval_core::Permutation::new("cloud-logs-unsatisfiable-cos", pinned_root),
        ])
        .await;

    assert_eq!(report.failed_runs, 2);
    for run in &report.results {
        assert_eq!(run.resolution_errors.len(), 1, "{:?}", run.all_messages());
        assert!(run.transient_errors.is_empty(), "{:?}", run.transient_errors);
        assert!(run.validation_result.is_none());
        assert!(!run.failed_only_on_infrastructure());
    }
    assert!(report.results[0].resolution_errors[0].contains("d4295b1e"));
    assert!(report.results[1].resolution_errors[0].contains(">=1.500.0"));

    let analysis = aggregate(&report);
    assert_eq!(analysis.summary.resolution_failures, 2);
    assert_eq!(analysis.summary.infrastructure_failures, 0);
    assert_eq!(platform.undeployed_projects().len(), 2);
}

#[tokio::test]
async fn unavailable_config_lookup_is_transient() {
    let platform = Arc::new(logs_platform());
    let default_run = addonval_core::Permutation::new("cloud-logs-default", logs_root());
    platform.fail_config_lookup(&format!("{}-cfg-1", default_run.prefix));
    let runner = PermutationRunner::new(
        Collaborators::from_platform(platform),
        logs_import(),
        BatchConfig::immediate(),
    );

    let report = runner.run_batch(vec![default_run]).await;
    let run = &report.results[0];
    assert!(!run.passed);
    assert_eq!(run.transient_errors.len(), 1);
    assert!(run.transient_errors[0].contains("503"));
    assert!(run.resolution_errors.is_empty());
    let validation = run.validation_result.as_ref().unwrap();
    assert!(validation
        .configuration_errors
        .iter()
        .all(|e| !e.contains("503")));
}

#[tokio::test]
async fn shared_catalog_failure_reaches_every_run() {
    let platform = Arc::new(logs_platform());
    platform.fail_catalog_setup("catalog quota exceeded");
    let runner = PermutationRunner::new(
        Collaborators::from_platform(platform.clone()),
        logs_import(),
        BatchConfig::immediate(),
    );
    let report = runner
        .run_batch(generate_permutations(&logs_root(), &optional_names()))
        .await;

    assert_eq!(platform.setup_calls(), 1);
    assert_eq!(report.failed_runs, 3);
    for run in &report.results {
        assert!(run.validation_result.is_none());
        assert!(run.resolution_errors[0].contains("catalog quota exceeded"));
    }
    assert!(platform.undeployed_projects().is_empty());
}

/// Delegates to a `MemoryPlatform` but panics while reading one config.
struct PanickyPlatform {
    inner: MemoryPlatform,
    panic_on_prefix: String,
}

#[async_trait]
impl CatalogService for PanickyPlatform {
    async fn get_offering(&self, catalog_id: &str, offering_id: &str) -> CatalogResult<Offering> {
        self.inner.get_offering(catalog_id, offering_id).await
    }

    async fn get_offering_version_locator_by_constraint(
        &self,
        catalog_id: &str,
        offering_id: &str,
        constraint: &str,
        flavor: &str,
    ) -> CatalogResult<ResolvedVersion> {
        self.inner
            .get_offering_version_locator_by_constraint(catalog_id, offering_id, constraint, flavor)
            .await
    }

    async fn get_catalog_version_by_locator(
        &self,
        locator: &str,
    ) -> CatalogResult<VersionMetadata> {
        self.inner.get_catalog_version_by_locator(locator).await
    }
}

#[async_trait]
impl ProjectService for PanickyPlatform {
    async fn get_config(&self, project_id: &str, config_id: &str) -> CatalogResult<ConfigDetails> {
        if config_id.starts_with(&self.panic_on_prefix) {
            panic!("config reader exploded on {config_id}");
        }
        self.inner.get_config(project_id, config_id).await
    }

    async fn deploy_addon_to_project(
        &self,
        unit: &UnitConfig,
        project: &ProjectConfig,
    ) -> CatalogResult<Vec<DeployedConfig>> {
        self.inner.deploy_addon_to_project(unit, project).await
    }

    async fn create_catalog_and_offering(
        &self,
        request: &OfferingImport,
    ) -> CatalogResult<SharedCatalog> {
        self.inner.create_catalog_and_offering(request).await
    }

    async fn undeploy_project(&self, project_id: &str) -> CatalogResult<()> {
        self.inner.undeploy_project(project_id).await
    }
}

#[tokio::test]
async fn panic_is_recovered_and_teardown_still_runs() {
    let permutations = generate_permutations(&logs_root(), &optional_names());
    let doomed = permutations[1].prefix.clone();
    let platform = Arc::new(PanickyPlatform {
        inner: logs_platform(),
        panic_on_prefix: doomed.clone(),
    });
    let runner = PermutationRunner::new(
        Collaborators::from_platform(platform.clone()),
        logs_import(),
        BatchConfig {
            max_concurrent: 2,
            ..BatchConfig::immediate()
        },
    );
    let report = runner.run_batch(permutations).await;

    assert_eq!(report.total_runs, 3);
    let crashed = &report.results[1];
    assert_eq!(crashed.prefix, doomed);
    assert_eq!(crashed.runtime_errors.len(), 1);
    assert!(crashed.runtime_errors[0].contains("run panicked"));
    assert!(crashed.runtime_errors[0].contains("config reader exploded"));
    assert!(crashed.failed_only_on_infrastructure());

    // siblings still ran to validation
    assert!(report.results[0].validation_result.is_some());
    assert!(report.results[2].validation_result.is_some());

    let undeployed = platform.inner.undeployed_projects();
    assert_eq!(undeployed.len(), 3);
    assert!(undeployed.iter().any(|p| p.starts_with(&doomed)));
}

#[tokio::test(start_paused = true)]
async fn staggered_batch_completes_under_paused_clock() {
    let platform = Arc::new(logs_platform());
    let runner = PermutationRunner::new(
        Collaborators::from_platform(platform),
        logs_import(),
        BatchConfig {
            batch_size: 2,
            batch_delay_ms: 30_000,
            run_delay_ms: 2_000,
            ..BatchConfig::default()
        },
    );
    let started = tokio::time::Instant::now();
    let report = runner
        .run_batch(generate_permutations(&logs_root(), &optional_names()))
        .await;
    assert_eq!(report.total_runs, 3);
    // third run starts in the second stagger group
    assert!(started.elapsed() >= std::time::Duration::from_millis(30_000));
}
