//! Collaborator trait definitions for addonval
//!
//! These traits define the only provider capabilities the engine consumes:
//! - `CatalogService`: offering metadata and version resolution
//! - `ProjectService`: project configs, deploys and the shared catalog import
//!
//! All traits are async and backend-agnostic. Retry and backoff belong to
//! implementations, never to callers. In-memory fakes are provided via the
//! `fakes` module.

use async_trait::async_trait;

use crate::error::CatalogError;
use crate::model::{
    ConfigDetails, DeployedConfig, Offering, OfferingImport, ProjectConfig, SharedCatalog,
    UnitConfig, VersionMetadata,
};

/// Result type for collaborator calls
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// A version resolved from a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub version: String,
    pub version_locator: String,
}

/// Read-only catalog lookups.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetch offering metadata (all published versions).
    async fn get_offering(&self, catalog_id: &str, offering_id: &str) -> CatalogResult<Offering>;

    /// Resolve the best version of `offering_id` in `flavor` satisfying
    /// `constraint`.
    async fn get_offering_version_locator_by_constraint(
        &self,
        catalog_id: &str,
        offering_id: &str,
        constraint: &str,
        flavor: &str,
    ) -> CatalogResult<ResolvedVersion>;

    /// Resolve a version locator to its catalog version metadata.
    async fn get_catalog_version_by_locator(&self, locator: &str)
        -> CatalogResult<VersionMetadata>;
}

/// Project-side operations.
#[async_trait]
pub trait ProjectService: Send + Sync {
    /// Fetch one config's full details.
    async fn get_config(&self, project_id: &str, config_id: &str) -> CatalogResult<ConfigDetails>;

    /// Deploy `unit` into a fresh project and return the deployed configs
    /// (the system of record the projector consumes).
    async fn deploy_addon_to_project(
        &self,
        unit: &UnitConfig,
        project: &ProjectConfig,
    ) -> CatalogResult<Vec<DeployedConfig>>;

    /// Create (or import into) the catalog shared by a whole batch.
    async fn create_catalog_and_offering(
        &self,
        request: &OfferingImport,
    ) -> CatalogResult<SharedCatalog>;

    /// Tear down a project created by `deploy_addon_to_project`.
    async fn undeploy_project(&self, project_id: &str) -> CatalogResult<()>;
}

/// Convenience bound for collaborators implementing both traits.
pub trait AddonPlatform: CatalogService + ProjectService {}

impl<T: CatalogService + ProjectService> AddonPlatform for T {}
