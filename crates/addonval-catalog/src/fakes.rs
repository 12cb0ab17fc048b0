//! In-memory collaborators (testing and fixture replay only)
//!
//! `MemoryPlatform` satisfies both `CatalogService` and `ProjectService`
//! from a `PlatformFixture` without any network access. Deploys replay the
//! fixture's recorded deployment, dropping configs for offerings the unit
//! disables and blanking inputs those offerings would have supplied.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::constraint::{satisfies, SimpleVersion};
use crate::error::CatalogError;
use crate::model::*;
use crate::service_traits::*;

/// One config the fake platform creates on deploy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigTemplate {
    pub config_name: String,
    pub version_locator: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub required_inputs: Vec<String>,
    /// `input name -> offering name` whose deployment supplies the value.
    #[serde(default)]
    pub input_sources: BTreeMap<String, String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Serializable description of a fake platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformFixture {
    #[serde(default)]
    pub offerings: Vec<Offering>,
    /// Recorded deployment replayed for every deploy request.
    #[serde(default)]
    pub deployment: Vec<ConfigTemplate>,
}

impl PlatformFixture {
    pub fn from_json(raw: &str) -> CatalogResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Default)]
struct PlatformState {
    offerings: HashMap<(String, String), Offering>,
    version_overrides: HashMap<String, VersionMetadata>,
    configs: HashMap<(String, String), ConfigDetails>,
    deployment: Vec<ConfigTemplate>,
    failing_configs: HashSet<String>,
    setup_failure: Option<String>,
    deploy_failure: Option<String>,
    undeployed: Vec<String>,
}

/// In-memory catalog + project backend.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    state: Mutex<PlatformState>,
    setup_calls: AtomicUsize,
    lookups: AtomicUsize,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: PlatformFixture) -> Self {
        let platform = Self::new();
        for offering in fixture.offerings {
            platform.add_offering(offering);
        }
        platform.set_deployment(fixture.deployment);
        platform
    }

    pub fn add_offering(&self, offering: Offering) {
        let mut state = self.state.lock().unwrap();
        state
            .offerings
            .insert((offering.catalog_id.clone(), offering.id.clone()), offering);
    }

    /// Replace the metadata returned for `locator` (used to inject gaps).
    pub fn set_version_metadata(&self, locator: &str, metadata: VersionMetadata) {
        let mut state = self.state.lock().unwrap();
        state
            .version_overrides
            .insert(locator.to_string(), metadata);
    }

    pub fn add_config(&self, project_id: &str, details: ConfigDetails) {
        let mut state = self.state.lock().unwrap();
        state
            .configs
            .insert((project_id.to_string(), details.id.clone()), details);
    }

    pub fn set_deployment(&self, templates: Vec<ConfigTemplate>) {
        self.state.lock().unwrap().deployment = templates;
    }

    /// Make `get_config` fail with `Unavailable` for this config id.
    pub fn fail_config_lookup(&self, config_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_configs
            .insert(config_id.to_string());
    }

    pub fn fail_catalog_setup(&self, reason: &str) {
        self.state.lock().unwrap().setup_failure = Some(reason.to_string());
    }

    pub fn fail_deploy(&self, reason: &str) {
        self.state.lock().unwrap().deploy_failure = Some(reason.to_string());
    }

    /// Number of `create_catalog_and_offering` calls observed.
    pub fn setup_calls(&self) -> usize {
        self.setup_calls.load(Ordering::SeqCst)
    }

    /// Number of catalog lookups observed (all `CatalogService` methods).
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Project ids passed to `undeploy_project`, in call order.
    pub fn undeployed_projects(&self) -> Vec<String> {
        self.state.lock().unwrap().undeployed.clone()
    }

    fn find_by_locator(state: &PlatformState, locator: &str) -> Option<(Offering, OfferingVersion)> {
        state.offerings.values().find_map(|offering| {
            offering
                .find_version(locator)
                .map(|v| (offering.clone(), v.clone()))
        })
    }

    fn packed_offering_id(locator: &str, offering_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(locator.as_bytes());
        let sha = hex::encode(hasher.finalize());
        format!("{}{}{}", &sha[..12], PACKED_OFFERING_SEPARATOR, offering_id)
    }
}

#[async_trait]
impl CatalogService for MemoryPlatform {
    async fn get_offering(&self, catalog_id: &str, offering_id: &str) -> CatalogResult<Offering> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        state
            .offerings
            .get(&(catalog_id.to_string(), offering_id.to_string()))
            .cloned()
            .ok_or_else(|| CatalogError::OfferingNotFound {
                catalog_id: catalog_id.to_string(),
                offering_id: offering_id.to_string(),
            })
    }

    async fn get_offering_version_locator_by_constraint(
        &self,
        catalog_id: &str,
        offering_id: &str,
        constraint: &str,
        flavor: &str,
    ) -> CatalogResult<ResolvedVersion> {
        let offering = self.get_offering(catalog_id, offering_id).await?;
        let mut best: Option<(SimpleVersion, &OfferingVersion)> = None;
        for version in &offering.versions {
            if version.flavor.name.as_deref() != Some(flavor) {
                continue;
            }
            if !satisfies(constraint, &version.version)? {
                continue;
            }
            let Some(parsed) = SimpleVersion::parse(&version.version) else {
                continue;
            };
            if best.as_ref().map_or(true, |(b, _)| parsed > *b) {
                best = Some((parsed, version));
            }
        }
        best.map(|(_, v)| ResolvedVersion {
            version: v.version.clone(),
            version_locator: v.version_locator.clone(),
        })
        .ok_or_else(|| CatalogError::VersionNotFound {
            offering_id: offering_id.to_string(),
            constraint: constraint.to_string(),
            flavor: flavor.to_string(),
        })
    }

    async fn get_catalog_version_by_locator(
        &self,
        locator: &str,
    ) -> CatalogResult<VersionMetadata> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if let Some(meta) = state.version_overrides.get(locator) {
            return Ok(meta.clone());
        }
        let (offering, version) = Self::find_by_locator(&state, locator)
            .ok_or_else(|| CatalogError::LocatorNotFound(locator.to_string()))?;
        Ok(VersionMetadata {
            version: Some(version.version.clone()),
            flavor: Some(version.flavor.clone()),
            catalog_id: Some(offering.catalog_id.clone()),
            offering_id: Some(Self::packed_offering_id(locator, &offering.id)),
        })
    }
}

#[async_trait]
impl ProjectService for MemoryPlatform {
    async fn get_config(&self, project_id: &str, config_id: &str) -> CatalogResult<ConfigDetails> {
        let state = self.state.lock().unwrap();
        if state.failing_configs.contains(config_id) {
            return Err(CatalogError::Unavailable(format!(
                "503 Service Unavailable fetching config {config_id}"
            )));
        }
        state
            .configs
            .get(&(project_id.to_string(), config_id.to_string()))
            .cloned()
            .ok_or_else(|| CatalogError::ConfigNotFound {
                project_id: project_id.to_string(),
                config_id: config_id.to_string(),
            })
    }

    async fn deploy_addon_to_project(
        &self,
        unit: &UnitConfig,
        project: &ProjectConfig,
    ) -> CatalogResult<Vec<DeployedConfig>> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.deploy_failure {
            return Err(CatalogError::Deploy(reason.clone()));
        }

        let project_id = format!("{}-{}", project.prefix, project.project_name);
        let disabled: HashSet<String> = unit.disabled_dependency_names().into_iter().collect();
        let mut deployed = Vec::new();

        for (idx, template) in state.deployment.clone().into_iter().enumerate() {
            let offering_name = Self::find_by_locator(&state, &template.version_locator)
                .map(|(o, _)| o.name)
                .unwrap_or_default();
            if disabled.contains(&offering_name) {
                debug!(config = %template.config_name, "skipping config for disabled offering");
                continue;
            }

            let mut inputs = template.inputs.clone();
            for (input, source) in &template.input_sources {
                if disabled.contains(source) {
                    inputs.remove(input);
                } else {
                    inputs
                        .entry(input.clone())
                        .or_insert_with(|| serde_json::json!(format!("crn:{source}")));
                }
            }

            let config_id = format!("{}-cfg-{idx}", project.prefix);
            let details = ConfigDetails {
                id: config_id.clone(),
                name: template.config_name.clone(),
                state: template.state.clone().or_else(|| Some("deployed".to_string())),
                definition: ConfigDefinition {
                    locator_id: Some(template.version_locator.clone()),
                    inputs,
                    required_inputs: template.required_inputs.clone(),
                },
            };
            state
                .configs
                .insert((project_id.clone(), config_id.clone()), details);
            deployed.push(DeployedConfig {
                project_id: project_id.clone(),
                config_id,
                name: template.config_name.clone(),
            });
        }

        Ok(deployed)
    }

    async fn create_catalog_and_offering(
        &self,
        request: &OfferingImport,
    ) -> CatalogResult<SharedCatalog> {
        self.setup_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if let Some(reason) = &state.setup_failure {
            return Err(CatalogError::Setup(reason.clone()));
        }

        let offering = state
            .offerings
            .values()
            .filter(|o| o.name == request.offering_name)
            .min_by(|a, b| a.id.cmp(&b.id))
            .ok_or_else(|| CatalogError::Setup(format!(
                "no offering named '{}' to import",
                request.offering_name
            )))?;

        let version = match &request.version_locator {
            Some(locator) => offering.find_version(locator),
            None => offering
                .versions
                .iter()
                .filter(|v| v.flavor.name.as_deref() == Some(request.flavor.as_str()))
                .max_by(|a, b| {
                    SimpleVersion::parse(&a.version).cmp(&SimpleVersion::parse(&b.version))
                }),
        }
        .ok_or_else(|| CatalogError::Setup(format!(
            "no version of '{}' in flavor '{}'",
            request.offering_name, request.flavor
        )))?;

        Ok(SharedCatalog {
            catalog_id: offering.catalog_id.clone(),
            offering_id: offering.id.clone(),
            version_locator: version.version_locator.clone(),
        })
    }

    async fn undeploy_project(&self, project_id: &str) -> CatalogResult<()> {
        let mut state = self.state.lock().unwrap();
        state.configs.retain(|(project, _), _| project != project_id);
        state.undeployed.push(project_id.to_string());
        Ok(())
    }
}
