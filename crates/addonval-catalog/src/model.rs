//! Data shapes exchanged with catalog, project and config services.
//!
//! These are the only parts of the provider responses the validation engine
//! consumes. Field names follow the engine's vocabulary, not any provider's
//! wire format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Flavor used when neither the user nor the catalog names one.
pub const FALLBACK_FLAVOR: &str = "fully-configurable";

/// Separator between the content hash and the bare offering id in a packed
/// offering reference (`<sha>:o:<offeringID>`).
pub const PACKED_OFFERING_SEPARATOR: &str = ":o:";

/// A catalog-declared dependency of one offering version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    /// Offering name of the dependency.
    pub name: String,
    /// Deployed unless the user explicitly disables it.
    #[serde(default)]
    pub on_by_default: bool,
    #[serde(default)]
    pub default_flavor: Option<String>,
    #[serde(default)]
    pub allowed_flavors: Vec<String>,
    pub catalog_id: String,
    pub offering_id: String,
    /// Semver-style constraint, e.g. `">=1.2.0"` or `"^3.0.0"`.
    #[serde(default)]
    pub version_constraint: String,
}

/// Flavor attached to a published version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl Flavor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            label: None,
        }
    }
}

/// One published version of an offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferingVersion {
    pub version: String,
    pub version_locator: String,
    #[serde(default)]
    pub flavor: Flavor,
    #[serde(default)]
    pub dependencies: Vec<DependencyDeclaration>,
}

/// Offering metadata as returned by `get_offering`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    pub id: String,
    pub catalog_id: String,
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub versions: Vec<OfferingVersion>,
}

impl Offering {
    /// Find the published version identified by `locator`.
    pub fn find_version(&self, locator: &str) -> Option<&OfferingVersion> {
        self.versions.iter().find(|v| v.version_locator == locator)
    }
}

/// Version metadata as returned by `get_catalog_version_by_locator`.
///
/// Every field is optional because the provider may omit any of them; the
/// projector decides which gaps are fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub flavor: Option<Flavor>,
    #[serde(default)]
    pub catalog_id: Option<String>,
    /// Packed `<sha>:o:<offeringID>` reference.
    #[serde(default)]
    pub offering_id: Option<String>,
}

/// Definition block of a project config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDefinition {
    #[serde(default)]
    pub locator_id: Option<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, serde_json::Value>,
    /// Input names the offering marks as required.
    #[serde(default)]
    pub required_inputs: Vec<String>,
}

impl ConfigDefinition {
    /// Required inputs with no usable value (absent, null or empty string).
    pub fn missing_required_inputs(&self) -> Vec<String> {
        self.required_inputs
            .iter()
            .filter(|name| match self.inputs.get(name.as_str()) {
                None | Some(serde_json::Value::Null) => true,
                Some(serde_json::Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .cloned()
            .collect()
    }
}

/// Full config details as returned by `get_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDetails {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub definition: ConfigDefinition,
}

/// One entry of the deployed-configs list returned by a deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedConfig {
    pub project_id: String,
    pub config_id: String,
    pub name: String,
}

/// Target project for a deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project_name: String,
    /// Resource prefix unique to one permutation run.
    pub prefix: String,
}

/// Request for the first-writer catalog + offering import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferingImport {
    pub catalog_name: String,
    pub offering_name: String,
    pub flavor: String,
    /// Locator of the version under test, when already published.
    #[serde(default)]
    pub version_locator: Option<String>,
}

/// Catalog + offering pair created once per batch and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedCatalog {
    pub catalog_id: String,
    pub offering_id: String,
    pub version_locator: String,
}

/// User-authored configuration of one deployable unit and its dependencies.
///
/// The tree is owned by the caller; the engine only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitConfig {
    pub offering_name: String,
    #[serde(default)]
    pub offering_flavor: String,
    #[serde(default)]
    pub catalog_id: String,
    #[serde(default)]
    pub offering_id: String,
    #[serde(default)]
    pub version_locator: String,
    /// `None` means "follow the catalog default".
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub inputs: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub dependencies: Vec<UnitConfig>,
}

impl UnitConfig {
    /// Minimal config for a dependency the user did not describe.
    pub fn synthesized(
        name: impl Into<String>,
        flavor: impl Into<String>,
        catalog_id: impl Into<String>,
        offering_id: impl Into<String>,
        version_locator: impl Into<String>,
    ) -> Self {
        Self {
            offering_name: name.into(),
            offering_flavor: flavor.into(),
            catalog_id: catalog_id.into(),
            offering_id: offering_id.into(),
            version_locator: version_locator.into(),
            enabled: Some(true),
            ..Self::default()
        }
    }

    /// Direct dependency override with the given name, if any.
    pub fn dependency(&self, name: &str) -> Option<&UnitConfig> {
        self.dependencies.iter().find(|d| d.offering_name == name)
    }

    /// Names of direct dependencies explicitly set to `enabled = false`.
    pub fn disabled_dependency_names(&self) -> Vec<String> {
        self.dependencies
            .iter()
            .filter(|d| d.enabled == Some(false))
            .map(|d| d.offering_name.clone())
            .collect()
    }

    /// SHA-256 over the canonical JSON form of the whole tree.
    ///
    /// Maps are `BTreeMap`s so the serialization order is stable.
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dep(name: &str, enabled: Option<bool>) -> UnitConfig {
        UnitConfig {
            offering_name: name.to_string(),
            enabled,
            ..UnitConfig::default()
        }
    }

    #[test]
    fn disabled_names_only_include_explicit_false() {
        let root = UnitConfig {
            offering_name: "cloud-logs".to_string(),
            dependencies: vec![dep("cos", Some(false)), dep("kms", None), dep("en", Some(true))],
            ..UnitConfig::default()
        };
        assert_eq!(root.disabled_dependency_names(), vec!["cos".to_string()]);
    }

    #[test]
    fn digest_is_stable_and_sensitive_to_overrides() {
        let a = UnitConfig {
            offering_name: "root".to_string(),
            dependencies: vec![dep("cos", Some(false))],
            ..UnitConfig::default()
        };
        let mut b = a.clone();
        assert_eq!(a.digest(), b.digest());
        b.dependencies[0].enabled = Some(true);
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn missing_required_inputs_treats_null_and_blank_as_missing() {
        let def = ConfigDefinition {
            locator_id: Some("loc".to_string()),
            inputs: [
                ("region".to_string(), json!("us-south")),
                ("cos_crn".to_string(), json!(null)),
                ("kms_crn".to_string(), json!("  ")),
            ]
            .into_iter()
            .collect(),
            required_inputs: vec![
                "region".to_string(),
                "cos_crn".to_string(),
                "kms_crn".to_string(),
                "prefix".to_string(),
            ],
        };
        assert_eq!(
            def.missing_required_inputs(),
            vec![
                "cos_crn".to_string(),
                "kms_crn".to_string(),
                "prefix".to_string()
            ]
        );
    }

    #[test]
    fn find_version_by_locator() {
        let offering = Offering {
            id: "off-1".to_string(),
            catalog_id: "cat-1".to_string(),
            name: "cos".to_string(),
            label: None,
            versions: vec![OfferingVersion {
                version: "1.0.0".to_string(),
                version_locator: "cat-1.ver-1".to_string(),
                flavor: Flavor::named("standard"),
                dependencies: vec![],
            }],
        };
        assert!(offering.find_version("cat-1.ver-1").is_some());
        assert!(offering.find_version("cat-1.ver-2").is_none());
    }
}
