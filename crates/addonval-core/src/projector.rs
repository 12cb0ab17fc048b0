//! Deployed-state projection.
//!
//! Maps the configs a deploy actually produced back onto
//! [`OfferingIdentity`]s by chasing the version locator of each config
//! through catalog metadata. One bad config never stops the others: its
//! failure lands in [`Projection::errors`] and the walk continues.

use std::sync::Arc;

use addonval_catalog::{
    CatalogService, ConfigDetails, DeployedConfig, ProjectService, VersionMetadata,
    PACKED_OFFERING_SEPARATOR,
};
use tracing::{debug, warn};

use crate::error::ProjectionError;
use crate::metrics::METRICS;
use crate::model::{MissingInput, OfferingIdentity};

/// Outcome of projecting one deployment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub actually_deployed: Vec<OfferingIdentity>,
    /// Non-fatal gaps; the identity was still recovered.
    pub warnings: Vec<String>,
    /// Per-config failures; no identity was emitted for that config.
    pub errors: Vec<ProjectionError>,
    pub missing_inputs: Vec<MissingInput>,
}

impl Projection {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Split a packed `<sha>:o:<offeringID>` reference into the bare offering id.
pub fn parse_packed_offering_id(packed: &str) -> Option<&str> {
    let (sha, offering_id) = packed.split_once(PACKED_OFFERING_SEPARATOR)?;
    if sha.is_empty() || offering_id.is_empty() || offering_id.contains(PACKED_OFFERING_SEPARATOR) {
        return None;
    }
    Some(offering_id)
}

/// One config mapped back to its identity.
struct Projected {
    identity: OfferingIdentity,
    warnings: Vec<String>,
    missing_inputs: Vec<MissingInput>,
}

/// Recovers offering identities for deployed configs.
pub struct Projector {
    catalog: Arc<dyn CatalogService>,
    projects: Arc<dyn ProjectService>,
}

impl Projector {
    pub fn new(catalog: Arc<dyn CatalogService>, projects: Arc<dyn ProjectService>) -> Self {
        Self { catalog, projects }
    }

    pub async fn project(&self, deployed: &[DeployedConfig]) -> Projection {
        let mut projection = Projection::default();
        for config in deployed {
            match self.project_one(config).await {
                Ok(projected) => {
                    debug!(config = %config.name, unit = %projected.identity, "projected deployed config");
                    projection.actually_deployed.push(projected.identity);
                    projection.warnings.extend(projected.warnings);
                    projection.missing_inputs.extend(projected.missing_inputs);
                }
                Err(error) => {
                    warn!(config = %config.name, error = %error, "could not project config");
                    projection.errors.push(error);
                }
            }
        }
        projection
    }

    async fn project_one(&self, config: &DeployedConfig) -> Result<Projected, ProjectionError> {
        let details = self
            .projects
            .get_config(&config.project_id, &config.config_id)
            .await
            .map_err(|source| ProjectionError::Lookup {
                config: config.name.clone(),
                action: "fetch details".to_string(),
                source,
            })?;

        let mut warnings = Vec::new();
        if let Some(state) = details.state.as_deref() {
            if state != "deployed" {
                warnings.push(format!("config {}: state is '{state}', not 'deployed'", details.name));
            }
        }

        let locator = details
            .definition
            .locator_id
            .as_deref()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| malformed(&details, "definition has no version locator".to_string()))?;

        METRICS.inc_lookups();
        let metadata = self
            .catalog
            .get_catalog_version_by_locator(locator)
            .await
            .map_err(|source| ProjectionError::Lookup {
                config: details.name.clone(),
                action: format!("resolve locator {locator}"),
                source,
            })?;

        let (version, catalog_id, packed) = required_fields(&details, &metadata)?;
        let flavor = flavor_of(&details, &metadata, &mut warnings);

        let offering_id = parse_packed_offering_id(packed).ok_or_else(|| {
            malformed(
                &details,
                format!(
                    "malformed offering reference '{packed}', expected <sha>{PACKED_OFFERING_SEPARATOR}<offeringID>"
                ),
            )
        })?;

        METRICS.inc_lookups();
        let offering = self
            .catalog
            .get_offering(catalog_id, offering_id)
            .await
            .map_err(|source| ProjectionError::Lookup {
                config: details.name.clone(),
                action: format!("fetch offering {offering_id}"),
                source,
            })?;

        let missing_inputs = details
            .definition
            .missing_required_inputs()
            .into_iter()
            .map(|input_name| MissingInput {
                config_name: details.name.clone(),
                offering_name: offering.name.clone(),
                input_name,
            })
            .collect();

        Ok(Projected {
            identity: OfferingIdentity::new(offering.name, version, flavor),
            warnings,
            missing_inputs,
        })
    }
}

fn malformed(details: &ConfigDetails, reason: String) -> ProjectionError {
    ProjectionError::Malformed {
        config: details.name.clone(),
        reason,
    }
}

fn required_fields<'a>(
    details: &ConfigDetails,
    metadata: &'a VersionMetadata,
) -> Result<(&'a str, &'a str, &'a str), ProjectionError> {
    let field = |value: &'a Option<String>, what: &str| {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| malformed(details, format!("catalog version has no {what}")))
    };
    Ok((
        field(&metadata.version, "version")?,
        field(&metadata.catalog_id, "catalog id")?,
        field(&metadata.offering_id, "offering id")?,
    ))
}

fn flavor_of(details: &ConfigDetails, metadata: &VersionMetadata, warnings: &mut Vec<String>) -> String {
    let Some(flavor) = &metadata.flavor else {
        warnings.push(format!("config {}: catalog version has no flavor", details.name));
        return String::new();
    };
    match (&flavor.name, &flavor.label) {
        (Some(name), _) if !name.is_empty() => name.clone(),
        (_, Some(label)) if !label.is_empty() => {
            warnings.push(format!(
                "config {}: flavor name missing, using label '{label}'",
                details.name
            ));
            label.clone()
        }
        _ => {
            warnings.push(format!("config {}: flavor has neither name nor label", details.name));
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_offering_id_parsing() {
        assert_eq!(parse_packed_offering_id("abc123:o:off-cos"), Some("off-cos"));
        assert_eq!(parse_packed_offering_id("off-cos"), None);
        assert_eq!(parse_packed_offering_id(":o:off-cos"), None);
        assert_eq!(parse_packed_offering_id("abc:o:"), None);
        assert_eq!(parse_packed_offering_id("a:o:b:o:c"), None);
    }

    #[test]
    fn projection_completeness_follows_errors() {
        let mut p = Projection::default();
        assert!(p.is_complete());
        p.warnings.push("w".to_string());
        assert!(p.is_complete());
        p.errors.push(ProjectionError::Malformed {
            config: "c".to_string(),
            reason: "r".to_string(),
        });
        assert!(!p.is_complete());
    }
}
