//! Error taxonomy for the validation engine.
//!
//! Only resolution-stage failures are errors. Validation findings never are:
//! they live in [`crate::model::ValidationResult`].

use addonval_catalog::CatalogError;
use thiserror::Error;

use crate::classifier::FailureCategory;

/// Errors produced by graph building and batch setup.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The offering exists but has no version with the requested locator.
    #[error("version not found: offering {offering_id} has no version with locator {locator}")]
    VersionNotFound {
        offering_id: String,
        locator: String,
    },

    /// A collaborator lookup failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The batch-wide catalog/offering could not be created.
    #[error("shared catalog unavailable: {0}")]
    SharedResource(CatalogError),
}

impl CoreError {
    /// Bucket for this error, decided by variant and never by message text.
    pub fn category(&self) -> FailureCategory {
        match self {
            CoreError::VersionNotFound { .. } => FailureCategory::Validation,
            CoreError::Catalog(e) | CoreError::SharedResource(e) => catalog_category(e),
        }
    }
}

/// Backend unavailability is transient; every other collaborator error
/// means the request itself could not be satisfied.
pub fn catalog_category(error: &CatalogError) -> FailureCategory {
    if error.is_transient() {
        FailureCategory::Transient
    } else {
        FailureCategory::Validation
    }
}

/// Why one deployed config could not be mapped back to an identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// A collaborator call for this config failed.
    #[error("config {config}: failed to {action}: {source}")]
    Lookup {
        config: String,
        action: String,
        source: CatalogError,
    },

    /// The config or its catalog metadata is missing a field the walk needs.
    #[error("config {config}: {reason}")]
    Malformed { config: String, reason: String },
}

impl ProjectionError {
    pub fn category(&self) -> FailureCategory {
        match self {
            ProjectionError::Lookup { source, .. } => catalog_category(source),
            ProjectionError::Malformed { .. } => FailureCategory::Validation,
        }
    }
}

/// Result type for engine operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_not_found_names_offering_and_locator() {
        let err = CoreError::VersionNotFound {
            offering_id: "off-logs".to_string(),
            locator: "cat.logs-9".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("version not found"));
        assert!(msg.contains("off-logs"));
        assert!(msg.contains("cat.logs-9"));
    }

    #[test]
    fn catalog_errors_convert() {
        let err: CoreError = CatalogError::LocatorNotFound("loc".to_string()).into();
        assert!(matches!(err, CoreError::Catalog(_)));
        assert!(err.to_string().contains("loc"));
    }

    #[test]
    fn category_ignores_identifiers_in_the_message() {
        let locator = CoreError::VersionNotFound {
            offering_id: "off-logs".to_string(),
            locator: "1082e7d2-5429-4c1d-9e3a-0b1931fc.d4295b1e".to_string(),
        };
        assert_eq!(locator.category(), FailureCategory::Validation);

        let constraint = CoreError::Catalog(CatalogError::VersionNotFound {
            offering_id: "off-cos".to_string(),
            constraint: ">=1.500.0".to_string(),
            flavor: "standard".to_string(),
        });
        assert_eq!(constraint.category(), FailureCategory::Validation);

        let backend = CoreError::Catalog(CatalogError::Unavailable("lookup".to_string()));
        assert_eq!(backend.category(), FailureCategory::Transient);

        let setup = CoreError::SharedResource(CatalogError::Setup("quota 503 exceeded".to_string()));
        assert_eq!(setup.category(), FailureCategory::Validation);
    }

    #[test]
    fn projection_errors_keep_their_source() {
        let err = ProjectionError::Lookup {
            config: "cos-cfg".to_string(),
            action: "fetch details".to_string(),
            source: CatalogError::Unavailable("503 Service Unavailable".to_string()),
        };
        assert_eq!(err.category(), FailureCategory::Transient);
        assert!(err.to_string().starts_with("config cos-cfg: failed to fetch details: "));

        let malformed = ProjectionError::Malformed {
            config: "cos-cfg".to_string(),
            reason: "definition has no version locator".to_string(),
        };
        assert_eq!(malformed.category(), FailureCategory::Validation);
    }
}
