//! Error types for addonval-catalog

use thiserror::Error;

/// Errors surfaced by catalog, project and config collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Offering lookup by catalog + offering id failed
    #[error("offering not found: catalog={catalog_id} offering={offering_id}")]
    OfferingNotFound {
        catalog_id: String,
        offering_id: String,
    },

    /// No version satisfied the constraint for the requested flavor
    #[error("version not found for offering {offering_id}: constraint '{constraint}' flavor '{flavor}'")]
    VersionNotFound {
        offering_id: String,
        constraint: String,
        flavor: String,
    },

    /// Version locator did not resolve to a catalog version
    #[error("version locator not found: {0}")]
    LocatorNotFound(String),

    /// Project config lookup failed
    #[error("config not found: project={project_id} config={config_id}")]
    ConfigNotFound {
        project_id: String,
        config_id: String,
    },

    /// Version constraint could not be parsed
    #[error("invalid version constraint: {0}")]
    InvalidConstraint(String),

    /// Catalog / offering import failed
    #[error("catalog setup failed: {0}")]
    Setup(String),

    /// Deployment request failed
    #[error("deploy failed: {0}")]
    Deploy(String),

    /// Backend-side failure (timeouts, throttling, 5xx)
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Fixture (de)serialization error
    #[error("fixture serialization failed: {0}")]
    Serialization(String),
}

impl CatalogError {
    /// Whether the failure came from the backend rather than from the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Unavailable(_))
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Serialization(err.to_string())
    }
}
