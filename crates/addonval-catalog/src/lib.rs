//! addonval-catalog: collaborator boundary for addon validation
//!
//! This crate defines the shapes of data the validation engine consumes from
//! catalog, project and config services, and the async traits those services
//! implement. It carries no provider client: real backends live outside the
//! workspace, and `fakes::MemoryPlatform` replays JSON fixtures for tests and
//! the CLI.
//!
//! ## Key Components
//!
//! - `CatalogService`: offering metadata, constraint resolution, locator lookups
//! - `ProjectService`: deploys, config details, shared catalog import, teardown
//! - `UnitConfig`: the user-authored configuration tree

pub mod constraint;
mod error;
pub mod fakes;
pub mod model;
pub mod service_traits;

pub use error::CatalogError;
pub use model::{
    ConfigDefinition, ConfigDetails, DependencyDeclaration, DeployedConfig, Flavor, Offering,
    OfferingImport, OfferingVersion, ProjectConfig, SharedCatalog, UnitConfig, VersionMetadata,
    FALLBACK_FLAVOR, PACKED_OFFERING_SEPARATOR,
};
pub use service_traits::{
    AddonPlatform, CatalogResult, CatalogService, ProjectService, ResolvedVersion,
};
