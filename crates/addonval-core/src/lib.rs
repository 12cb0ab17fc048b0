//! addonval core library
//!
//! Expands catalog dependency trees into expected deployments, projects what
//! was actually deployed back onto the same identities, validates one
//! against the other, and aggregates the outcomes of permutation batches
//! into root-cause reports.

pub mod aggregate;
pub mod classifier;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod model;
pub mod obs;
pub mod permutation;
pub mod projector;
pub mod telemetry;
pub mod validator;

pub use aggregate::{
    aggregate, failure_report, AggregateAnalysis, BatchSummary, Completeness, Confidence,
    FailureReport, ReportArtifact, RootCausePattern, ValidationPattern,
};
pub use classifier::{categorize, classify, should_filter, ErrorType, FailureCategory};
pub use error::{CoreError, CoreResult, ProjectionError};
pub use graph::{render_dependency_tree, DependencyGraphResult, DisabledOfferings, GraphBuilder};
pub use model::{
    AggregateReport, CountMismatch, DependencyError, MissingInput, OfferingIdentity, RunResult,
    ValidationResult, VALIDATION_SUCCESS_MESSAGE,
};
pub use permutation::{
    generate_permutations, BatchConfig, Collaborators, Permutation, PermutationRunner,
};
pub use projector::{Projection, Projector};
pub use validator::{validate, validate_deployment, DeploymentCheck};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
