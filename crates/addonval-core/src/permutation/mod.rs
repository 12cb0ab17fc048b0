//! Permutation testing: generate dependency enable/disable combinations,
//! run each against the collaborators in parallel, and collect an
//! [`AggregateReport`](crate::model::AggregateReport).

mod config;
mod generate;
mod run;
mod runner;

pub use config::BatchConfig;
pub use generate::{generate_permutations, Permutation, MAX_PERMUTED_DEPENDENCIES};
pub use run::{execute_run, record_error, Collaborators};
pub use runner::{PermutationRunner, SharedResource};
