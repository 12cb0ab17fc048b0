//! addonval - addon deployment validation CLI
//!
//! Replays a JSON platform fixture through the validation engine.
//!
//! ## Commands
//!
//! - `validate`: deploy the fixture's root once and check it against its
//!   dependency graph
//! - `permutations`: run every enable/disable combination of the root's
//!   optional dependencies and print the batch report
//! - `report`: re-render a saved batch report

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{info, Level};

use addonval_catalog::fakes::{MemoryPlatform, PlatformFixture};
use addonval_catalog::{OfferingImport, ProjectConfig, ProjectService, UnitConfig};
use addonval_core::aggregate::{read_report_json, render_batch_report, write_report_json};
use addonval_core::{
    aggregate, generate_permutations, render_dependency_tree, validate_deployment,
    AggregateReport, BatchConfig, Collaborators, DependencyGraphResult, DeploymentCheck,
    GraphBuilder, Permutation, PermutationRunner, Projector, ReportArtifact, ValidationResult,
};

#[derive(Parser)]
#[command(name = "addonval")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Addon deployment validation and permutation reporting", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the fixture's root configuration once and validate it
    Validate {
        /// Platform fixture (JSON)
        #[arg(short, long)]
        fixture: PathBuf,
    },

    /// Run every dependency permutation of the fixture's root
    Permutations {
        /// Platform fixture (JSON)
        #[arg(short, long)]
        fixture: PathBuf,

        /// Runs per stagger group
        #[arg(long, env = "ADDONVAL_BATCH_SIZE")]
        batch_size: Option<usize>,

        /// Delay between stagger groups, in milliseconds
        #[arg(long, env = "ADDONVAL_BATCH_DELAY_MS")]
        batch_delay_ms: Option<u64>,

        /// Delay between runs inside a group, in milliseconds
        #[arg(long, env = "ADDONVAL_RUN_DELAY_MS")]
        run_delay_ms: Option<u64>,

        /// Write the batch report and analysis as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-render a report written by `permutations --output`
    Report {
        /// Saved batch report (JSON)
        #[arg(short, long)]
        results: PathBuf,
    },
}

/// Fixture file layout: the fake platform plus what to validate.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CliFixture {
    #[serde(flatten)]
    platform: PlatformFixture,
    root: UnitConfig,
    /// Optional dependencies to permute; read from the catalog when empty.
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    batch: Option<BatchConfig>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    addonval_core::telemetry::init_tracing(cli.json, level);

    let ok = match cli.command {
        Commands::Validate { fixture } => cmd_validate(&fixture).await?,
        Commands::Permutations {
            fixture,
            batch_size,
            batch_delay_ms,
            run_delay_ms,
            output,
        } => {
            let overrides = BatchOverrides {
                batch_size,
                batch_delay_ms,
                run_delay_ms,
            };
            let report = cmd_permutations(&fixture, &overrides, output.as_deref()).await?;
            report.failed_runs == 0
        }
        Commands::Report { results } => cmd_report(&results)?,
    };

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn load_fixture(path: &Path) -> Result<CliFixture> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    let fixture: CliFixture =
        serde_json::from_str(&raw).with_context(|| format!("parse fixture {:?}", path))?;
    if fixture.root.offering_name.is_empty() {
        bail!("fixture {:?} has no root offering_name", path);
    }
    Ok(fixture)
}

/// Optional dependency names of the root version, as declared in the catalog.
fn declared_dependencies(fixture: &CliFixture) -> Vec<String> {
    if !fixture.dependencies.is_empty() {
        return fixture.dependencies.clone();
    }
    fixture
        .platform
        .offerings
        .iter()
        .find_map(|o| o.find_version(&fixture.root.version_locator))
        .map(|v| v.dependencies.iter().map(|d| d.name.clone()).collect())
        .unwrap_or_default()
}

fn print_validation(result: &ValidationResult) {
    for message in &result.messages {
        println!("  {}", message);
    }
    for error in &result.configuration_errors {
        println!("  {}", error);
    }
}

/// Deploy the root once, then build, project and validate.
async fn check_root(
    root: &UnitConfig,
    platform: Arc<MemoryPlatform>,
) -> Result<(DependencyGraphResult, DeploymentCheck)> {
    let deployed = platform
        .deploy_addon_to_project(
            root,
            &ProjectConfig {
                project_name: "addonval-validate".to_string(),
                prefix: "cli".to_string(),
            },
        )
        .await
        .context("deploy root configuration")?;

    let graph = GraphBuilder::new(platform.clone())
        .build(
            &root.catalog_id,
            &root.offering_id,
            &root.version_locator,
            &root.offering_flavor,
            root,
        )
        .await
        .context("build dependency graph")?;

    let projection = Projector::new(platform.clone(), platform).project(&deployed).await;
    for warning in &projection.warnings {
        tracing::warn!(warning = %warning, "projection warning");
    }
    let check = validate_deployment(&graph, projection);
    Ok((graph, check))
}

async fn cmd_validate(path: &Path) -> Result<bool> {
    let fixture = load_fixture(path)?;
    let platform = Arc::new(MemoryPlatform::from_fixture(fixture.platform));
    let (graph, check) = check_root(&fixture.root, platform).await?;
    let result = &check.validation;

    if let Some(root_id) = graph.expected.first() {
        println!("Dependency tree:");
        print!("{}", render_dependency_tree(&graph, root_id));
    }
    println!();
    println!(
        "{} ({} expected)",
        if result.is_valid { "VALID" } else { "INVALID" },
        graph.expected.len()
    );
    print_validation(result);
    for error in &check.infrastructure_errors {
        println!("  unavailable: {}", error);
    }
    Ok(result.is_valid && check.infrastructure_errors.is_empty())
}

/// CLI and environment values that win over the fixture's batch settings.
#[derive(Debug, Default)]
struct BatchOverrides {
    batch_size: Option<usize>,
    batch_delay_ms: Option<u64>,
    run_delay_ms: Option<u64>,
}

impl BatchOverrides {
    fn apply(&self, mut config: BatchConfig) -> BatchConfig {
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(ms) = self.batch_delay_ms {
            config.batch_delay_ms = ms;
        }
        if let Some(ms) = self.run_delay_ms {
            config.run_delay_ms = ms;
        }
        config
    }
}

async fn cmd_permutations(
    path: &Path,
    overrides: &BatchOverrides,
    output: Option<&Path>,
) -> Result<AggregateReport> {
    let fixture = load_fixture(path)?;
    let names = declared_dependencies(&fixture);
    let config = overrides.apply(fixture.batch.clone().unwrap_or_default());
    let root = fixture.root;

    let mut permutations = vec![Permutation::new(
        format!("{}-default", root.offering_name),
        root.clone(),
    )];
    permutations.extend(generate_permutations(&root, &names));
    info!(
        runs = permutations.len(),
        dependencies = ?names,
        "running permutation batch"
    );

    let import = OfferingImport {
        catalog_name: format!("{}-catalog", config.project_name),
        offering_name: root.offering_name.clone(),
        flavor: root.offering_flavor.clone(),
        version_locator: (!root.version_locator.is_empty()).then(|| root.version_locator.clone()),
    };
    let platform = Arc::new(MemoryPlatform::from_fixture(fixture.platform));
    let runner = PermutationRunner::new(Collaborators::from_platform(platform), import, config);
    let report = runner.run_batch(permutations).await;

    let analysis = aggregate(&report);
    print!("{}", render_batch_report(&report, &analysis));

    if let Some(path) = output {
        write_report_json(path, &ReportArtifact::new(report.clone()))?;
        println!("Report written to {}", path.display());
    }
    Ok(report)
}

/// Re-derive the analysis from saved results so current mining rules apply.
fn cmd_report(path: &Path) -> Result<bool> {
    let artifact = read_report_json(path)?;
    let analysis = aggregate(&artifact.report);
    print!("{}", render_batch_report(&artifact.report, &analysis));
    Ok(artifact.report.failed_runs == 0)
}
