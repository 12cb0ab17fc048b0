//! Parallel batch execution.
//!
//! Each permutation runs in its own task. The run body is spawned once more
//! inside that task so a panic surfaces as a `JoinError` at the run boundary
//! instead of tearing down the batch; teardown always runs afterwards.
//! Finished runs are sent over a channel to a single collector task.

use std::any::Any;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use addonval_catalog::{CatalogError, OfferingImport, ProjectService, SharedCatalog};
use futures::future::join_all;
use tokio::sync::{mpsc, OnceCell, Semaphore};
use tracing::{debug, error, instrument, warn, Instrument};

use crate::error::{CoreError, CoreResult};
use crate::metrics::METRICS;
use crate::model::{AggregateReport, RunResult};
use crate::obs;
use crate::permutation::run::{execute_run, record_error, Collaborators};
use crate::permutation::{BatchConfig, Permutation};

/// Catalog + offering created by the first run that needs it.
///
/// The creation outcome, success or failure, is stored once and handed to
/// every run.
pub struct SharedResource {
    import: OfferingImport,
    cell: OnceCell<Result<SharedCatalog, CatalogError>>,
}

impl SharedResource {
    pub fn new(import: OfferingImport) -> Self {
        Self {
            import,
            cell: OnceCell::new(),
        }
    }

    pub async fn get_or_create(&self, projects: &dyn ProjectService) -> CoreResult<SharedCatalog> {
        let outcome = self
            .cell
            .get_or_init(|| async {
                debug!(offering = %self.import.offering_name, "creating shared catalog");
                projects.create_catalog_and_offering(&self.import).await
            })
            .await;
        outcome.clone().map_err(CoreError::SharedResource)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Runs permutation batches against one set of collaborators.
pub struct PermutationRunner {
    collaborators: Collaborators,
    config: BatchConfig,
    shared: Arc<SharedResource>,
}

impl PermutationRunner {
    pub fn new(collaborators: Collaborators, import: OfferingImport, config: BatchConfig) -> Self {
        Self {
            collaborators,
            config,
            shared: Arc::new(SharedResource::new(import)),
        }
    }

    /// Run every permutation and collect the outcomes in input order.
    #[instrument(skip(self, permutations), fields(runs = permutations.len()))]
    pub async fn run_batch(&self, permutations: Vec<Permutation>) -> AggregateReport {
        let total = permutations.len();
        let (tx, mut rx) = mpsc::channel::<(usize, RunResult)>(total.max(1));
        let collector = tokio::spawn(async move {
            let mut collected = Vec::with_capacity(total);
            while let Some(entry) = rx.recv().await {
                collected.push(entry);
            }
            collected
        });

        let sem = Arc::new(Semaphore::new(self.config.permits()));
        let mut tasks = Vec::with_capacity(total);

        for (index, permutation) in permutations.into_iter().enumerate() {
            let delay = self.config.stagger_delay(index);
            let collaborators = self.collaborators.clone();
            let shared = Arc::clone(&self.shared);
            let sem = Arc::clone(&sem);
            let tx = tx.clone();
            let project_name = self.config.project_name.clone();

            tasks.push(tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let _permit = sem.acquire_owned().await.ok();
                let run = run_one(collaborators, shared, permutation, project_name).await;
                if tx.send((index, run)).await.is_err() {
                    error!(index, "result collector closed before run finished");
                }
            }));
        }
        drop(tx);

        for joined in join_all(tasks).await {
            if let Err(e) = joined {
                error!(error = %e, "permutation task failed outside the run boundary");
            }
        }

        let mut collected = match collector.await {
            Ok(collected) => collected,
            Err(e) => {
                error!(error = %e, "result collector failed");
                Vec::new()
            }
        };
        collected.sort_by_key(|(index, _)| *index);
        let results: Vec<RunResult> = collected.into_iter().map(|(_, run)| run).collect();

        let report = AggregateReport::from_results(results);
        obs::emit_batch_completed(report.total_runs, report.passed_runs, report.failed_runs);
        METRICS.flush();
        report
    }
}

async fn run_one(
    collaborators: Collaborators,
    shared: Arc<SharedResource>,
    permutation: Permutation,
    project_name: String,
) -> RunResult {
    let name = permutation.name.clone();
    let prefix = permutation.prefix.clone();
    let unit_config = permutation.unit_config.clone();
    let started = Instant::now();

    METRICS.inc_runs_started();
    obs::emit_run_started(&name, &prefix, &unit_config.disabled_dependency_names());

    let deployed_project = Arc::new(OnceLock::new());
    let mut run = match shared.get_or_create(collaborators.projects.as_ref()).await {
        Err(e) => {
            let mut run = RunResult::new(name.clone(), prefix.clone(), unit_config.clone());
            record_error(&mut run, &e);
            run
        }
        Ok(catalog) => {
            let body = tokio::spawn(
                execute_run(
                    collaborators.clone(),
                    catalog,
                    permutation,
                    project_name,
                    Arc::clone(&deployed_project),
                )
                .instrument(obs::run_span(&name, &prefix)),
            );
            match body.await {
                Ok(run) => run,
                Err(join_error) => {
                    let mut run = RunResult::new(name.clone(), prefix.clone(), unit_config.clone());
                    let message = if join_error.is_panic() {
                        METRICS.inc_panics_recovered();
                        format!("run panicked: {}", panic_message(join_error.into_panic().as_ref()))
                    } else {
                        format!("run task cancelled: {join_error}")
                    };
                    warn!(run = %name, error = %message, "recovered run failure");
                    run.runtime_errors.push(message);
                    run
                }
            }
        }
    };

    if let Some(project_id) = deployed_project.get() {
        if let Err(e) = collaborators.projects.undeploy_project(project_id).await {
            obs::emit_teardown_error(&name, &e);
        }
    }

    run.duration_ms = started.elapsed().as_millis() as u64;
    if !run.passed {
        METRICS.inc_runs_failed();
    }
    obs::emit_run_finished(&name, run.duration_ms, run.passed);
    run
}
