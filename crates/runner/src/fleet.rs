use std::future::Future;
use std::path::PathBuf;

use restic_fleet_core::{BackupConfiguration, RepositoryDescriptor};
use restic_fleet_engine::Engine;
use restic_fleet_metrics::Metrics;
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

use crate::pipeline::{BackupReport, PhaseFailure, RepositoryPipeline};

#[derive(Debug)]
pub struct RepositoryOutcome<T> {
    pub url: String,
    pub result: Result<T, PhaseFailure>,
}

impl<T> RepositoryOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug)]
pub struct FleetReport<T> {
    pub run_id: Uuid,
    pub outcomes: Vec<RepositoryOutcome<T>>,
}

impl<T> FleetReport<T> {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Runs a pipeline over every repository, one at a time, in order.
///
/// A failed repository is logged and recorded; it never stops the repositories
/// after it.
pub struct FleetRunner<'a> {
    pipeline: RepositoryPipeline<'a>,
}

impl<'a> FleetRunner<'a> {
    pub fn new(engine: &'a dyn Engine, metrics: &'a Metrics) -> Self {
        Self {
            pipeline: RepositoryPipeline::new(engine, metrics),
        }
    }

    pub async fn backup_all(
        &self,
        repos: &[RepositoryDescriptor],
        config: &BackupConfiguration,
    ) -> FleetReport<BackupReport> {
        run_each(repos, |repo| self.pipeline.backup(repo, config)).await
    }

    pub async fn rewrite_all(
        &self,
        repos: &[RepositoryDescriptor],
        exclude_files: &[PathBuf],
    ) -> FleetReport<()> {
        run_each(repos, |repo| self.pipeline.rewrite(repo, exclude_files)).await
    }
}

async fn run_each<'r, T, F, Fut>(repos: &'r [RepositoryDescriptor], mut run: F) -> FleetReport<T>
where
    F: FnMut(&'r RepositoryDescriptor) -> Fut,
    Fut: Future<Output = Result<T, PhaseFailure>>,
{
    let run_id = Uuid::new_v4();
    let mut outcomes = Vec::with_capacity(repos.len());

    async {
        for repo in repos {
            let result = run(repo)
                .instrument(info_span!("repository", repo = %repo.url))
                .await;
            if let Err(failure) = &result {
                error!(
                    repo = %repo.url,
                    phase = %failure.phase,
                    error = %format!("{:#}", failure.error),
                    "Processing repo failed"
                );
            }
            outcomes.push(RepositoryOutcome {
                url: repo.url.clone(),
                result,
            });
        }
    }
    .instrument(info_span!("fleet_run", %run_id))
    .await;

    FleetReport { run_id, outcomes }
}
