use std::path::PathBuf;
use std::time::Instant;

use restic_fleet_core::{
    format_integer, human_size, human_time, BackupConfiguration, BackupSummary, CredentialScope,
    Phase, PruneStatus, RepositoryDescriptor, StatsSummary,
};
use restic_fleet_engine::Engine;
use restic_fleet_metrics::Metrics;
use thiserror::Error;
use tracing::info;

/// Why a repository's pipeline stopped.
#[derive(Debug, Error)]
#[error("{phase} failed: {error:#}")]
pub struct PhaseFailure {
    pub phase: Phase,
    pub error: anyhow::Error,
}

impl PhaseFailure {
    fn at(phase: Phase) -> impl FnOnce(anyhow::Error) -> Self {
        move |error| Self { phase, error }
    }
}

/// Everything a successful backup sweep learned about one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupReport {
    pub backup: BackupSummary,
    pub prune: PruneStatus,
    pub stats: StatsSummary,
}

/// Runs the per-repository phases: unlock, backup, prune, stats.
///
/// A failing phase ends the pipeline for that repository; later phases never
/// run and nothing is retried. The credential scope is released on every
/// path out.
pub struct RepositoryPipeline<'a> {
    engine: &'a dyn Engine,
    metrics: &'a Metrics,
}

impl<'a> RepositoryPipeline<'a> {
    pub fn new(engine: &'a dyn Engine, metrics: &'a Metrics) -> Self {
        Self { engine, metrics }
    }

    pub async fn backup(
        &self,
        repo: &RepositoryDescriptor,
        config: &BackupConfiguration,
    ) -> Result<BackupReport, PhaseFailure> {
        info!("Backing up to {}...", repo.url);
        let mut scope = CredentialScope::activate(repo);
        let result = self.backup_phases(&scope, config).await;
        scope.deactivate();
        result
    }

    async fn backup_phases(
        &self,
        scope: &CredentialScope,
        config: &BackupConfiguration,
    ) -> Result<BackupReport, PhaseFailure> {
        let repo = scope.repository();

        self.engine
            .unlock(scope)
            .await
            .map_err(PhaseFailure::at(Phase::Unlock))?;

        let backup = self
            .engine
            .backup(scope, config)
            .await
            .map_err(PhaseFailure::at(Phase::Backup))?;
        log_backup_summary(&backup);
        self.metrics.record(repo, &backup.measurements()).await;

        let prune = if config.prune_enabled() {
            info!("Pruning repo {repo}...");
            self.engine
                .prune(scope, config.keep_daily)
                .await
                .map_err(PhaseFailure::at(Phase::Prune))?;
            info!("Prune complete");
            PruneStatus::Pruned {
                keep_daily: config.keep_daily,
            }
        } else {
            info!("Skipping prune of {repo}: keep-daily is 0, nothing would be removed");
            PruneStatus::Skipped
        };

        info!("Retrieving stats for repo {repo}...");
        let started = Instant::now();
        let mut stats = self
            .engine
            .stats(scope)
            .await
            .map_err(PhaseFailure::at(Phase::Stats))?;
        stats.duration = started.elapsed().as_secs_f64();
        log_stats_summary(&stats);
        self.metrics.record(repo, &stats.measurements()).await;

        Ok(BackupReport {
            backup,
            prune,
            stats,
        })
    }

    /// Unlocks the repository and rewrites its snapshots without files
    /// matching `exclude_files`.
    pub async fn rewrite(
        &self,
        repo: &RepositoryDescriptor,
        exclude_files: &[PathBuf],
    ) -> Result<(), PhaseFailure> {
        info!("Rewriting snapshots in {}...", repo.url);
        let mut scope = CredentialScope::activate(repo);
        let result = self.rewrite_phases(&scope, exclude_files).await;
        scope.deactivate();
        result
    }

    async fn rewrite_phases(
        &self,
        scope: &CredentialScope,
        exclude_files: &[PathBuf],
    ) -> Result<(), PhaseFailure> {
        self.engine
            .unlock(scope)
            .await
            .map_err(PhaseFailure::at(Phase::Unlock))?;
        self.engine
            .rewrite(scope, exclude_files)
            .await
            .map_err(PhaseFailure::at(Phase::Rewrite))?;
        info!("Rewrite complete");
        Ok(())
    }
}

fn log_backup_summary(summary: &BackupSummary) {
    info!("{} added", human_size(summary.data_added));
    info!("{} files changed", format_integer(summary.files_changed));
    info!("{} new files", format_integer(summary.files_new));
    info!(
        "{} ({}) files processed",
        format_integer(summary.total_files_processed),
        human_size(summary.total_bytes_processed)
    );
    info!("Duration: {}", human_time(summary.total_duration));
}

fn log_stats_summary(stats: &StatsSummary) {
    info!(
        "{} files ({})",
        format_integer(stats.total_file_count),
        human_size(stats.total_size)
    );
    info!("{} snapshots", format_integer(stats.snapshots_count));
    info!("Stats duration: {}", human_time(stats.duration));
}
