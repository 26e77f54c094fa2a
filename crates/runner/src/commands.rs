use std::future::Future;

use anyhow::{anyhow, bail, Context, Result};
use restic_fleet_core::{clear_ambient_credentials, BackupConfiguration};
use restic_fleet_engine::Engine;
use restic_fleet_metrics::Metrics;
use tracing::{info, warn};

use crate::config::{read_backup_paths, read_repositories, Settings};
use crate::fleet::{FleetReport, FleetRunner};
use crate::pipeline::BackupReport;

async fn log_engine_version(engine: &dyn Engine) -> Result<()> {
    let version = engine.version().await.context("query restic version")?;
    info!(
        "Backing up with restic version {} ({}/{}/go{})",
        version.engine_version, version.platform, version.arch, version.runtime_version
    );
    Ok(())
}

/// The scheduled sweep: back up, prune and report on every repository.
///
/// Errors returned here are setup failures (engine missing, unreadable input
/// files) and happen before any repository is touched. Per-repository failures
/// are in the report.
pub async fn run_backup(
    engine: &dyn Engine,
    metrics: &Metrics,
    settings: &Settings,
) -> Result<FleetReport<BackupReport>> {
    log_engine_version(engine).await?;

    let Some(paths_file) = &settings.backup_paths_file else {
        bail!("--backup-paths-file is required for backups");
    };
    let config = BackupConfiguration {
        paths: read_backup_paths(paths_file)?,
        exclude_patterns: settings.exclude_patterns.clone(),
        exclude_files: settings.exclude_files.clone(),
        keep_daily: settings.keep_daily,
    };
    let repos = read_repositories(&settings.repos_file)?;
    info!(
        repositories = repos.len(),
        paths = config.paths.len(),
        metrics = metrics.backend(),
        "starting backup sweep"
    );

    let report = FleetRunner::new(engine, metrics)
        .backup_all(&repos, &config)
        .await;
    info!(
        run_id = %report.run_id,
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Backups complete!"
    );
    Ok(report)
}

/// Rewrites existing snapshots in every repository to drop excluded files.
pub async fn run_rewrite(engine: &dyn Engine, settings: &Settings) -> Result<FleetReport<()>> {
    log_engine_version(engine).await?;

    if settings.exclude_files.is_empty() {
        bail!("rewrite needs at least one --exclude-file");
    }
    let repos = read_repositories(&settings.repos_file)?;

    // Rewrites export no measurements.
    let metrics = Metrics::disabled();
    let report = FleetRunner::new(engine, &metrics)
        .rewrite_all(&repos, &settings.exclude_files)
        .await;
    info!(
        run_id = %report.run_id,
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Rewrites complete!"
    );
    Ok(report)
}

/// Clears every credential key from the process environment, runs `body`, and
/// clears them again whatever `body` returned.
///
/// `body` owns the async runtime, so both clears happen while this is the only
/// thread touching the environment.
pub fn with_cleared_credentials<T>(body: impl FnOnce() -> Result<T>) -> Result<T> {
    clear_ambient_credentials();
    let result = body();
    clear_ambient_credentials();
    info!("Cleared credential environment");
    result
}

/// Resolves once `signal` reports an interrupt. If the listener could not be
/// installed the error is logged and this never resolves.
pub async fn wait_for_interrupt<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {}
        Err(e) => {
            warn!(error = %e, "cannot listen for ctrl-c; an interrupt will not clean up");
            std::future::pending::<()>().await;
        }
    }
}

/// Runs `work` until it finishes or ctrl-c arrives. Dropping `work` kills any
/// in-flight restic child.
pub async fn run_until_interrupted<W, S>(work: W, signal: S) -> Result<()>
where
    W: Future<Output = Result<()>>,
    S: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = work => result,
        () = wait_for_interrupt(signal) => Err(anyhow!("interrupted; in-flight restic process killed")),
    }
}
