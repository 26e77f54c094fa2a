use anyhow::{Context, Result};
use clap::Parser;
use restic_fleet_engine::ResticEngine;
use restic_fleet_metrics::Metrics;
use restic_fleet_runner::cli::{Cli, Command};
use restic_fleet_runner::commands::{
    run_backup, run_rewrite, run_until_interrupted, with_cleared_credentials,
};
use restic_fleet_runner::config::{self, Config, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // The runtime lives entirely inside the cleared window; its worker threads
    // are gone before the environment is touched again.
    with_cleared_credentials(|| {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("build tokio runtime")?;
        runtime.block_on(run_until_interrupted(run(cli), tokio::signal::ctrl_c()))
    })
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = match &cli.config {
        Some(path) => {
            info!(?path, "loading config file");
            config::load_config(path)?
        }
        None => Config::default(),
    };
    let settings = Settings::resolve(&cli, cfg)?;
    let engine = ResticEngine::new(settings.engine.clone());

    match cli.command.unwrap_or(Command::Backup) {
        Command::Backup => {
            let metrics = Metrics::from_config(settings.metrics.clone())?;
            run_backup(&engine, &metrics, &settings).await?;
        }
        Command::Rewrite => {
            run_rewrite(&engine, &settings).await?;
        }
    }
    Ok(())
}
