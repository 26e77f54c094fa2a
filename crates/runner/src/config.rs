use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use restic_fleet_core::RepositoryDescriptor;
use restic_fleet_engine::ResticConfig;
use restic_fleet_metrics::InfluxConfig;
use serde::Deserialize;

use crate::cli::Cli;

pub const DEFAULT_RESTIC_BINARY: &str = "restic";
pub const DEFAULT_METRICS_PORT: u16 = 8086;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub backup: BackupFilesConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub binary: Option<PathBuf>,
    pub password_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct BackupFilesConfig {
    pub paths_file: Option<PathBuf>,
    pub repos_file: Option<PathBuf>,
    pub exclude: Vec<String>,
    pub exclude_file: Vec<PathBuf>,
    pub keep_daily: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub host_tag: Option<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading config file {path:?}"))?;
    toml::from_str(&contents).with_context(|| format!("parsing config file {path:?}"))
}

/// Flags merged over the config file, with built-in defaults filled in.
#[derive(Debug, Clone)]
pub struct Settings {
    pub engine: ResticConfig,
    pub repos_file: PathBuf,
    pub backup_paths_file: Option<PathBuf>,
    pub exclude_patterns: Vec<String>,
    pub exclude_files: Vec<PathBuf>,
    pub keep_daily: u32,
    pub metrics: Option<InfluxConfig>,
}

impl Settings {
    pub fn resolve(cli: &Cli, cfg: Config) -> Result<Self> {
        let Some(password_file) = cli.password_file.clone().or(cfg.engine.password_file) else {
            bail!("--password-file is required");
        };
        let Some(repos_file) = cli.repos_file.clone().or(cfg.backup.repos_file) else {
            bail!("--repos-file is required");
        };

        let metrics = match cli.metrics_host.clone().or(cfg.metrics.host) {
            Some(host) => {
                let Some(database) = cli.metrics_database.clone().or(cfg.metrics.database) else {
                    bail!("--metrics-database is required when --metrics-host is set");
                };
                Some(InfluxConfig {
                    host,
                    port: cli
                        .metrics_port
                        .or(cfg.metrics.port)
                        .unwrap_or(DEFAULT_METRICS_PORT),
                    database,
                    host_tag: cli.metrics_host_tag.clone().or(cfg.metrics.host_tag),
                })
            }
            None => None,
        };

        Ok(Self {
            engine: ResticConfig {
                binary: cli
                    .restic_path
                    .clone()
                    .or(cfg.engine.binary)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_RESTIC_BINARY)),
                password_file,
            },
            repos_file,
            backup_paths_file: cli.backup_paths_file.clone().or(cfg.backup.paths_file),
            exclude_patterns: non_empty_or(&cli.exclude, cfg.backup.exclude),
            exclude_files: non_empty_or(&cli.exclude_file, cfg.backup.exclude_file),
            keep_daily: cli.keep_daily.or(cfg.backup.keep_daily).unwrap_or(0),
            metrics,
        })
    }
}

fn non_empty_or<T: Clone>(flags: &[T], fallback: Vec<T>) -> Vec<T> {
    if flags.is_empty() {
        fallback
    } else {
        flags.to_vec()
    }
}

/// Reads the newline-delimited backup path list. Blank lines are skipped.
pub fn read_backup_paths(path: &Path) -> Result<Vec<PathBuf>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading backup paths file {path:?}"))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

pub fn read_repositories(path: &Path) -> Result<Vec<RepositoryDescriptor>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading repositories file {path:?}"))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing repositories file {path:?}"))
}
