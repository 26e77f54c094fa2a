use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "restic-fleet")]
#[command(about = "Back up, prune and report on a fleet of restic repositories")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// TOML file supplying defaults for any flag not given here
    #[arg(long, global = true, env = "RESTIC_FLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the restic binary (if not in PATH)
    #[arg(long, global = true, env = "RESTIC_FLEET_RESTIC_PATH")]
    pub restic_path: Option<PathBuf>,

    /// Text file containing the repository password
    #[arg(long, global = true, env = "RESTIC_FLEET_PASSWORD_FILE")]
    pub password_file: Option<PathBuf>,

    /// Text file listing the paths to back up, one per line
    #[arg(long, global = true, env = "RESTIC_FLEET_BACKUP_PATHS_FILE")]
    pub backup_paths_file: Option<PathBuf>,

    /// JSON file containing the list of backup repositories
    #[arg(long, global = true, env = "RESTIC_FLEET_REPOS_FILE")]
    pub repos_file: Option<PathBuf>,

    /// Exclude pattern passed to restic (repeatable, or comma-separated)
    #[arg(long, global = true, env = "RESTIC_FLEET_EXCLUDE", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// File of exclude patterns passed to restic (repeatable, or comma-separated)
    #[arg(long, global = true, env = "RESTIC_FLEET_EXCLUDE_FILE", value_delimiter = ',')]
    pub exclude_file: Vec<PathBuf>,

    /// Daily snapshots to keep when pruning; 0 skips pruning
    #[arg(long, global = true, env = "RESTIC_FLEET_KEEP_DAILY")]
    pub keep_daily: Option<u32>,

    /// InfluxDB host; metrics are only exported when set
    #[arg(long, global = true, env = "RESTIC_FLEET_METRICS_HOST")]
    pub metrics_host: Option<String>,

    /// InfluxDB HTTP port [default: 8086]
    #[arg(long, global = true, env = "RESTIC_FLEET_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// InfluxDB database; required with --metrics-host
    #[arg(long, global = true, env = "RESTIC_FLEET_METRICS_DATABASE")]
    pub metrics_database: Option<String>,

    /// Value for the `host` tag on exported points
    #[arg(long, global = true, env = "RESTIC_FLEET_METRICS_HOST_TAG")]
    pub metrics_host_tag: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Back up, prune and report on every repository (default)
    Backup,
    /// Strip excluded files from existing snapshots in every repository
    Rewrite,
}
