use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use anyhow::Result;
use async_trait::async_trait;
use restic_fleet_core::{
    BackupConfiguration, BackupSummary, CredentialScope, EngineVersion, StatsSummary,
    CREDENTIAL_ENV_KEYS,
};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Operations the fleet needs from the backup engine.
///
/// Every repository operation takes the [`CredentialScope`] it runs under, so
/// an implementation never holds state between repositories.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn version(&self) -> Result<EngineVersion>;

    /// Clears stale locks. Must precede the other repository operations.
    async fn unlock(&self, scope: &CredentialScope) -> Result<()>;

    async fn backup(
        &self,
        scope: &CredentialScope,
        config: &BackupConfiguration,
    ) -> Result<BackupSummary>;

    async fn prune(&self, scope: &CredentialScope, keep_daily: u32) -> Result<()>;

    /// Size report in `files-by-contents` mode. `duration` is left at zero.
    async fn stats(&self, scope: &CredentialScope) -> Result<StatsSummary>;

    /// Removes files matching `exclude_files` from existing snapshots and
    /// forgets the originals.
    async fn rewrite(&self, scope: &CredentialScope, exclude_files: &[PathBuf]) -> Result<()>;
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },
    #[error("restic {operation} failed ({status}): {stderr}")]
    Failed {
        operation: &'static str,
        status: ExitStatus,
        stderr: String,
    },
    #[error("could not parse restic {operation} output: {source}")]
    Parse {
        operation: &'static str,
        source: serde_json::Error,
    },
    #[error("restic backup finished without a summary message")]
    MissingSummary,
    #[error("unrecognized restic version output: {0:?}")]
    Version(String),
    #[error("credential scope for {repository} is no longer active")]
    InactiveScope { repository: String },
}

#[derive(Debug, Clone)]
pub struct ResticConfig {
    /// Path to the restic binary, or a bare name resolved through `PATH`.
    pub binary: PathBuf,
    pub password_file: PathBuf,
}

/// Drives restic as a child process.
///
/// Credentials reach restic only through the child's environment. All four
/// credential keys are stripped from what the child inherits before the
/// active scheme's pair is set, so a stray key in the parent can never reach a
/// different repository.
#[derive(Debug, Clone)]
pub struct ResticEngine {
    config: ResticConfig,
}

impl ResticEngine {
    pub fn new(config: ResticConfig) -> Self {
        Self { config }
    }

    fn command(&self, scope: Option<&CredentialScope>) -> Result<Command, EngineError> {
        let mut cmd = Command::new(&self.config.binary);
        for key in CREDENTIAL_ENV_KEYS {
            cmd.env_remove(key);
        }
        if let Some(scope) = scope {
            if !scope.is_active() {
                return Err(EngineError::InactiveScope {
                    repository: scope.repository().to_owned(),
                });
            }
            cmd.arg("--repo").arg(scope.repository());
            cmd.arg("--password-file").arg(&self.config.password_file);
            cmd.envs(scope.env_vars());
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        Ok(cmd)
    }

    async fn run(
        &self,
        scope: Option<&CredentialScope>,
        operation: &'static str,
        args: Vec<OsString>,
    ) -> Result<String, EngineError> {
        let mut cmd = self.command(scope)?;
        cmd.args(args);
        debug!(
            operation,
            repo = scope.map(CredentialScope::repository),
            "running restic"
        );

        let out = cmd.output().await.map_err(|source| EngineError::Spawn {
            binary: self.config.binary.display().to_string(),
            source,
        })?;
        if !out.status.success() {
            return Err(EngineError::Failed {
                operation,
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

#[async_trait]
impl Engine for ResticEngine {
    async fn version(&self) -> Result<EngineVersion> {
        let stdout = self.run(None, "version", vec!["version".into()]).await?;
        Ok(parse_version(&stdout)?)
    }

    async fn unlock(&self, scope: &CredentialScope) -> Result<()> {
        self.run(Some(scope), "unlock", vec!["unlock".into()]).await?;
        Ok(())
    }

    async fn backup(
        &self,
        scope: &CredentialScope,
        config: &BackupConfiguration,
    ) -> Result<BackupSummary> {
        let stdout = self.run(Some(scope), "backup", backup_args(config)).await?;
        Ok(parse_backup_output(&stdout)?)
    }

    async fn prune(&self, scope: &CredentialScope, keep_daily: u32) -> Result<()> {
        let args = vec![
            "forget".into(),
            "--prune".into(),
            "--keep-daily".into(),
            keep_daily.to_string().into(),
        ];
        self.run(Some(scope), "forget", args).await?;
        Ok(())
    }

    async fn stats(&self, scope: &CredentialScope) -> Result<StatsSummary> {
        let args = vec![
            "stats".into(),
            "--json".into(),
            "--mode".into(),
            "files-by-contents".into(),
        ];
        let stdout = self.run(Some(scope), "stats", args).await?;
        Ok(parse_stats_output(&stdout)?)
    }

    async fn rewrite(&self, scope: &CredentialScope, exclude_files: &[PathBuf]) -> Result<()> {
        let mut args: Vec<OsString> = vec!["rewrite".into(), "--forget".into()];
        push_flagged(&mut args, "--exclude-file", exclude_files);
        self.run(Some(scope), "rewrite", args).await?;
        Ok(())
    }
}

fn push_flagged<T: AsRef<Path>>(args: &mut Vec<OsString>, flag: &str, values: &[T]) {
    for value in values {
        args.push(flag.into());
        args.push(value.as_ref().as_os_str().to_owned());
    }
}

fn backup_args(config: &BackupConfiguration) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["backup".into(), "--json".into()];
    push_flagged(&mut args, "--exclude", &config.exclude_patterns);
    push_flagged(&mut args, "--exclude-file", &config.exclude_files);
    args.extend(config.paths.iter().map(|p| p.as_os_str().to_owned()));
    args
}

/// Picks the final `summary` message out of `restic backup --json` output,
/// skipping status lines and anything that does not parse as JSON.
pub fn parse_backup_output(stdout: &str) -> Result<BackupSummary, EngineError> {
    let summary = json_lines(stdout).find(|value| {
        value.get("message_type").and_then(|v| v.as_str()) == Some("summary")
    });
    match summary {
        Some(value) => serde_json::from_value(value).map_err(|source| EngineError::Parse {
            operation: "backup",
            source,
        }),
        None => Err(EngineError::MissingSummary),
    }
}

/// Parses the report object of `restic stats --json`, ignoring any text
/// printed before it.
pub fn parse_stats_output(stdout: &str) -> Result<StatsSummary, EngineError> {
    let last = stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .last()
        .unwrap_or_else(|| stdout.trim());
    serde_json::from_str(last).map_err(|source| EngineError::Parse {
        operation: "stats",
        source,
    })
}

/// JSON objects in `stdout`, last line first. Truncated or non-JSON lines are dropped.
fn json_lines(stdout: &str) -> impl Iterator<Item = serde_json::Value> + '_ {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .filter_map(|line| serde_json::from_str(line).ok())
}

/// Parses `restic 0.16.4 compiled with go1.21.6 on linux/amd64`.
pub fn parse_version(stdout: &str) -> Result<EngineVersion, EngineError> {
    let line = stdout.lines().next().unwrap_or_default().trim();
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["restic", version, "compiled", "with", runtime, "on", target, ..] => {
            let (platform, arch) = target.split_once('/').unwrap_or((*target, ""));
            Ok(EngineVersion {
                engine_version: (*version).to_owned(),
                platform: platform.to_owned(),
                arch: arch.to_owned(),
                runtime_version: runtime.trim_start_matches("go").to_owned(),
            })
        }
        _ => Err(EngineError::Version(line.to_owned())),
    }
}
