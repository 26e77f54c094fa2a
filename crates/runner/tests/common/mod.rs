//! Engine and exporter fakes shared by the runner integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use restic_fleet_core::{
    BackupConfiguration, BackupSummary, CredentialScope, Credentials, EngineVersion, Phase,
    RepositoryDescriptor, Secret, StatsSummary,
};
use restic_fleet_engine::{Engine, ResticConfig};
use restic_fleet_metrics::MetricsExporter;
use restic_fleet_runner::config::Settings;

#[derive(Debug, Clone)]
pub struct Call {
    pub repo: String,
    pub phase: Phase,
    pub env: Vec<(String, String)>,
}

#[derive(Default)]
pub struct FakeEngine {
    pub failures: Vec<(String, Phase)>,
    pub calls: Mutex<Vec<Call>>,
    pub backup_configs: Mutex<Vec<BackupConfiguration>>,
    pub rewrite_excludes: Mutex<Vec<Vec<PathBuf>>>,
    pub version_calls: Mutex<usize>,
    /// Copy each scope's credentials into the process environment, the way an
    /// engine built on ambient variables would.
    pub export_to_process_env: bool,
}

impl FakeEngine {
    pub fn failing(repo: &str, phase: Phase) -> Self {
        Self {
            failures: vec![(repo.to_owned(), phase)],
            ..Default::default()
        }
    }

    fn step(&self, scope: &CredentialScope, phase: Phase) -> Result<()> {
        assert!(scope.is_active(), "engine called with an inactive scope");
        if self.export_to_process_env {
            for (key, value) in scope.env_vars() {
                std::env::set_var(key, value);
            }
        }
        self.calls.lock().unwrap().push(Call {
            repo: scope.repository().to_owned(),
            phase,
            env: scope
                .env_vars()
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        });
        if self
            .failures
            .iter()
            .any(|(repo, p)| repo == scope.repository() && *p == phase)
        {
            bail!("simulated {phase} failure for {}", scope.repository());
        }
        Ok(())
    }

    pub fn phases_for(&self, repo: &str) -> Vec<Phase> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.repo == repo)
            .map(|c| c.phase)
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Engine for FakeEngine {
    async fn version(&self) -> Result<EngineVersion> {
        *self.version_calls.lock().unwrap() += 1;
        Ok(EngineVersion {
            engine_version: "0.16.4".to_owned(),
            platform: "linux".to_owned(),
            arch: "amd64".to_owned(),
            runtime_version: "1.21.6".to_owned(),
        })
    }

    async fn unlock(&self, scope: &CredentialScope) -> Result<()> {
        self.step(scope, Phase::Unlock)
    }

    async fn backup(
        &self,
        scope: &CredentialScope,
        config: &BackupConfiguration,
    ) -> Result<BackupSummary> {
        self.step(scope, Phase::Backup)?;
        self.backup_configs.lock().unwrap().push(config.clone());
        Ok(BackupSummary {
            message_type: "summary".to_owned(),
            files_new: 2,
            files_changed: 1,
            data_added: 4096,
            total_files_processed: 10,
            total_bytes_processed: 1 << 20,
            total_duration: 75.0,
            snapshot_id: Some("deadbeef".to_owned()),
            ..Default::default()
        })
    }

    async fn prune(&self, scope: &CredentialScope, _keep_daily: u32) -> Result<()> {
        self.step(scope, Phase::Prune)
    }

    async fn stats(&self, scope: &CredentialScope) -> Result<StatsSummary> {
        self.step(scope, Phase::Stats)?;
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(StatsSummary {
            total_size: 1 << 30,
            total_file_count: 1234,
            snapshots_count: 7,
            duration: 0.0,
        })
    }

    async fn rewrite(&self, scope: &CredentialScope, exclude_files: &[PathBuf]) -> Result<()> {
        self.step(scope, Phase::Rewrite)?;
        self.rewrite_excludes
            .lock()
            .unwrap()
            .push(exclude_files.to_vec());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingExporter {
    pub points: Arc<Mutex<Vec<(String, f64, String)>>>,
}

impl RecordingExporter {
    pub fn names_for(&self, repo: &str) -> Vec<String> {
        self.points
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, _, r)| r == repo)
            .map(|(name, _, _)| name.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl MetricsExporter for RecordingExporter {
    async fn write_measurement(&self, name: &str, value: f64, repo: &str) -> Result<()> {
        self.points
            .lock()
            .unwrap()
            .push((name.to_owned(), value, repo.to_owned()));
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "recording"
    }
}

pub struct BrokenExporter;

#[async_trait::async_trait]
impl MetricsExporter for BrokenExporter {
    async fn write_measurement(&self, _name: &str, _value: f64, _repo: &str) -> Result<()> {
        bail!("metrics backend is down")
    }

    fn backend(&self) -> &'static str {
        "broken"
    }
}

pub fn b2_repo(url: &str) -> RepositoryDescriptor {
    RepositoryDescriptor {
        url: url.to_owned(),
        credentials: Credentials::B2 {
            account_id: Secret::new(format!("{url}-id")),
            account_key: Secret::new(format!("{url}-key")),
        },
    }
}

pub fn s3_repo(url: &str) -> RepositoryDescriptor {
    RepositoryDescriptor {
        url: url.to_owned(),
        credentials: Credentials::S3 {
            access_key_id: Secret::new(format!("{url}-akid")),
            secret_access_key: Secret::new(format!("{url}-secret")),
        },
    }
}

pub fn settings(dir: &Path, paths_file: Option<PathBuf>) -> Settings {
    Settings {
        engine: ResticConfig {
            binary: PathBuf::from("restic"),
            password_file: dir.join("password"),
        },
        repos_file: dir.join("repos.json"),
        backup_paths_file: paths_file,
        exclude_patterns: Vec::new(),
        exclude_files: vec![dir.join("excludes")],
        keep_daily: 5,
        metrics: None,
    }
}

