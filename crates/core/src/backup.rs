use std::fmt;

use serde::{Deserialize, Serialize};

/// The phases a repository passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Unlock,
    Backup,
    Prune,
    Stats,
    Rewrite,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Unlock => "unlock",
            Phase::Backup => "backup",
            Phase::Prune => "prune",
            Phase::Stats => "stats",
            Phase::Rewrite => "rewrite",
        };
        f.write_str(name)
    }
}

/// Engine build information, logged once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineVersion {
    pub engine_version: String,
    pub platform: String,
    pub arch: String,
    pub runtime_version: String,
}

/// Summary message emitted by `restic backup --json` when a snapshot completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSummary {
    pub message_type: String,
    pub files_new: u64,
    pub files_changed: u64,
    pub files_unmodified: u64,
    pub dirs_new: u64,
    pub dirs_changed: u64,
    pub dirs_unmodified: u64,
    pub data_blobs: i64,
    pub tree_blobs: i64,
    pub data_added: u64,
    pub total_files_processed: u64,
    pub total_bytes_processed: u64,
    /// Seconds.
    pub total_duration: f64,
    pub snapshot_id: Option<String>,
}

impl BackupSummary {
    /// Numeric fields forwarded to the metrics exporter. `message_type` and
    /// `snapshot_id` are transport metadata and are left out.
    pub fn measurements(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("files new", self.files_new as f64),
            ("files changed", self.files_changed as f64),
            ("files unmodified", self.files_unmodified as f64),
            ("dirs new", self.dirs_new as f64),
            ("dirs changed", self.dirs_changed as f64),
            ("dirs unmodified", self.dirs_unmodified as f64),
            ("data blobs", self.data_blobs as f64),
            ("tree blobs", self.tree_blobs as f64),
            ("bytes added", self.data_added as f64),
            ("files processed", self.total_files_processed as f64),
            ("bytes processed", self.total_bytes_processed as f64),
            ("backup duration", self.total_duration),
        ]
    }
}

/// Output of `restic stats --mode files-by-contents`, plus the time the call took.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSummary {
    pub total_size: u64,
    pub total_file_count: u64,
    pub snapshots_count: u64,
    /// Seconds. Not reported by the engine; filled in by the caller.
    pub duration: f64,
}

impl StatsSummary {
    pub fn measurements(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("total size", self.total_size as f64),
            ("total files", self.total_file_count as f64),
            ("snapshots", self.snapshots_count as f64),
            ("stats duration", self.duration),
        ]
    }
}

/// Whether the retention phase ran for a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruneStatus {
    Pruned { keep_daily: u32 },
    Skipped,
}
