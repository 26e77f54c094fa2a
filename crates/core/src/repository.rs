use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::secret::Secret;

/// Provider credentials for one repository. Exactly one scheme is ever held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    B2 {
        account_id: Secret,
        account_key: Secret,
    },
    S3 {
        access_key_id: Secret,
        secret_access_key: Secret,
    },
}

impl Credentials {
    pub fn scheme(&self) -> &'static str {
        match self {
            Credentials::B2 { .. } => "b2",
            Credentials::S3 { .. } => "s3",
        }
    }
}

/// One backup destination as loaded from the repository descriptor file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct RepositoryDescriptor {
    pub url: String,
    pub credentials: Credentials,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("repository {url}: b2AccountId is set but b2AccountKey is missing")]
    MissingB2AccountKey { url: String },
    #[error("repository {url}: no b2AccountId and no complete accessKeyId/secretAccessKey pair")]
    MissingS3Credentials { url: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    url: String,
    b2_account_id: Option<Secret>,
    b2_account_key: Option<Secret>,
    access_key_id: Option<Secret>,
    secret_access_key: Option<Secret>,
}

impl TryFrom<RawDescriptor> for RepositoryDescriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        // A B2 account id wins even when S3 keys are also present.
        let credentials = match (raw.b2_account_id, raw.b2_account_key) {
            (Some(account_id), Some(account_key)) => Credentials::B2 {
                account_id,
                account_key,
            },
            (Some(_), None) => return Err(DescriptorError::MissingB2AccountKey { url: raw.url }),
            (None, _) => match (raw.access_key_id, raw.secret_access_key) {
                (Some(access_key_id), Some(secret_access_key)) => Credentials::S3 {
                    access_key_id,
                    secret_access_key,
                },
                _ => return Err(DescriptorError::MissingS3Credentials { url: raw.url }),
            },
        };

        Ok(Self {
            url: raw.url,
            credentials,
        })
    }
}

/// Fleet-wide inputs shared by every repository in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupConfiguration {
    pub paths: Vec<PathBuf>,
    pub exclude_patterns: Vec<String>,
    pub exclude_files: Vec<PathBuf>,
    /// Number of daily snapshots to retain. `0` disables pruning.
    pub keep_daily: u32,
}

impl BackupConfiguration {
    pub fn prune_enabled(&self) -> bool {
        self.keep_daily > 0
    }
}
