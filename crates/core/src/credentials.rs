use tracing::debug;

use crate::repository::{Credentials, RepositoryDescriptor};

pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const B2_ACCOUNT_ID: &str = "B2_ACCOUNT_ID";
pub const B2_ACCOUNT_KEY: &str = "B2_ACCOUNT_KEY";

/// Every environment key either credential scheme may populate.
pub const CREDENTIAL_ENV_KEYS: [&str; 4] = [
    AWS_ACCESS_KEY_ID,
    AWS_SECRET_ACCESS_KEY,
    B2_ACCOUNT_ID,
    B2_ACCOUNT_KEY,
];

/// Credentials of exactly one repository, bound for the duration of that
/// repository's pipeline.
///
/// The scope is an explicit value handed to every engine call rather than
/// process-wide state: the engine copies [`CredentialScope::env_vars`] into
/// the child process it spawns. Secrets are wiped when the scope is
/// deactivated or dropped, so every exit path releases them.
#[derive(Debug)]
pub struct CredentialScope {
    repository: String,
    credentials: Option<Credentials>,
}

impl CredentialScope {
    pub fn activate(descriptor: &RepositoryDescriptor) -> Self {
        debug!(
            repo = %descriptor.url,
            scheme = descriptor.credentials.scheme(),
            "activating credential scope"
        );
        Self {
            repository: descriptor.url.clone(),
            credentials: Some(descriptor.credentials.clone()),
        }
    }

    /// The repository URL this scope is bound to.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn is_active(&self) -> bool {
        self.credentials.is_some()
    }

    /// Environment entries for the active scheme. Empty once deactivated.
    pub fn env_vars(&self) -> Vec<(&'static str, &str)> {
        match &self.credentials {
            Some(Credentials::B2 {
                account_id,
                account_key,
            }) => vec![
                (B2_ACCOUNT_ID, account_id.expose()),
                (B2_ACCOUNT_KEY, account_key.expose()),
            ],
            Some(Credentials::S3 {
                access_key_id,
                secret_access_key,
            }) => vec![
                (AWS_ACCESS_KEY_ID, access_key_id.expose()),
                (AWS_SECRET_ACCESS_KEY, secret_access_key.expose()),
            ],
            None => Vec::new(),
        }
    }

    /// Wipes the bound secrets. Calling it again is a no-op.
    pub fn deactivate(&mut self) {
        if let Some(credentials) = self.credentials.take() {
            // `Secret` zeroes itself on drop.
            drop(credentials);
            debug!(repo = %self.repository, "credential scope deactivated");
        }
    }
}

impl Drop for CredentialScope {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Removes all four credential keys from this process's environment,
/// whichever scheme may have set them. Run at process start and end, while no
/// other thread is reading the environment.
pub fn clear_ambient_credentials() {
    for key in CREDENTIAL_ENV_KEYS {
        if std::env::var_os(key).is_some() {
            std::env::remove_var(key);
        }
    }
}

/// Credential keys currently present in this process's environment.
pub fn ambient_credential_keys() -> Vec<&'static str> {
    CREDENTIAL_ENV_KEYS
        .into_iter()
        .filter(|key| std::env::var_os(key).is_some())
        .collect()
}
