pub mod backup;
pub mod credentials;
pub mod format;
pub mod repository;
pub mod secret;

pub use backup::{BackupSummary, EngineVersion, Phase, PruneStatus, StatsSummary};
pub use credentials::{clear_ambient_credentials, CredentialScope, CREDENTIAL_ENV_KEYS};
pub use format::{format_integer, human_size, human_time};
pub use repository::{BackupConfiguration, Credentials, DescriptorError, RepositoryDescriptor};
pub use secret::Secret;
