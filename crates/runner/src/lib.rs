pub mod cli;
pub mod commands;
pub mod config;
pub mod fleet;
pub mod pipeline;

pub use fleet::{FleetReport, FleetRunner, RepositoryOutcome};
pub use pipeline::{BackupReport, PhaseFailure, RepositoryPipeline};
