mod exporter;
pub mod influx;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

pub use exporter::{MetricsExporter, NoopExporter};
pub use influx::{InfluxConfig, InfluxExporter};

/// The exporter chosen at startup, wrapped so that writes never fail the caller.
#[derive(Clone)]
pub struct Metrics {
    exporter: Arc<dyn MetricsExporter>,
}

impl Metrics {
    pub fn new(exporter: impl MetricsExporter + 'static) -> Self {
        Self {
            exporter: Arc::new(exporter),
        }
    }

    pub fn disabled() -> Self {
        Self::new(NoopExporter)
    }

    /// InfluxDB when configured, otherwise a no-op exporter.
    pub fn from_config(config: Option<InfluxConfig>) -> Result<Self> {
        let metrics = match config {
            Some(config) => {
                info!(
                    host = %config.host,
                    port = config.port,
                    database = %config.database,
                    "exporting metrics to influxdb"
                );
                Self::new(InfluxExporter::new(config)?)
            }
            None => Self::disabled(),
        };
        Ok(metrics)
    }

    pub fn backend(&self) -> &'static str {
        self.exporter.backend()
    }

    /// Writes each measurement for `repo`. Failures are logged and skipped.
    /// Returns how many were written.
    pub async fn record(&self, repo: &str, measurements: &[(&str, f64)]) -> usize {
        let mut written = 0;
        for (name, value) in measurements {
            match self.exporter.write_measurement(name, *value, repo).await {
                Ok(()) => written += 1,
                Err(e) => warn!(
                    backend = self.exporter.backend(),
                    measurement = *name,
                    repo,
                    error = %format!("{e:#}"),
                    "metrics export failed"
                ),
            }
        }
        written
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("backend", &self.exporter.backend())
            .finish()
    }
}
