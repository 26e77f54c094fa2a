use anyhow::Result;

/// A sink for named numeric samples tagged with the repository they describe.
#[async_trait::async_trait]
pub trait MetricsExporter: Send + Sync {
    /// Write one sample.
    async fn write_measurement(&self, name: &str, value: f64, repo: &str) -> Result<()>;

    /// Short backend name for log lines.
    fn backend(&self) -> &'static str;
}

/// Used when no metrics backend is configured. Every write succeeds silently.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExporter;

#[async_trait::async_trait]
impl MetricsExporter for NoopExporter {
    async fn write_measurement(&self, _name: &str, _value: f64, _repo: &str) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "none"
    }
}
