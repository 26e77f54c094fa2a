use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tracing::debug;

use crate::exporter::MetricsExporter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    /// Value of the `host` tag attached to every point, if any.
    pub host_tag: Option<String>,
}

/// Writes points to an InfluxDB 1.x `/write` endpoint using line protocol.
pub struct InfluxExporter {
    client: reqwest::Client,
    write_url: String,
    database: String,
    host_tag: Option<String>,
}

impl InfluxExporter {
    pub fn new(config: InfluxConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build influx http client")?;
        Ok(Self {
            client,
            write_url: format!("http://{}:{}/write", config.host, config.port),
            database: config.database,
            host_tag: config.host_tag,
        })
    }
}

#[async_trait::async_trait]
impl MetricsExporter for InfluxExporter {
    async fn write_measurement(&self, name: &str, value: f64, repo: &str) -> Result<()> {
        let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let line = line_protocol(name, value, repo, self.host_tag.as_deref(), timestamp);
        debug!(measurement = name, value, repo, "writing measurement to influx");

        let resp = self
            .client
            .post(&self.write_url)
            .query(&[("db", self.database.as_str()), ("precision", "ns")])
            .body(line)
            .send()
            .await
            .with_context(|| format!("send point to {}", self.write_url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("influx rejected point ({status}): {}", body.trim()));
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "influxdb"
    }
}

/// Renders one point: `<name>,host=<host>,repo=<repo> value=<value> <ns>`.
pub fn line_protocol(
    name: &str,
    value: f64,
    repo: &str,
    host_tag: Option<&str>,
    timestamp_ns: i64,
) -> String {
    let mut line = escape(name, &[',', ' ']);
    if let Some(host) = host_tag {
        line.push_str(",host=");
        line.push_str(&escape(host, &[',', '=', ' ']));
    }
    line.push_str(",repo=");
    line.push_str(&escape(repo, &[',', '=', ' ']));
    line.push_str(&format!(" value={value} {timestamp_ns}"));
    line
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
