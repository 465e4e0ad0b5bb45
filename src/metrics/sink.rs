use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::error::MetricsError;
use super::types::{LogStatus, ProcessingLogEntry};

/// Best-effort destination for processing log entries.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn record(&self, entry: &ProcessingLogEntry) -> Result<(), MetricsError>;
}

/// Mirrors entries as structured tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl MetricsSink for TracingSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn record(&self, entry: &ProcessingLogEntry) -> Result<(), MetricsError> {
        match entry.status {
            LogStatus::Success => info!(
                component = %entry.component,
                video_id = entry.video_id.as_deref().unwrap_or("-"),
                claim_id = entry.claim_id.as_deref().unwrap_or("-"),
                attempt = entry.attempt,
                latency_ms = entry.latency_ms,
                "{}",
                entry.message
            ),
            LogStatus::Retry | LogStatus::Failure => warn!(
                component = %entry.component,
                status = entry.status.as_str(),
                video_id = entry.video_id.as_deref().unwrap_or("-"),
                claim_id = entry.claim_id.as_deref().unwrap_or("-"),
                attempt = entry.attempt,
                latency_ms = entry.latency_ms,
                "{}",
                entry.message
            ),
        }
        Ok(())
    }
}

/// Connection settings for an InfluxDB v2 bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
}

/// Writes `latency,component=..,status=.. value=<ms>` points over the v2 HTTP API.
#[derive(Debug, Clone)]
pub struct InfluxLineSink {
    http: reqwest::Client,
    config: InfluxConfig,
}

pub const INFLUX_MEASUREMENT: &str = "latency";
const INFLUX_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

impl InfluxLineSink {
    pub fn new(http: reqwest::Client, config: InfluxConfig) -> Self {
        Self { http, config }
    }

    fn write_url(&self) -> String {
        format!("{}/api/v2/write", self.config.url.trim_end_matches('/'))
    }
}

/// Escapes commas, spaces and equals signs in tag values.
fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | ' ' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Renders one entry as an InfluxDB line-protocol point with nanosecond timestamp.
pub fn to_line_protocol(entry: &ProcessingLogEntry) -> String {
    let timestamp = entry
        .recorded_at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| entry.recorded_at.timestamp_millis() * 1_000_000);
    format!(
        "{INFLUX_MEASUREMENT},component={},status={} value={} {}",
        escape_tag(&entry.component),
        entry.status.as_str(),
        entry.latency_ms as f64,
        timestamp
    )
}

#[async_trait]
impl MetricsSink for InfluxLineSink {
    fn name(&self) -> &'static str {
        "influxdb"
    }

    async fn record(&self, entry: &ProcessingLogEntry) -> Result<(), MetricsError> {
        let resp = self
            .http
            .post(self.write_url())
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Token {}", self.config.token),
            )
            .timeout(INFLUX_WRITE_TIMEOUT)
            .body(to_line_protocol(entry))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(MetricsError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(any(test, feature = "mock"))]
pub use memory::MemorySink;

#[cfg(any(test, feature = "mock"))]
mod memory {
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;

    /// Collects entries in memory; can be told to fail every write or to stall before it.
    #[derive(Debug, Default)]
    pub struct MemorySink {
        entries: Mutex<Vec<ProcessingLogEntry>>,
        failing: bool,
        delay: Duration,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn entries(&self) -> Vec<ProcessingLogEntry> {
            self.entries.lock().clone()
        }
    }

    #[async_trait]
    impl MetricsSink for MemorySink {
        fn name(&self) -> &'static str {
            "memory"
        }

        async fn record(&self, entry: &ProcessingLogEntry) -> Result<(), MetricsError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.failing {
                return Err(MetricsError::Unavailable {
                    reason: "memory sink configured to fail".to_string(),
                });
            }
            self.entries.lock().push(entry.clone());
            Ok(())
        }
    }
}
