//! Configuration loading and validation for the workload service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any variable is invalid.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::telemetry::{config::Signal, Instrumentations, TelemetryConfig};
use crate::workload::WorkloadSettings;

/// Validated workload service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Service identity reported in `/health` and on every telemetry resource.
    #[serde(default = "default_service_name")]
    pub otel_service_name: String,

    /// Service version reported on every telemetry resource.
    #[serde(default = "default_service_version")]
    pub service_version: String,

    /// Base URL of the OTLP/HTTP collector.
    #[serde(default = "default_otlp_endpoint")]
    pub otel_exporter_otlp_endpoint: String,

    /// Per-signal URLs; the OTLP exporter prefers these over the base URL.
    #[serde(default)]
    pub otel_exporter_otlp_traces_endpoint: Option<String>,
    #[serde(default)]
    pub otel_exporter_otlp_metrics_endpoint: Option<String>,
    #[serde(default)]
    pub otel_exporter_otlp_logs_endpoint: Option<String>,

    /// Metric export interval in milliseconds.
    #[serde(default = "default_metric_export_interval")]
    pub otel_metric_export_interval: u64,

    /// Comma-separated instrumentations to enable (`http`, `http-metrics`,
    /// `workload`, `all`, `none`).
    #[serde(default = "default_instrumentations")]
    pub otel_instrumentations: String,

    /// Pattern evaluations per `/slow` call.
    #[serde(default = "default_slow_iterations")]
    pub slow_iterations: u32,

    /// 256 KiB chunks allocated per `/alloc` call.
    #[serde(default = "default_alloc_chunk_count")]
    pub alloc_chunk_count: usize,

    /// Batches retained by `/alloc` before the oldest is evicted.
    #[serde(default = "default_max_retained_batches")]
    pub max_retained_batches: usize,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    3000
}
fn default_service_name() -> String {
    "demo-app".into()
}
fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}
fn default_otlp_endpoint() -> String {
    "http://localhost:4318".into()
}
fn default_metric_export_interval() -> u64 {
    10_000
}
fn default_instrumentations() -> String {
    "all".into()
}
fn default_slow_iterations() -> u32 {
    WorkloadSettings::default().slow_iterations
}
fn default_alloc_chunk_count() -> usize {
    WorkloadSettings::default().alloc_chunk_count
}
fn default_max_retained_batches() -> usize {
    WorkloadSettings::default().max_retained_batches
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            otel_service_name: default_service_name(),
            service_version: default_service_version(),
            otel_exporter_otlp_endpoint: default_otlp_endpoint(),
            otel_exporter_otlp_traces_endpoint: None,
            otel_exporter_otlp_metrics_endpoint: None,
            otel_exporter_otlp_logs_endpoint: None,
            otel_metric_export_interval: default_metric_export_interval(),
            otel_instrumentations: default_instrumentations(),
            slow_iterations: default_slow_iterations(),
            alloc_chunk_count: default_alloc_chunk_count(),
            max_retained_batches: default_max_retained_batches(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.slow_iterations == 0 {
            anyhow::bail!("SLOW_ITERATIONS must be > 0");
        }
        if self.alloc_chunk_count == 0 {
            anyhow::bail!("ALLOC_CHUNK_COUNT must be > 0");
        }
        if self.max_retained_batches == 0 {
            anyhow::bail!("MAX_RETAINED_BATCHES must be > 0");
        }
        self.telemetry()?;
        Ok(())
    }

    /// Assemble the validated telemetry configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid endpoint, blank service name, zero
    /// export interval, or unknown instrumentation name.
    pub fn telemetry(&self) -> Result<TelemetryConfig> {
        let instrumentations: Instrumentations = self
            .otel_instrumentations
            .parse()
            .context("invalid OTEL_INSTRUMENTATIONS")?;

        let mut telemetry = TelemetryConfig::new(
            &self.otel_service_name,
            &self.service_version,
            &self.otel_exporter_otlp_endpoint,
            Duration::from_millis(self.otel_metric_export_interval),
            instrumentations,
        )
        .context("invalid telemetry configuration")?;

        for signal in Signal::ALL {
            let url = match signal {
                Signal::Traces => &self.otel_exporter_otlp_traces_endpoint,
                Signal::Metrics => &self.otel_exporter_otlp_metrics_endpoint,
                Signal::Logs => &self.otel_exporter_otlp_logs_endpoint,
            };
            if let Some(url) = url.as_deref().filter(|u| !u.trim().is_empty()) {
                telemetry = telemetry
                    .with_signal_endpoint(signal, url)
                    .with_context(|| format!("invalid {signal:?} exporter endpoint"))?;
            }
        }
        Ok(telemetry)
    }

    /// Workload tunables.
    pub fn workload(&self) -> WorkloadSettings {
        WorkloadSettings {
            slow_iterations: self.slow_iterations,
            alloc_chunk_count: self.alloc_chunk_count,
            max_retained_batches: self.max_retained_batches,
        }
    }
}
