//! Validated telemetry configuration and the closed set of instrumentations.

use std::{fmt, str::FromStr, time::Duration};

use axum::http::Uri;
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use thiserror::Error;

/// Errors detected while assembling a [`TelemetryConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TelemetryConfigError {
    #[error("OTEL_SERVICE_NAME is required and must not be empty")]
    EmptyServiceName,

    #[error("invalid OTLP exporter endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("OTEL_METRIC_EXPORT_INTERVAL must be > 0")]
    ZeroExportInterval,

    #[error("unknown instrumentation {0:?} (supported: http, http-metrics, workload, all, none)")]
    UnknownInstrumentation(String),
}

// ---------------------------------------------------------------------------
// Instrumentations
// ---------------------------------------------------------------------------

/// A supported auto-instrumentation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrumentation {
    /// One span per HTTP request.
    Http,
    /// Request counter and duration histogram.
    HttpMetrics,
    /// Slow-path evaluations, allocated bytes, retained batches.
    Workload,
}

impl Instrumentation {
    pub const ALL: [Instrumentation; 3] = [
        Instrumentation::Http,
        Instrumentation::HttpMetrics,
        Instrumentation::Workload,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Instrumentation::Http => "http",
            Instrumentation::HttpMetrics => "http-metrics",
            Instrumentation::Workload => "workload",
        }
    }
}

impl FromStr for Instrumentation {
    type Err = TelemetryConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase().replace('_', "-");
        Instrumentation::ALL
            .into_iter()
            .find(|i| i.name() == name)
            .ok_or_else(|| TelemetryConfigError::UnknownInstrumentation(s.trim().to_owned()))
    }
}

/// Enable flags for every supported instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrumentations {
    pub http: bool,
    pub http_metrics: bool,
    pub workload: bool,
}

impl Instrumentations {
    pub const fn all() -> Self {
        Self {
            http: true,
            http_metrics: true,
            workload: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            http: false,
            http_metrics: false,
            workload: false,
        }
    }

    pub fn is_enabled(&self, instrumentation: Instrumentation) -> bool {
        match instrumentation {
            Instrumentation::Http => self.http,
            Instrumentation::HttpMetrics => self.http_metrics,
            Instrumentation::Workload => self.workload,
        }
    }

    fn enable(&mut self, instrumentation: Instrumentation) {
        match instrumentation {
            Instrumentation::Http => self.http = true,
            Instrumentation::HttpMetrics => self.http_metrics = true,
            Instrumentation::Workload => self.workload = true,
        }
    }
}

impl Default for Instrumentations {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for Instrumentations {
    type Err = TelemetryConfigError;

    /// Parse a comma-separated list such as `"http,workload"`.
    ///
    /// `all` enables everything; `none` or an empty list disables everything.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut enabled = Instrumentations::none();
        for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match name.to_ascii_lowercase().as_str() {
                "all" => enabled = Instrumentations::all(),
                "none" => {}
                _ => enabled.enable(name.parse()?),
            }
        }
        Ok(enabled)
    }
}

impl fmt::Display for Instrumentations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Instrumentation::ALL
            .into_iter()
            .filter(|i| self.is_enabled(*i))
            .map(Instrumentation::name)
            .collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(","))
        }
    }
}

// ---------------------------------------------------------------------------
// TelemetryConfig
// ---------------------------------------------------------------------------

/// OTLP signal exported by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Traces,
    Metrics,
    Logs,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Traces, Signal::Metrics, Signal::Logs];

    const fn path(self) -> &'static str {
        match self {
            Signal::Traces => "/v1/traces",
            Signal::Metrics => "/v1/metrics",
            Signal::Logs => "/v1/logs",
        }
    }

    const fn index(self) -> usize {
        match self {
            Signal::Traces => 0,
            Signal::Metrics => 1,
            Signal::Logs => 2,
        }
    }
}

/// Process-wide telemetry configuration, validated once at startup.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    service_name: String,
    service_version: String,
    exporter_endpoint: String,
    metric_export_interval: Duration,
    instrumentations: Instrumentations,
    /// Per-signal URLs (`OTEL_EXPORTER_OTLP_{TRACES,METRICS,LOGS}_ENDPOINT`),
    /// used verbatim instead of `<endpoint>/v1/<signal>`.
    signal_endpoints: [Option<String>; 3],
}

impl TelemetryConfig {
    /// Validate and assemble the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the service name is blank, the endpoint is not an
    /// absolute `http`/`https` URL with a host, or the export interval is zero.
    pub fn new(
        service_name: &str,
        service_version: &str,
        exporter_endpoint: &str,
        metric_export_interval: Duration,
        instrumentations: Instrumentations,
    ) -> Result<Self, TelemetryConfigError> {
        let service_name = service_name.trim();
        if service_name.is_empty() {
            return Err(TelemetryConfigError::EmptyServiceName);
        }
        if metric_export_interval.is_zero() {
            return Err(TelemetryConfigError::ZeroExportInterval);
        }

        Ok(Self {
            service_name: service_name.to_owned(),
            service_version: service_version.trim().to_owned(),
            exporter_endpoint: validate_endpoint(exporter_endpoint)?,
            metric_export_interval,
            instrumentations,
            signal_endpoints: [None, None, None],
        })
    }

    /// Export `signal` to `url` as-is instead of the base endpoint.
    ///
    /// The OTLP exporter reads the per-signal variables itself and gives them
    /// precedence over the base endpoint, so they are mirrored here to keep
    /// [`TelemetryConfig::signal_url`] equal to the URL actually used.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not an absolute `http`/`https` URL.
    pub fn with_signal_endpoint(mut self, signal: Signal, url: &str) -> Result<Self, TelemetryConfigError> {
        validate_endpoint(url)?;
        self.signal_endpoints[signal.index()] = Some(url.trim().to_owned());
        Ok(self)
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn service_version(&self) -> &str {
        &self.service_version
    }

    /// Exporter base URL without a trailing slash.
    pub fn exporter_endpoint(&self) -> &str {
        &self.exporter_endpoint
    }

    pub fn metric_export_interval(&self) -> Duration {
        self.metric_export_interval
    }

    pub fn instrumentations(&self) -> Instrumentations {
        self.instrumentations
    }

    /// Full OTLP/HTTP URL for `signal`, e.g. `http://localhost:4318/v1/traces`.
    pub fn signal_url(&self, signal: Signal) -> String {
        match &self.signal_endpoints[signal.index()] {
            Some(url) => url.clone(),
            None => format!("{}{}", self.exporter_endpoint, signal.path()),
        }
    }

    /// Resource attached to every exported span, metric, and log record.
    pub fn resource(&self) -> Resource {
        Resource::new(vec![
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                self.service_name.clone(),
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                self.service_version.clone(),
            ),
            KeyValue::new("service_name", self.service_name.clone()),
            KeyValue::new("job", self.service_name.clone()),
        ])
    }
}

fn validate_endpoint(endpoint: &str) -> Result<String, TelemetryConfigError> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    let invalid = |reason: &str| TelemetryConfigError::InvalidEndpoint {
        endpoint: endpoint.to_owned(),
        reason: reason.to_owned(),
    };

    if trimmed.is_empty() {
        return Err(invalid("must not be empty"));
    }
    let uri: Uri = trimmed.parse().map_err(|e: axum::http::uri::InvalidUri| invalid(&e.to_string()))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        _ => return Err(invalid("scheme must be http or https")),
    }
    if uri.host().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    if uri.query().is_some() {
        return Err(invalid("must not contain a query string"));
    }
    Ok(trimmed.to_owned())
}
