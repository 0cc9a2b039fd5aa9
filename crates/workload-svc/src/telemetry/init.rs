//! OTEL SDK initialisation: tracing subscriber + OTLP/HTTP exporters for
//! traces, metrics, and logs.

use std::time::Duration;

use anyhow::{Context, Result};
use opentelemetry::global;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{logs::LoggerProvider, metrics::SdkMeterProvider, runtime, trace::Tracer};
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::{
    filter::filter_fn, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use super::config::{Signal, TelemetryConfig};

/// Upper bound on the time spent flushing exporters at shutdown.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Crates whose events are kept out of the OTLP log bridge: the exporter's own
/// HTTP stack, whose events would otherwise feed back into the exporter.
const EXPORTER_HTTP_CRATES: [&str; 4] = ["hyper", "hyper_util", "reqwest", "h2"];

/// Handle to the running telemetry pipeline.
///
/// Holding one proves the pipeline was initialised; the HTTP server requires
/// a reference to it before it will serve connections.
pub struct TelemetryGuard {
    meter_provider: SdkMeterProvider,
    logger_provider: LoggerProvider,
}

/// Initialise the global tracing subscriber and the three OTLP export channels.
///
/// Configures:
/// - A JSON-formatted [`tracing_subscriber`] layer for structured log output.
/// - A [`tracing_opentelemetry`] layer exporting spans to the traces URL.
/// - A periodic OTLP metrics reader exporting to the metrics URL.
/// - An [`OpenTelemetryTracingBridge`] exporting log events to the logs URL.
///
/// Export runs on the SDK's current-thread runtime, i.e. on background
/// threads, never on the request-handling thread.
///
/// # Errors
///
/// Returns an error if any exporter or the subscriber cannot be initialised.
pub fn init_telemetry(cfg: &TelemetryConfig, log_level: &str) -> Result<TelemetryGuard> {
    let (tracer, guard) = build_pipelines(cfg)?;
    global::set_meter_provider(guard.meter_provider.clone());

    // --- Subscriber ---
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let otel_trace_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    let otel_log_layer = OpenTelemetryTracingBridge::new(&guard.logger_provider)
        .with_filter(filter_fn(|meta| !is_exporter_internal(meta.target())));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(otel_trace_layer)
        .with(otel_log_layer)
        .try_init()
        .context("failed to initialise tracing subscriber")?;

    info!(
        service_name = cfg.service_name(),
        service_version = cfg.service_version(),
        exporter_endpoint = cfg.exporter_endpoint(),
        traces_url = %cfg.signal_url(Signal::Traces),
        metrics_url = %cfg.signal_url(Signal::Metrics),
        logs_url = %cfg.signal_url(Signal::Logs),
        metric_export_interval_ms = cfg.metric_export_interval().as_millis() as u64,
        instrumentations = %cfg.instrumentations(),
        "telemetry pipeline initialised"
    );

    Ok(guard)
}

/// Build the trace, metric and log export channels without touching the
/// global subscriber or meter provider. The trace provider is installed
/// globally by the OTLP pipeline.
fn build_pipelines(cfg: &TelemetryConfig) -> Result<(Tracer, TelemetryGuard)> {
    let resource = cfg.resource();

    // --- Traces ---
    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .http()
                .with_endpoint(cfg.signal_url(Signal::Traces)),
        )
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default().with_resource(resource.clone()),
        )
        .install_batch(runtime::TokioCurrentThread)
        .context("failed to install OTLP tracing pipeline")?;

    // --- Metrics ---
    let meter_provider = opentelemetry_otlp::new_pipeline()
        .metrics(runtime::TokioCurrentThread)
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .http()
                .with_endpoint(cfg.signal_url(Signal::Metrics)),
        )
        .with_resource(resource.clone())
        .with_period(cfg.metric_export_interval())
        .build()
        .context("failed to build OTLP metrics pipeline")?;

    // --- Logs ---
    let logger_provider = opentelemetry_otlp::new_pipeline()
        .logging()
        .with_log_config(opentelemetry_sdk::logs::config().with_resource(resource))
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .http()
                .with_endpoint(cfg.signal_url(Signal::Logs)),
        )
        .install_batch(runtime::TokioCurrentThread)
        .context("failed to install OTLP logging pipeline")?;

    Ok((
        tracer,
        TelemetryGuard {
            meter_provider,
            logger_provider,
        },
    ))
}

impl TelemetryGuard {
    /// Flush and shut down all three export channels.
    ///
    /// Gives up after [`SHUTDOWN_TIMEOUT`]. Failures are logged and never
    /// propagated: losing the tail of the telemetry must not keep the process
    /// from exiting.
    pub async fn shutdown(self) {
        self.shutdown_within(SHUTDOWN_TIMEOUT).await;
    }

    /// Flush on a detached OS thread and wait at most `timeout` for it.
    ///
    /// The flush blocks on exporter I/O, and a runtime waits for its own
    /// blocking tasks when dropped, so the flush must not run on one.
    pub async fn shutdown_within(self, timeout: Duration) {
        let (done_tx, done_rx) = oneshot::channel();
        let spawned = std::thread::Builder::new()
            .name("telemetry-flush".into())
            .spawn(move || {
                self.shutdown_blocking();
                let _ = done_tx.send(());
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn telemetry flush thread");
            return;
        }

        match tokio::time::timeout(timeout, done_rx).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => warn!("telemetry flush thread exited before finishing"),
            Err(_) => warn!(
                timeout_ms = timeout.as_millis() as u64,
                "telemetry shutdown timed out, abandoning flush"
            ),
        }
    }

    fn shutdown_blocking(self) {
        global::shutdown_tracer_provider();

        if let Err(e) = self.meter_provider.shutdown() {
            warn!(error = %e, "failed to shut down OTLP metrics pipeline");
        }

        // Logs last, so that the failures above still reach the collector.
        if let Err(e) = self.logger_provider.shutdown() {
            warn!(error = %e, "failed to shut down OTLP logging pipeline");
        }
        info!("telemetry pipeline shut down");
    }
}

#[cfg(test)]
impl TelemetryGuard {
    /// Guard over providers with no exporters, for exercising the server.
    pub(crate) fn local_only() -> Self {
        Self {
            meter_provider: SdkMeterProvider::default(),
            logger_provider: LoggerProvider::builder().build(),
        }
    }
}

fn is_exporter_internal(target: &str) -> bool {
    let krate = target.split("::").next().unwrap_or(target);
    krate.starts_with("opentelemetry") || EXPORTER_HTTP_CRATES.contains(&krate)
}
