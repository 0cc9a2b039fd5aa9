//! `workload-svc`: synthetic workload service entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (OTLP traces, metrics, logs + tracing).
//! 3. Build the service context and the Axum router.
//! 4. Bind the listener and serve until SIGINT / SIGTERM.
//! 5. Flush and shut down the telemetry pipeline, then exit 0.
//!
//! The runtime is single-threaded: requests are handled cooperatively on one
//! thread, so the CPU-bound `/slow` handler blocks every other request while
//! it runs.

mod config;
mod server;
mod telemetry;
mod workload;

use anyhow::Result;
use tracing::info;

use config::Config;
use server::state::AppState;
use telemetry::WorkloadMetrics;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;
    let telemetry_cfg = cfg.telemetry()?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    let telemetry = telemetry::init_telemetry(&telemetry_cfg, &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        service_name = telemetry_cfg.service_name(),
        "workload-svc starting"
    );

    // -----------------------------------------------------------------------
    // 3. Service context + router
    // -----------------------------------------------------------------------
    let instrumentations = telemetry_cfg.instrumentations();
    let settings = cfg.workload();
    info!(
        slow_iterations = settings.slow_iterations,
        alloc_batch_mib = settings.batch_mib(),
        max_retained_batches = settings.max_retained_batches,
        "workload configured"
    );
    let state = AppState::new(
        telemetry_cfg.service_name(),
        settings,
        WorkloadMetrics::new(instrumentations.workload),
    );
    let router = server::router::build(state, &instrumentations);

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::serve(listener, router, &telemetry).await?;

    // -----------------------------------------------------------------------
    // 5. Telemetry teardown
    // -----------------------------------------------------------------------
    telemetry.shutdown().await;
    info!("workload-svc stopped");

    Ok(())
}
