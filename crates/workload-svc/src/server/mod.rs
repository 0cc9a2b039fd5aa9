//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with the four workload routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Serve the bound listener until a shutdown signal arrives.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod shutdown;
pub mod state;

use std::future::Future;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::telemetry::TelemetryGuard;

/// Serve `router` on `listener` until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(listener: TcpListener, router: Router, telemetry: &TelemetryGuard) -> Result<()> {
    serve_with_shutdown(listener, router, telemetry, shutdown::signal()).await
}

/// Serve `router` on `listener` until `shutdown` resolves.
///
/// Takes the [`TelemetryGuard`] so that no connection can be accepted before
/// the telemetry pipeline exists. Once `shutdown` resolves the listener is
/// closed and in-flight requests run to completion.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    router: Router,
    _telemetry: &TelemetryGuard,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("listener has no local address")?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped accepting connections");
    Ok(())
}
