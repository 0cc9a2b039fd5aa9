//! Axum middleware applied to every route.
//!
//! [`observe`] writes one structured completion log line per request and, when
//! the `http-metrics` instrumentation is enabled, records request metrics.
//! No timeout layer is applied: `/slow` and `/alloc` run to completion.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use common::Route;
use tracing::info;

use crate::telemetry::HttpMetrics;

/// State for the [`observe`] middleware.
#[derive(Clone, Default)]
pub struct RequestObserver {
    metrics: Option<HttpMetrics>,
}

impl RequestObserver {
    /// Create an observer; HTTP metrics are recorded only if `record_metrics`.
    pub fn new(record_metrics: bool) -> Self {
        Self {
            metrics: record_metrics.then(HttpMetrics::new),
        }
    }
}

/// Log route, method, status, and duration of every request.
pub async fn observe(
    State(observer): State<RequestObserver>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let response = next.run(req).await;

    let elapsed = started.elapsed();
    let status = response.status().as_u16();
    let route = Route::from_path(&path).map_or("unmatched", Route::name);
    info!(
        route,
        path = %path,
        method = %method,
        status,
        duration_ms = elapsed.as_millis() as u64,
        "request completed"
    );

    if let Some(metrics) = &observer.metrics {
        metrics.record(route, method.as_str(), status, elapsed.as_secs_f64() * 1000.0);
    }

    response
}
