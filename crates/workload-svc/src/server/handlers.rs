//! Axum request handlers for all service endpoints.
//!
//! Handlers are infallible: none of the endpoints validate input, and a
//! runtime fault such as allocation failure is left to take the process down.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{SecondsFormat, Utc};
use common::protocol::{
    AllocResponse, ErrorResponse, HealthResponse, HelloResponse, Route, SlowResponse,
};
use tracing::info;

use super::state::AppState;
use crate::workload;

/// `GET /health`: liveness check. Always `200 OK`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    info!(route = Route::Health.name(), "health check");
    Json(HealthResponse {
        status: "healthy".into(),
        service: state.service_name.to_string(),
    })
}

/// `GET /hello`: baseline fast path.
pub async fn hello() -> Json<HelloResponse> {
    info!(route = Route::Hello.name(), "processing request");
    Json(HelloResponse {
        message: "Hello from Rust axum!".into(),
        route: Route::Hello.path().into(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// `GET /slow`: CPU-bound path.
///
/// Runs the pattern evaluations inline on the request task. There is no
/// `spawn_blocking` and no yield point, so the runtime thread is blocked until
/// the loop finishes.
pub async fn slow(State(state): State<AppState>) -> Json<SlowResponse> {
    let iterations = state.settings.slow_iterations;
    info!(
        route = Route::Slow.name(),
        iterations, "processing request (CPU intensive)"
    );

    let run = workload::run_slow(iterations);
    state.metrics.record_slow(iterations);

    Json(SlowResponse {
        message: "Slow operation completed".into(),
        route: Route::Slow.path().into(),
        match_count: run.match_count,
        duration_ms: run.elapsed.as_millis() as u64,
    })
}

/// `GET /alloc`: memory-bound path.
///
/// Allocates and fills one batch, then retains it, evicting the oldest batch
/// once the retention buffer is full.
pub async fn alloc(State(state): State<AppState>) -> Json<AllocResponse> {
    let started = std::time::Instant::now();
    let batch_len = state.settings.batch_len();
    info!(
        route = Route::Alloc.name(),
        batch_bytes = batch_len,
        "processing request (memory intensive)"
    );

    let batch = workload::allocate_batch(batch_len);
    let outcome = state.retention.push(batch).await;
    state.metrics.record_alloc(batch_len, outcome.evicted);

    info!(
        route = Route::Alloc.name(),
        memory_batches = outcome.retained,
        max_batches = state.retention.capacity(),
        evicted = outcome.evicted,
        "batch retained"
    );

    Json(AllocResponse {
        message: "Memory allocation completed".into(),
        route: Route::Alloc.path().into(),
        allocated_mb: state.settings.batch_mib(),
        total_batches: outcome.retained,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::WorkloadMetrics;
    use crate::workload::WorkloadSettings;

    fn small_state() -> AppState {
        AppState::new(
            "unit-test-app",
            WorkloadSettings {
                slow_iterations: 2,
                alloc_chunk_count: 1,
                max_retained_batches: 2,
            },
            WorkloadMetrics::new(true),
        )
    }

    #[tokio::test]
    async fn health_reports_service_name() {
        let Json(body) = health(State(small_state())).await;
        assert_eq!(body.status, "healthy");
        assert_eq!(body.service, "unit-test-app");
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn health_check_is_logged_at_info() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .json()
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        health(State(small_state())).await;

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("health check"), "{output}");
        assert!(output.contains("\"level\":\"INFO\""), "{output}");
    }

    #[tokio::test]
    async fn hello_timestamp_is_rfc3339_utc() {
        let Json(body) = hello().await;
        assert_eq!(body.route, "/hello");
        let parsed = chrono::DateTime::parse_from_rfc3339(&body.timestamp).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        assert!(body.timestamp.ends_with('Z'));
    }

    #[tokio::test]
    async fn slow_counts_every_iteration() {
        let Json(body) = slow(State(small_state())).await;
        assert_eq!(body.route, "/slow");
        assert_eq!(body.match_count, 2);
    }

    #[tokio::test]
    async fn alloc_saturates_at_the_cap() {
        let state = small_state();
        let mut totals = Vec::new();
        for _ in 0..4 {
            let Json(body) = alloc(State(state.clone())).await;
            assert_eq!(body.allocated_mb, 0.25);
            totals.push(body.total_batches);
        }
        assert_eq!(totals, vec![1, 2, 2, 2]);
        assert_eq!(state.retention.retained_bytes().await, 2 * 256 * 1024);
    }
}
