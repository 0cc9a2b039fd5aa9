//! Axum router construction.

use axum::{extract::Request, middleware::from_fn_with_state, routing::get, Router};
use common::Route;
use tower_http::trace::TraceLayer;
use tracing::info_span;

use super::{handlers, middleware, state::AppState};
use crate::telemetry::Instrumentations;

/// Build the application [`Router`] with all routes and middleware attached.
///
/// The `http` instrumentation adds one span per request, exported through the
/// OpenTelemetry tracing layer; `http-metrics` turns on request metrics in the
/// observing middleware.
pub fn build(state: AppState, instrumentations: &Instrumentations) -> Router {
    let observer = middleware::RequestObserver::new(instrumentations.http_metrics);

    let router = Router::new()
        .route(Route::Health.path(), get(handlers::health))
        .route(Route::Hello.path(), get(handlers::hello))
        .route(Route::Slow.path(), get(handlers::slow))
        .route(Route::Alloc.path(), get(handlers::alloc))
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(observer, middleware::observe));

    let router = if instrumentations.http {
        router.layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
            info_span!(
                "http.request",
                otel.name = %format!("{} {}", req.method(), req.uri().path()),
                http.request.method = %req.method(),
                url.path = %req.uri().path(),
            )
        }))
    } else {
        router
    };

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use axum_test::TestServer;
    use common::protocol::{AllocResponse, HealthResponse, HelloResponse, SlowResponse};
    use tower::ServiceExt;

    use crate::telemetry::WorkloadMetrics;
    use crate::workload::WorkloadSettings;

    fn test_state() -> AppState {
        AppState::new(
            "demo-app",
            WorkloadSettings {
                slow_iterations: 3,
                alloc_chunk_count: 1,
                max_retained_batches: 20,
            },
            WorkloadMetrics::new(true),
        )
    }

    fn test_server(instrumentations: Instrumentations) -> TestServer {
        TestServer::new(build(test_state(), &instrumentations)).unwrap()
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = build(AppState::default(), &Instrumentations::none());
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_get_methods_are_rejected() {
        let app = build(AppState::default(), &Instrumentations::none());
        let req = Request::builder()
            .method("POST")
            .uri("/hello")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn health_is_always_healthy() {
        let server = test_server(Instrumentations::all());
        for _ in 0..3 {
            server.get("/alloc").await.assert_status_ok();
            let resp = server.get("/health").await;
            resp.assert_status_ok();
            let body: HealthResponse = resp.json();
            assert_eq!(body.status, "healthy");
            assert_eq!(body.service, "demo-app");
        }
    }

    #[tokio::test]
    async fn hello_returns_route_and_timestamp() {
        let server = test_server(Instrumentations::all());
        let resp = server.get("/hello").await;
        resp.assert_status_ok();
        let body: HelloResponse = resp.json();
        assert_eq!(body.route, "/hello");
        assert!(chrono::DateTime::parse_from_rfc3339(&body.timestamp).is_ok());
    }

    #[tokio::test]
    async fn slow_output_is_stable_across_calls() {
        let server = test_server(Instrumentations::none());
        for _ in 0..2 {
            let resp = server.get("/slow").await;
            resp.assert_status_ok();
            let body: SlowResponse = resp.json();
            assert_eq!(body.route, "/slow");
            assert_eq!(body.match_count, 3);
        }
    }

    #[tokio::test]
    async fn alloc_reaches_and_holds_the_retention_cap() {
        let server = test_server(Instrumentations::all());
        let mut previous = 0;
        for call in 1..=25usize {
            let resp = server.get("/alloc").await;
            resp.assert_status_ok();
            let body: AllocResponse = resp.json();
            assert_eq!(body.route, "/alloc");
            assert_eq!(body.allocated_mb, 0.25);
            assert!(body.total_batches >= previous);
            assert_eq!(body.total_batches, call.min(20));
            previous = body.total_batches;
        }
    }

    #[tokio::test]
    async fn alloc_response_shape() {
        let server = test_server(Instrumentations::none());
        let body: serde_json::Value = server.get("/alloc").await.json();
        for field in ["message", "route", "allocated_mb", "total_batches", "duration_ms"] {
            assert!(body.get(field).is_some(), "missing field {field}");
        }
    }
}
