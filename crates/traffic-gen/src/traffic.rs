//! Weighted synthetic traffic against the workload service.
//!
//! After a startup delay the generator loops forever:
//! 1. Pick a route by weight.
//! 2. `GET` it with a per-request timeout and log status and latency.
//! 3. Sleep a uniformly random interval, or the error backoff on failure.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use common::Route;
use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    Rng, SeedableRng,
};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::Config;

/// Route selection by relative weight.
#[derive(Debug, Clone)]
pub struct TrafficPlan {
    routes: Vec<Route>,
    index: WeightedIndex<u32>,
}

impl TrafficPlan {
    /// Build a plan from `(route, weight)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or every weight is zero.
    pub fn new(weights: &[(Route, u32)]) -> Result<Self> {
        let index = WeightedIndex::new(weights.iter().map(|(_, w)| *w))
            .context("route weights must contain at least one positive weight")?;
        Ok(Self {
            routes: weights.iter().map(|(r, _)| *r).collect(),
            index,
        })
    }

    /// Draw the next route.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Route {
        self.routes[self.index.sample(rng)]
    }
}

/// Send one `GET` for `route` and return the response status.
///
/// The body is drained so the connection can be reused.
pub async fn send(client: &Client, base_url: &str, route: Route) -> Result<StatusCode> {
    let url = format!("{base_url}{}", route.path());
    let resp = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("GET {url} failed"))?;
    let status = resp.status();
    resp.bytes()
        .await
        .with_context(|| format!("failed to read response body from {url}"))?;
    Ok(status)
}

/// Traffic loop: runs until the process is stopped.
///
/// # Errors
///
/// Returns an error only if the HTTP client or the plan cannot be built;
/// request failures are logged and retried after the backoff.
pub async fn run(cfg: &Config) -> Result<()> {
    let client = Client::builder()
        .timeout(cfg.request_timeout())
        .build()
        .context("failed to build HTTP client")?;
    let plan = TrafficPlan::new(&cfg.weights()?)?;
    let mut rng = StdRng::from_entropy();

    info!(
        target_url = cfg.target_base(),
        weights = %cfg.route_weights,
        startup_delay_secs = cfg.startup_delay_secs,
        "traffic generator waiting for target"
    );
    tokio::time::sleep(cfg.startup_delay()).await;
    info!("starting traffic generator");

    loop {
        let route = plan.pick(&mut rng);
        let started = Instant::now();
        let pause = match send(&client, cfg.target_base(), route).await {
            Ok(status) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                if status.is_success() {
                    debug!(route = route.name(), status = status.as_u16(), elapsed_ms, "request sent");
                } else {
                    warn!(route = route.name(), status = status.as_u16(), elapsed_ms, "unexpected status");
                }
                Duration::from_millis(rng.gen_range(cfg.min_interval_ms..=cfg.max_interval_ms))
            }
            Err(e) => {
                warn!(route = route.name(), error = %format!("{e:#}"), "traffic generator error");
                cfg.error_backoff()
            }
        };
        tokio::time::sleep(pause).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[test]
    fn plan_only_picks_weighted_routes() {
        let plan = TrafficPlan::new(&[(Route::Hello, 3), (Route::Slow, 0), (Route::Alloc, 1)]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen_hello = false;
        let mut seen_alloc = false;
        for _ in 0..1000 {
            match plan.pick(&mut rng) {
                Route::Hello => seen_hello = true,
                Route::Alloc => seen_alloc = true,
                other => panic!("zero-weight route picked: {other}"),
            }
        }
        assert!(seen_hello && seen_alloc);
    }

    #[test]
    fn plan_follows_relative_weights() {
        let plan = TrafficPlan::new(&[(Route::Hello, 60), (Route::Slow, 30), (Route::Alloc, 10)]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let draws = 10_000;
        let hello = (0..draws)
            .filter(|_| plan.pick(&mut rng) == Route::Hello)
            .count();
        // 60% expected; a wide band keeps this independent of the RNG stream.
        assert!((5_000..7_000).contains(&hello), "hello picked {hello} times");
    }

    #[test]
    fn plan_rejects_all_zero_weights() {
        assert!(TrafficPlan::new(&[(Route::Hello, 0)]).is_err());
        assert!(TrafficPlan::new(&[]).is_err());
    }

    #[tokio::test]
    async fn send_hits_the_route_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hello"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Hello from Rust axum!",
                "route": "/hello",
                "timestamp": "2026-10-17T12:00:00.000Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let status = send(&Client::new(), &server.uri(), Route::Hello).await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn send_reports_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alloc"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let status = send(&Client::new(), &server.uri(), Route::Alloc).await.unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn send_fails_when_target_is_down() {
        // Bind an ephemeral port, then release it so connections are refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let uri = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        assert!(send(&Client::new(), &uri, Route::Health).await.is_err());
    }
}
