//! Routes and response bodies of the workload HTTP API.
//!
//! Response types are serialised as JSON by the service and deserialised by
//! clients such as the traffic generator.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

// ---------------------------------------------------------------------------
// Route catalogue
// ---------------------------------------------------------------------------

/// One of the four workload endpoints. Every endpoint is a `GET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Liveness probe.
    Health,
    /// Baseline fast path.
    Hello,
    /// CPU-bound path.
    Slow,
    /// Memory-bound path.
    Alloc,
}

impl Route {
    /// All routes, in declaration order.
    pub const ALL: [Route; 4] = [Route::Health, Route::Hello, Route::Slow, Route::Alloc];

    /// URL path the route is served on.
    pub const fn path(self) -> &'static str {
        match self {
            Route::Health => "/health",
            Route::Hello => "/hello",
            Route::Slow => "/slow",
            Route::Alloc => "/alloc",
        }
    }

    /// Short name used in log fields and configuration.
    pub const fn name(self) -> &'static str {
        match self {
            Route::Health => "health",
            Route::Hello => "hello",
            Route::Slow => "slow",
            Route::Alloc => "alloc",
        }
    }

    /// Map a request path back to its route.
    pub fn from_path(path: &str) -> Option<Route> {
        Route::ALL.into_iter().find(|r| r.path() == path)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Route {
    type Err = ProtocolError;

    /// Accepts the short name with or without a leading `/`, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('/').to_ascii_lowercase();
        Route::ALL
            .into_iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| ProtocolError::UnknownRoute(s.trim().to_owned()))
    }
}

/// Parse a comma-separated `route=weight` list, e.g. `"hello=60,slow=30,alloc=10"`.
///
/// Blank entries are ignored. A route may appear only once; a repeated route
/// keeps its last weight.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidWeight`] for entries without `=` or with a
/// non-numeric weight, and [`ProtocolError::UnknownRoute`] for unknown names.
pub fn parse_route_weights(spec: &str) -> Result<Vec<(Route, u32)>, ProtocolError> {
    let mut weights: Vec<(Route, u32)> = Vec::new();
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, weight) = entry
            .split_once('=')
            .ok_or_else(|| ProtocolError::InvalidWeight(entry.to_owned()))?;
        let route: Route = name.parse()?;
        let weight: u32 = weight
            .trim()
            .parse()
            .map_err(|_| ProtocolError::InvalidWeight(entry.to_owned()))?;

        match weights.iter_mut().find(|(r, _)| *r == route) {
            Some(existing) => existing.1 = weight,
            None => weights.push((route, weight)),
        }
    }
    Ok(weights)
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"healthy"`.
    pub status: String,
    /// Configured service name.
    pub service: String,
}

/// Response body for `GET /hello`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloResponse {
    pub message: String,
    pub route: String,
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub timestamp: String,
}

/// Response body for `GET /slow`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowResponse {
    pub message: String,
    pub route: String,
    /// Number of evaluations in which the pattern matched the sample.
    pub match_count: u32,
    pub duration_ms: u64,
}

/// Response body for `GET /alloc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocResponse {
    pub message: String,
    pub route: String,
    /// Size of the batch allocated by this call, in MiB.
    pub allocated_mb: f64,
    /// Batches retained after this call.
    pub total_batches: usize,
    pub duration_ms: u64,
}

/// Error body returned for unknown routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"not_found"`).
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn route_paths_and_names() {
        assert_eq!(Route::Health.path(), "/health");
        assert_eq!(Route::Alloc.name(), "alloc");
        assert_eq!(Route::from_path("/slow"), Some(Route::Slow));
        assert_eq!(Route::from_path("/metrics"), None);
    }

    #[test]
    fn route_from_str_is_lenient_about_slash_and_case() {
        assert_eq!("hello".parse::<Route>().unwrap(), Route::Hello);
        assert_eq!("/SLOW".parse::<Route>().unwrap(), Route::Slow);
        assert_eq!(
            "metrics".parse::<Route>(),
            Err(ProtocolError::UnknownRoute("metrics".into()))
        );
    }

    #[test]
    fn parse_default_weights() {
        let w = parse_route_weights("hello=60,slow=30,alloc=10").unwrap();
        assert_eq!(
            w,
            vec![(Route::Hello, 60), (Route::Slow, 30), (Route::Alloc, 10)]
        );
    }

    #[test]
    fn parse_weights_tolerates_whitespace_and_repeats() {
        let w = parse_route_weights(" hello = 1 , , hello=5, health=2 ").unwrap();
        assert_eq!(w, vec![(Route::Hello, 5), (Route::Health, 2)]);
    }

    #[test]
    fn parse_weights_rejects_malformed_entries() {
        assert!(matches!(
            parse_route_weights("hello"),
            Err(ProtocolError::InvalidWeight(_))
        ));
        assert!(matches!(
            parse_route_weights("hello=lots"),
            Err(ProtocolError::InvalidWeight(_))
        ));
        assert!(matches!(
            parse_route_weights("metrics=3"),
            Err(ProtocolError::UnknownRoute(_))
        ));
    }

    #[test]
    fn alloc_response_field_names() {
        let body = AllocResponse {
            message: "Memory allocation completed".into(),
            route: "/alloc".into(),
            allocated_mb: 50.0,
            total_batches: 3,
            duration_ms: 12,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "message": "Memory allocation completed",
                "route": "/alloc",
                "allocated_mb": 50.0,
                "total_batches": 3,
                "duration_ms": 12
            })
        );
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("not_found", "no such route");
        assert_eq!(e.code, "not_found");
        assert!(e.message.contains("no such route"));
    }
}
