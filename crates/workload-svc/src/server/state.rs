//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::telemetry::WorkloadMetrics;
use crate::workload::{RetentionBuffer, WorkloadSettings};

/// Long-lived service context shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped, `Arc`-backed, or `Copy`)
/// so that Axum can clone the state for each request.
#[derive(Clone)]
pub struct AppState {
    /// Service name reported by `/health`.
    pub service_name: Arc<str>,
    /// Workload tunables.
    pub settings: WorkloadSettings,
    /// Batches retained by `/alloc`; the only shared mutable state.
    pub retention: RetentionBuffer,
    /// Workload metric instruments (no-op when disabled).
    pub metrics: WorkloadMetrics,
}

impl AppState {
    /// Create a new [`AppState`] with an empty retention buffer sized from `settings`.
    pub fn new(service_name: &str, settings: WorkloadSettings, metrics: WorkloadMetrics) -> Self {
        Self {
            service_name: Arc::from(service_name),
            settings,
            retention: RetentionBuffer::new(settings.max_retained_batches),
            metrics,
        }
    }
}

impl Default for AppState {
    /// Creates a default [`AppState`] with default settings and metrics disabled.
    fn default() -> Self {
        Self::new(
            "demo-app",
            WorkloadSettings::default(),
            WorkloadMetrics::default(),
        )
    }
}
