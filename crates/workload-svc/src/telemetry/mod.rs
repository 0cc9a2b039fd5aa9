//! OpenTelemetry setup: traces, metrics, and structured logs exported over
//! OTLP/HTTP to `<endpoint>/v1/{traces,metrics,logs}`.
//!
//! # Telemetry invariants
//!
//! - The pipeline is initialised before the HTTP listener is served; the
//!   server takes a [`TelemetryGuard`] reference as proof.
//! - Export failures are logged and never surfaced to HTTP callers.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`), overridden
//!   by `RUST_LOG`.

pub mod config;
pub mod init;
pub mod metrics;

pub use config::{Instrumentations, TelemetryConfig};
pub use init::{init_telemetry, TelemetryGuard};
pub use metrics::{HttpMetrics, WorkloadMetrics};
