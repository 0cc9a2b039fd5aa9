//! Metric instruments recorded by the service.
//!
//! Instruments are created from the global meter provider installed by
//! [`init_telemetry`](super::init_telemetry). When an instrumentation is
//! disabled the corresponding handle holds no instruments and recording is a
//! no-op.

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter, UpDownCounter},
    KeyValue,
};

const METER_NAME: &str = "workload-svc";

fn meter() -> Meter {
    global::meter(METER_NAME)
}

/// HTTP server request metrics.
#[derive(Clone)]
pub struct HttpMetrics {
    requests: Counter<u64>,
    duration_ms: Histogram<f64>,
}

impl HttpMetrics {
    pub fn new() -> Self {
        let meter = meter();
        Self {
            requests: meter
                .u64_counter("http.server.requests")
                .with_description("HTTP requests handled, by route, method and status")
                .init(),
            duration_ms: meter
                .f64_histogram("http.server.request.duration_ms")
                .with_description("HTTP request latency in milliseconds")
                .init(),
        }
    }

    pub fn record(&self, route: &str, method: &str, status: u16, duration_ms: f64) {
        let attrs = [
            KeyValue::new("http.route", route.to_owned()),
            KeyValue::new("http.request.method", method.to_owned()),
            KeyValue::new("http.response.status_code", i64::from(status)),
        ];
        self.requests.add(1, &attrs);
        self.duration_ms.record(duration_ms, &attrs);
    }
}

impl Default for HttpMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
struct WorkloadInstruments {
    slow_evaluations: Counter<u64>,
    allocated_bytes: Counter<u64>,
    retained_batches: UpDownCounter<i64>,
}

/// Workload metrics: CPU evaluations and memory retention.
#[derive(Clone, Default)]
pub struct WorkloadMetrics {
    inner: Option<WorkloadInstruments>,
}

impl WorkloadMetrics {
    /// Create the workload instruments, or a no-op handle when `enabled` is false.
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self::default();
        }
        let meter = meter();
        Self {
            inner: Some(WorkloadInstruments {
                slow_evaluations: meter
                    .u64_counter("workload.slow.evaluations")
                    .with_description("Pattern evaluations performed by /slow")
                    .init(),
                allocated_bytes: meter
                    .u64_counter("workload.alloc.bytes")
                    .with_description("Bytes allocated by /alloc")
                    .init(),
                retained_batches: meter
                    .i64_up_down_counter("workload.alloc.retained_batches")
                    .with_description("Batches currently held by the retention buffer")
                    .init(),
            }),
        }
    }

    #[allow(dead_code)]
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn record_slow(&self, evaluations: u32) {
        if let Some(m) = &self.inner {
            m.slow_evaluations.add(u64::from(evaluations), &[]);
        }
    }

    /// Record one allocated batch of `bytes`, of which `evicted` older batches
    /// were dropped to make room.
    pub fn record_alloc(&self, bytes: usize, evicted: usize) {
        if let Some(m) = &self.inner {
            m.allocated_bytes.add(bytes as u64, &[]);
            m.retained_batches.add(1 - evicted as i64, &[]);
        }
    }
}
