//! Logging, tracing and metrics setup.

pub mod metrics;
pub mod telemetry;

pub use metrics::EdgeMetrics;
pub use telemetry::{
    TelemetryConfig, current_trace_id, init_telemetry, shutdown_telemetry,
    trace_id_from_traceparent,
};
