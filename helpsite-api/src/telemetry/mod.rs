//! Helpsite Telemetry - Observability Infrastructure
//!
//! Structured logging through `tracing` and Prometheus metrics for the page
//! layer. Nothing here needs an external collector.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, HelpsiteMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracer, TelemetryConfig};
