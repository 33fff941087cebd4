//! Prometheus Metrics Definitions
//!
//! Defines all helpsite metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use helpsite_storage::CacheStore;
use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Upstream call latency buckets (seconds), capped by the 3s timeouts.
const UPSTREAM_LATENCY_BUCKETS: &[f64] = &[0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.0, 3.0, 6.0];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<HelpsiteMetrics>> = Lazy::new(HelpsiteMetrics::new);

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

/// Container for all helpsite metrics.
#[derive(Clone)]
pub struct HelpsiteMetrics {
    registry: Registry,

    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Upstream API call counter - labels: api, operation, outcome
    pub upstream_requests_total: CounterVec,

    /// Upstream API call duration histogram - labels: api, operation
    pub upstream_request_duration_seconds: HistogramVec,

    /// Token gate decisions - labels: decision (issue/refresh/reuse)
    pub token_decisions_total: CounterVec,

    /// Cache counters as reported by the backend - labels: backend, outcome
    pub cache_operations: GaugeVec,
}

impl HelpsiteMetrics {
    /// Create all metrics and register them with a dedicated registry.
    pub fn new() -> ApiResult<Self> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("helpsite_http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )
        .map_err(|e| registration_error("http_requests_total", e))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "helpsite_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(HTTP_LATENCY_BUCKETS.to_vec()),
            &["method", "path"],
        )
        .map_err(|e| registration_error("http_request_duration_seconds", e))?;

        let upstream_requests_total = CounterVec::new(
            Opts::new("helpsite_upstream_requests_total", "Total number of upstream API calls"),
            &["api", "operation", "outcome"],
        )
        .map_err(|e| registration_error("upstream_requests_total", e))?;

        let upstream_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "helpsite_upstream_request_duration_seconds",
                "Upstream API call duration in seconds",
            )
            .buckets(UPSTREAM_LATENCY_BUCKETS.to_vec()),
            &["api", "operation"],
        )
        .map_err(|e| registration_error("upstream_request_duration_seconds", e))?;

        let token_decisions_total = CounterVec::new(
            Opts::new("helpsite_token_decisions_total", "Access token gate decisions"),
            &["decision"],
        )
        .map_err(|e| registration_error("token_decisions_total", e))?;

        let cache_operations = GaugeVec::new(
            Opts::new("helpsite_cache_operations", "Cache operations since startup"),
            &["backend", "outcome"],
        )
        .map_err(|e| registration_error("cache_operations", e))?;

        registry
            .register(Box::new(http_requests_total.clone()))
            .map_err(|e| registration_error("http_requests_total", e))?;
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .map_err(|e| registration_error("http_request_duration_seconds", e))?;
        registry
            .register(Box::new(upstream_requests_total.clone()))
            .map_err(|e| registration_error("upstream_requests_total", e))?;
        registry
            .register(Box::new(upstream_request_duration_seconds.clone()))
            .map_err(|e| registration_error("upstream_request_duration_seconds", e))?;
        registry
            .register(Box::new(token_decisions_total.clone()))
            .map_err(|e| registration_error("token_decisions_total", e))?;
        registry
            .register(Box::new(cache_operations.clone()))
            .map_err(|e| registration_error("cache_operations", e))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            upstream_requests_total,
            upstream_request_duration_seconds,
            token_decisions_total,
            cache_operations,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record an upstream API call.
    pub fn record_upstream_call(&self, api: &str, operation: &str, outcome: &str, duration_secs: f64) {
        self.upstream_requests_total
            .with_label_values(&[api, operation, outcome])
            .inc();
        self.upstream_request_duration_seconds
            .with_label_values(&[api, operation])
            .observe(duration_secs);
    }

    /// Record what the token gate decided for a request.
    pub fn record_token_decision(&self, decision: &str) {
        self.token_decisions_total
            .with_label_values(&[decision])
            .inc();
    }

    /// Copy the backend's own counters into the cache gauges.
    pub fn set_cache_stats(&self, backend: &str, stats: &helpsite_storage::CacheStats) {
        for (outcome, value) in [
            ("hit", stats.hits),
            ("miss", stats.misses),
            ("write", stats.writes),
            ("error", stats.errors),
        ] {
            self.cache_operations
                .with_label_values(&[backend, outcome])
                .set(value as f64);
        }
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn encode(&self) -> ApiResult<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| ApiError::internal_error(format!("Failed to encode metrics: {}", e)))?;
        Ok(buffer)
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler(State(cache): State<Arc<dyn CacheStore>>) -> Response {
    let metrics = match METRICS.as_ref() {
        Ok(metrics) => metrics,
        Err(e) => {
            tracing::error!(error = %e, "Metrics unavailable");
            return (StatusCode::INTERNAL_SERVER_ERROR, [("content-type", "text/plain")], e.message.clone())
                .into_response();
        }
    };

    let stats = cache.stats().await;
    metrics.set_cache_stats(cache.backend_name(), &stats);

    match metrics.encode() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.message,
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpsite_storage::CacheStats;
    use prometheus::core::Collector;

    fn metrics() -> Result<&'static HelpsiteMetrics, String> {
        METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))
    }

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        let metrics = metrics()?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_http_request() -> Result<(), String> {
        let metrics = metrics()?;
        metrics.record_http_request("GET", "/contents/{slug}", 200, 0.015);
        let count = metrics
            .http_requests_total
            .with_label_values(&["GET", "/contents/{slug}", "200"])
            .get();
        assert!(count >= 1.0);
        Ok(())
    }

    #[test]
    fn test_record_upstream_and_token_decisions() -> Result<(), String> {
        let metrics = metrics()?;
        metrics.record_upstream_call("km", "search", "success", 0.120);
        metrics.record_upstream_call("auth", "auth", "error", 3.0);
        metrics.record_token_decision("refresh");
        assert!(metrics.token_decisions_total.with_label_values(&["refresh"]).get() >= 1.0);
        Ok(())
    }

    #[test]
    fn test_encode_includes_cache_gauges() -> Result<(), String> {
        let metrics = metrics()?;
        let stats = CacheStats {
            hits: 7,
            misses: 3,
            writes: 2,
            errors: 0,
        };
        metrics.set_cache_stats("unit-test", &stats);

        let text = String::from_utf8(metrics.encode().map_err(|e| e.message)?)
            .map_err(|e| e.to_string())?;
        assert!(text.contains("helpsite_cache_operations{backend=\"unit-test\",outcome=\"hit\"} 7"));
        Ok(())
    }
}
