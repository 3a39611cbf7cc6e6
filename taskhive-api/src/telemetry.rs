//! Prometheus Metrics
//!
//! Defines the Taskhive metrics with appropriate labels, the recorder the
//! cache layer is constructed with, and the /metrics endpoint for
//! Prometheus scraping.
//!
//! The cache crate only knows the `CacheMetrics` trait; the Prometheus
//! binding lives here and is injected at startup, so tests elsewhere can
//! use counting recorders without touching a registry.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::sync::Arc;
use uuid::Uuid;

use taskhive_cache::{CacheMetrics, CacheNamespace};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

// ============================================================================
// CACHE METRICS RECORDER
// ============================================================================

/// Prometheus-backed implementation of the cache recorder trait.
///
/// Register once at startup and inject into the `TaskCache` constructor.
#[derive(Clone)]
pub struct PrometheusCacheMetrics {
    /// Cache hit counter - labels: namespace
    hits: CounterVec,

    /// Cache miss counter - labels: namespace
    misses: CounterVec,

    /// Cache write counter - labels: namespace
    writes: CounterVec,

    /// Cache eviction counter - labels: namespace
    evictions: CounterVec,
}

impl PrometheusCacheMetrics {
    /// Create and register the cache counters with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            hits: register_counter_vec!(
                "taskhive_cache_hits_total",
                "Total number of cache hits",
                &["namespace"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register cache hit counter: {}", e))
            })?,

            misses: register_counter_vec!(
                "taskhive_cache_misses_total",
                "Total number of cache misses (including folded backend errors)",
                &["namespace"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register cache miss counter: {}", e))
            })?,

            writes: register_counter_vec!(
                "taskhive_cache_writes_total",
                "Total number of cache writes",
                &["namespace"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register cache write counter: {}", e))
            })?,

            evictions: register_counter_vec!(
                "taskhive_cache_evictions_total",
                "Total number of cache evictions",
                &["namespace"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!(
                    "Failed to register cache eviction counter: {}",
                    e
                ))
            })?,
        })
    }
}

impl CacheMetrics for PrometheusCacheMetrics {
    fn record_hit(&self, namespace: CacheNamespace) {
        self.hits.with_label_values(&[namespace.as_str()]).inc();
    }

    fn record_miss(&self, namespace: CacheNamespace) {
        self.misses.with_label_values(&[namespace.as_str()]).inc();
    }

    fn record_write(&self, namespace: CacheNamespace) {
        self.writes.with_label_values(&[namespace.as_str()]).inc();
    }

    fn record_eviction(&self, namespace: CacheNamespace) {
        self.evictions.with_label_values(&[namespace.as_str()]).inc();
    }
}

// ============================================================================
// HTTP METRICS
// ============================================================================

/// HTTP request counters and latency histogram.
#[derive(Clone)]
pub struct HttpMetrics {
    /// HTTP request counter - labels: method, path, status
    requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    request_duration_seconds: HistogramVec,
}

impl HttpMetrics {
    /// Create and register the HTTP metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            requests_total: register_counter_vec!(
                "taskhive_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register request counter: {}", e))
            })?,

            request_duration_seconds: register_histogram_vec!(
                "taskhive_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register request histogram: {}", e))
            })?,
        })
    }

    /// Record one completed HTTP request.
    pub fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }
}

/// Normalize a path for metrics labels by collapsing UUID segments.
///
/// Prevents high-cardinality label explosion in Prometheus.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if Uuid::parse_str(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Axum middleware recording request count and latency for every route.
pub async fn http_metrics_middleware(
    State(metrics): State<Arc<HttpMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let status = response.status().as_u16();
    metrics.record_request(&method, &path, status, start.elapsed().as_secs_f64());

    tracing::debug!(
        method = %method,
        path = %path,
        status,
        duration_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}

// ============================================================================
// /metrics ENDPOINT
// ============================================================================

/// Handler for GET /metrics.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

/// Test-only access to singleton recorder instances.
///
/// The prometheus default registry rejects duplicate registrations, so
/// every test module shares these instead of calling `new()` again.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use once_cell::sync::Lazy;

    static CACHE_METRICS: Lazy<Arc<PrometheusCacheMetrics>> =
        Lazy::new(|| Arc::new(PrometheusCacheMetrics::new().expect("cache metrics should register")));
    static HTTP_METRICS: Lazy<Arc<HttpMetrics>> =
        Lazy::new(|| Arc::new(HttpMetrics::new().expect("http metrics should register")));

    pub(crate) fn cache_metrics() -> Arc<PrometheusCacheMetrics> {
        Arc::clone(&CACHE_METRICS)
    }

    pub(crate) fn http_metrics() -> Arc<HttpMetrics> {
        Arc::clone(&HTTP_METRICS)
    }
}
