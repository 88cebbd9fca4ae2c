// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramVec, GaugeVec, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_gauge_vec_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // ADMIN REQUEST METRICS
    // ============================================================================

    /// Total number of admin API requests
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("requests_total", "Total number of admin API requests"),
        &["method", "endpoint", "status_code"],
        REGISTRY
    ).unwrap();

    /// Request duration histogram
    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("request_duration_seconds", "Request duration in seconds")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["method", "endpoint"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations per generation
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_operations_total", "Total cache operations"),
        &["generation", "operation"], // operation: hit, miss, set, eviction, expired
        REGISTRY
    ).unwrap();

    /// Current cache entries per generation
    pub static ref CACHE_ENTRIES: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("cache_entries_current", "Current number of cache entries"),
        &["generation"],
        REGISTRY
    ).unwrap();

    /// Generations created from the fallback configuration
    pub static ref FALLBACK_GENERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new(
            "cache_fallback_generations_total",
            "Generations that were not configured and used the fallback capacity/TTL"
        ),
        &["generation"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // PRODUCER METRICS
    // ============================================================================

    /// Producer invocations on cache miss
    pub static ref PRODUCER_CALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("producer_calls_total", "Total asset producer invocations"),
        &["generation", "status"], // status: ok, error
        REGISTRY
    ).unwrap();

    /// Producer duration
    pub static ref PRODUCER_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("producer_duration_seconds", "Asset producer duration")
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["generation"],
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
