// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    REQUESTS_TOTAL,
    REQUEST_DURATION,
    CACHE_OPERATIONS,
    CACHE_ENTRIES,
    FALLBACK_GENERATIONS,
    PRODUCER_CALLS,
    PRODUCER_DURATION,
};

/// Helper to record admin request metrics
pub fn record_request(method: &str, endpoint: &str, status_code: u16, duration_secs: f64) {
    REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status_code.to_string()])
        .inc();

    REQUEST_DURATION
        .with_label_values(&[method, endpoint])
        .observe(duration_secs);
}

/// Helper to record a single cache operation (hit, miss, set, eviction, expired)
pub fn record_cache_op(generation: &str, operation: &str) {
    CACHE_OPERATIONS.with_label_values(&[generation, operation]).inc();
}

pub fn record_cache_ops(generation: &str, operation: &str, count: usize) {
    CACHE_OPERATIONS
        .with_label_values(&[generation, operation])
        .inc_by(count as f64);
}

pub fn update_cache_entries(generation: &str, count: usize) {
    CACHE_ENTRIES.with_label_values(&[generation]).set(count as f64);
}

pub fn record_fallback_generation(generation: &str) {
    FALLBACK_GENERATIONS.with_label_values(&[generation]).inc();
}

/// Helper to record a producer invocation
pub fn record_producer_call(generation: &str, success: bool, duration_secs: f64) {
    let status = if success { "ok" } else { "error" };
    PRODUCER_CALLS.with_label_values(&[generation, status]).inc();
    PRODUCER_DURATION
        .with_label_values(&[generation])
        .observe(duration_secs);
}
