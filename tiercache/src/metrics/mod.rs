//! Prometheus Metrics for tiered caches
//!
//! Per-layer metrics recorded by the metrics decorator:
//! - Operation counts by level, store, operation and status
//! - Operation latency
//! - Key hits and misses per layer

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramVec, IntCounterVec, TextEncoder, register_histogram_vec,
    register_int_counter_vec,
};

lazy_static! {
    /// Total layer operations by level, store, operation (get, set, delete) and status
    pub static ref LAYER_OPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tiercache_layer_operations_total",
        "Total number of layer operations",
        &["level", "store", "operation", "status"]
    ).unwrap();

    /// Layer operation latency in seconds
    pub static ref LAYER_OP_DURATION: HistogramVec = register_histogram_vec!(
        "tiercache_layer_operation_duration_seconds",
        "Layer operation latency in seconds",
        &["level", "store", "operation"],
        vec![0.00001, 0.0001, 0.001, 0.01, 0.1, 1.0]
    ).unwrap();

    /// Keys served (hit) or passed down (miss) per layer
    pub static ref LAYER_KEYS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tiercache_layer_keys_total",
        "Keys looked up per layer by outcome",
        &["level", "store", "outcome"]
    ).unwrap();
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a layer operation
pub fn record_layer_op(level: usize, store: &str, operation: &str, status: &str, duration_secs: f64) {
    let level = level.to_string();
    LAYER_OPS_TOTAL
        .with_label_values(&[level.as_str(), store, operation, status])
        .inc();
    LAYER_OP_DURATION
        .with_label_values(&[level.as_str(), store, operation])
        .observe(duration_secs);
}

/// Record key hits and misses for a layer read
pub fn record_layer_keys(level: usize, store: &str, hits: usize, misses: usize) {
    let level = level.to_string();
    LAYER_KEYS_TOTAL
        .with_label_values(&[level.as_str(), store, "hit"])
        .inc_by(hits as u64);
    LAYER_KEYS_TOTAL
        .with_label_values(&[level.as_str(), store, "miss"])
        .inc_by(misses as u64);
}
