//! Prometheus exposition endpoint
//!
//! Mirrors the in-process registry into Prometheus counters and a latency
//! histogram, served in text format on `/metrics` while the run is in
//! flight. Disabled unless a metrics port is configured.

use lazy_static::lazy_static;
use prometheus::{
    histogram_opts, register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder,
};
use std::time::Duration;
use warp::Filter;

lazy_static! {
    /// Registry backing the exposition endpoint
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    static ref REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "bankload_requests_total",
        "Total requests issued, by operation",
        &["operation"],
        PROMETHEUS_REGISTRY
    )
    .unwrap();

    static ref FAILURES_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "bankload_failures_total",
        "Total failed requests, by operation",
        &["operation"],
        PROMETHEUS_REGISTRY
    )
    .unwrap();

    static ref REQUEST_LATENCY: HistogramVec = register_histogram_vec_with_registry!(
        histogram_opts!(
            "bankload_request_latency_seconds",
            "Request latency distribution, by operation",
            prometheus::exponential_buckets(0.001, 2.0, 15).unwrap()
        ),
        &["operation"],
        PROMETHEUS_REGISTRY
    )
    .unwrap();
}

/// Mirror one recorded call into the Prometheus registry.
pub fn observe(operation: &str, latency: Duration, failed: bool) {
    REQUESTS_TOTAL.with_label_values(&[operation]).inc();
    if failed {
        FAILURES_TOTAL.with_label_values(&[operation]).inc();
    }
    REQUEST_LATENCY
        .with_label_values(&[operation])
        .observe(latency.as_secs_f64());
}

/// Encode the registry in Prometheus text format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        log::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Spawn the exposition server on the given port.
pub fn spawn(port: u16) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let route = warp::path("metrics").and(warp::get()).map(gather);
        log::info!("Prometheus metrics listening on http://0.0.0.0:{}/metrics", port);
        warp::serve(route).run(([0, 0, 0, 0], port)).await;
    })
}
