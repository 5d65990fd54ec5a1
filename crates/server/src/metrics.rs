//! Prometheus metrics for the Bazaar server.
//!
//! Exposes counters for approval decisions, visibility repair, and seller
//! notifications.
//!
//! # Security Note
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! Metrics carry no product or seller identifiers, only aggregate counts.
//! The endpoint should still be network-restricted to the scraper.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Approval metrics
pub static APPROVAL_DECISIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bazaar_approval_decisions_total",
            "Total approval decisions applied, by resulting status",
        ),
        &["status"],
    )
    .expect("metric creation failed")
});

pub static APPROVAL_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bazaar_approval_failures_total",
            "Total approval decisions that failed, by error code",
        ),
        &["error_type"],
    )
    .expect("metric creation failed")
});

// Repair metrics
pub static REPAIR_RUNS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bazaar_repair_runs_total",
            "Total visibility repair runs, by trigger and outcome",
        ),
        &["trigger", "outcome"],
    )
    .expect("metric creation failed")
});

pub static REPAIR_ROWS_ACTIVATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "bazaar_repair_rows_activated_total",
        "Total approved products re-activated by the repair sweep",
    )
    .expect("metric creation failed")
});

pub static REPAIR_ROWS_DEACTIVATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "bazaar_repair_rows_deactivated_total",
        "Total rejected or under-review products hidden by the repair sweep",
    )
    .expect("metric creation failed")
});

pub static REPAIR_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "bazaar_repair_duration_seconds",
            "Time taken to run both repair sweeps",
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
    )
    .expect("metric creation failed")
});

pub static INCONSISTENT_PRODUCTS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "bazaar_inconsistent_products",
        "Products whose visibility flags disagree with their status, as of the last report",
    )
    .expect("metric creation failed")
});

// Notification metrics
pub static NOTIFICATIONS_SENT: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "bazaar_notifications_sent_total",
        "Total seller notifications recorded",
    )
    .expect("metric creation failed")
});

pub static NOTIFICATIONS_FAILED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "bazaar_notifications_failed_total",
        "Total seller notifications that could not be recorded",
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so integration tests can build many routers.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(APPROVAL_DECISIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(APPROVAL_FAILURES.clone()))
            .expect("metric registration failed");

        REGISTRY
            .register(Box::new(REPAIR_RUNS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REPAIR_ROWS_ACTIVATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REPAIR_ROWS_DEACTIVATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REPAIR_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(INCONSISTENT_PRODUCTS.clone()))
            .expect("metric registration failed");

        REGISTRY
            .register(Box::new(NOTIFICATIONS_SENT.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(NOTIFICATIONS_FAILED.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record a failed approval decision by error code.
pub fn record_approval_failure(error_type: &str) {
    APPROVAL_FAILURES.with_label_values(&[error_type]).inc();
}
