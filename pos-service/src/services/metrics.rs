//! Prometheus metrics for pos-service.
//!
//! HTTP request metrics come from the `metrics` facade (see
//! `service_core::middleware::metrics`) and are rendered through the installed
//! Prometheus recorder; domain counters live in the default `prometheus`
//! registry. `/metrics` serves both.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!("pos_db_query_duration_seconds", "Database query duration"),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Orders created, by outcome.
pub static ORDERS_CREATED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pos_orders_created_total",
        "Total order creation attempts by outcome",
        &["status"]
    )
    .expect("Failed to register pos_orders_created_total")
});

/// Payments submitted, by outcome.
pub static PAYMENTS_SUBMITTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pos_payments_submitted_total",
        "Total payment submissions by outcome",
        &["status"]
    )
    .expect("Failed to register pos_payments_submitted_total")
});

/// Amount paid through the service, in minor units.
pub static PAYMENT_AMOUNT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pos_payment_amount_minor_units_total",
        "Total bill and tip amounts in minor currency units",
        &["currency", "kind"]
    )
    .expect("Failed to register pos_payment_amount_minor_units_total")
});

/// Calls to the payment processor by operation and outcome.
pub static PROCESSOR_CALLS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pos_processor_calls_total",
        "Total payment processor calls by operation and outcome",
        &["operation", "outcome"]
    )
    .expect("Failed to register pos_processor_calls_total")
});

pub fn init_metrics() {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if METRICS_HANDLE.set(handle).is_err() {
                tracing::warn!("Metrics handle already initialized");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus recorder"),
    }

    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&ORDERS_CREATED_TOTAL);
    Lazy::force(&PAYMENTS_SUBMITTED_TOTAL);
    Lazy::force(&PAYMENT_AMOUNT_TOTAL);
    Lazy::force(&PROCESSOR_CALLS_TOTAL);
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return output;
    }
    output.push_str(&String::from_utf8_lossy(&buffer));

    output
}

pub fn record_order_created(status: &str) {
    ORDERS_CREATED_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_payment_submitted(status: &str) {
    PAYMENTS_SUBMITTED_TOTAL.with_label_values(&[status]).inc();
}

/// Record bill and tip amounts (minor units). Negative values are ignored.
pub fn record_payment_amount(currency: &str, bill_minor: i64, tip_minor: i64) {
    if let Ok(bill) = u64::try_from(bill_minor) {
        PAYMENT_AMOUNT_TOTAL
            .with_label_values(&[currency, "bill"])
            .inc_by(bill);
    }
    if let Ok(tip) = u64::try_from(tip_minor) {
        PAYMENT_AMOUNT_TOTAL
            .with_label_values(&[currency, "tip"])
            .inc_by(tip);
    }
}

pub fn record_processor_call(operation: &str, outcome: &str) {
    PROCESSOR_CALLS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}
