//! The fixed instrument set of the loan service.

use loanwatch_core::error::Result;
use prometheus::{CounterVec, Gauge, GaugeVec, HistogramVec};

use crate::config::MetricsSection;
use crate::obs::metrics::MetricsRegistry;

/// Handles to every instrument the request hook and business trackers update.
///
/// Built once per registry at startup; a second `register` against the same
/// registry fails with `AlreadyRegistered`. The handles are cheap to clone and
/// share their series with the registry.
#[derive(Clone, Debug)]
pub struct LoanMetrics {
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub http_requests_in_progress: GaugeVec,
    pub http_errors_total: CounterVec,
    pub loans_created_total: CounterVec,
    pub loan_amount_total: CounterVec,
    pub active_loans: GaugeVec,
    pub database_connections: Gauge,
}

impl LoanMetrics {
    pub fn register(registry: &MetricsRegistry, cfg: &MetricsSection) -> Result<Self> {
        Ok(Self {
            http_requests_total: registry.register_counter(
                "http_requests_total",
                "Total HTTP requests",
                &["method", "endpoint", "status"],
            )?,
            http_request_duration_seconds: registry.register_histogram(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
                &["method", "endpoint"],
                &cfg.duration_buckets,
            )?,
            http_requests_in_progress: registry.register_gauge(
                "http_requests_in_progress",
                "Number of HTTP requests in progress",
                &["method", "endpoint"],
            )?,
            loans_created_total: registry.register_counter(
                "loans_created_total",
                "Total number of loans created",
                &["currency", "status"],
            )?,
            loan_amount_total: registry.register_counter(
                "loan_amount_total",
                "Total loan amount disbursed",
                &["currency"],
            )?,
            active_loans: registry.register_gauge(
                "active_loans",
                "Number of active loans by status",
                &["status"],
            )?,
            database_connections: registry.register_unlabeled_gauge(
                "database_connections",
                "Number of database connections",
            )?,
            http_errors_total: registry.register_counter(
                "http_errors_total",
                "Total HTTP errors",
                &["method", "endpoint", "status"],
            )?,
        })
    }
}
