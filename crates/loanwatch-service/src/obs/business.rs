//! Business trackers called by application code outside the HTTP lifecycle.
//!
//! These use the panicking `with_label_values`: every call site passes a
//! fixed number of labels, so an arity mismatch is a programming error and
//! fails fast.

use crate::obs::loan_metrics::LoanMetrics;

/// Status recorded by [`track_loan_creation`] when the caller gives none.
pub const DEFAULT_LOAN_STATUS: &str = "pending";

/// `loans_created_total{currency, status} += 1`.
pub fn track_loan_creation(metrics: &LoanMetrics, currency: &str, status: Option<&str>) {
    let status = status.unwrap_or(DEFAULT_LOAN_STATUS);
    metrics
        .loans_created_total
        .with_label_values(&[currency, status])
        .inc();
}

/// `loan_amount_total{currency} += amount`.
///
/// `amount` must be non-negative; it is not checked here, and `prometheus`
/// panics on a negative counter increment in debug builds.
pub fn track_loan_amount(metrics: &LoanMetrics, amount: f64, currency: &str) {
    metrics
        .loan_amount_total
        .with_label_values(&[currency])
        .inc_by(amount);
}

/// Overwrite `active_loans{status}` for every status given.
///
/// Statuses not present keep whatever value they had before.
pub fn update_active_loans_gauge<I, S>(metrics: &LoanMetrics, status_counts: I)
where
    I: IntoIterator<Item = (S, u64)>,
    S: AsRef<str>,
{
    for (status, count) in status_counts {
        metrics
            .active_loans
            .with_label_values(&[status.as_ref()])
            .set(count as f64);
    }
}

/// Set `database_connections` to the current open-connection count.
pub fn update_database_connections(metrics: &LoanMetrics, open: u64) {
    metrics.database_connections.set(open as f64);
}
