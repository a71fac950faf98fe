//! Observability: metrics registry, request hook, business trackers.
//!
//! Instruments are `prometheus` vecs registered on an explicitly constructed
//! [`metrics::MetricsRegistry`], rendered by the scrape handler in `ops`.

pub mod business;
pub mod hook;
pub mod loan_metrics;
pub mod metrics;

pub use business::{
    track_loan_amount, track_loan_creation, update_active_loans_gauge,
    update_database_connections, DEFAULT_LOAN_STATUS,
};
pub use hook::{InFlight, RequestHook, UNKNOWN_ENDPOINT};
pub use loan_metrics::LoanMetrics;
pub use metrics::{label_error, MetricsRegistry};
