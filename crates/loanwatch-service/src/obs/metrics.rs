//! Metrics registry backed by the `prometheus` crate.
//!
//! [`MetricsRegistry`] owns a `prometheus::Registry` (never the process-global
//! default one) and maps the crate's errors onto [`LoanWatchError`]:
//!
//! - building a family with a bad name, label name or bucket layout is
//!   `InvalidMetric`;
//! - registering a second family under an existing name is
//!   `AlreadyRegistered`, whatever its kind or label names.
//!
//! Series storage, cumulative histogram buckets and text rendering belong to
//! `prometheus`. Each histogram series is snapshotted under its own lock when
//! gathered, so bucket counts, `_sum` and `_count` of one scrape agree.

use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

use loanwatch_core::error::{LoanWatchError, Result};

/// Explicitly owned set of metric families.
pub struct MetricsRegistry {
    inner: Registry,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            inner: Registry::new(),
        }
    }

    pub fn register_counter(&self, name: &str, help: &str, labels: &[&str]) -> Result<CounterVec> {
        let vec = CounterVec::new(Opts::new(name, help), labels).map_err(|e| invalid(name, e))?;
        self.insert(name, vec)
    }

    pub fn register_gauge(&self, name: &str, help: &str, labels: &[&str]) -> Result<GaugeVec> {
        let vec = GaugeVec::new(Opts::new(name, help), labels).map_err(|e| invalid(name, e))?;
        self.insert(name, vec)
    }

    /// A gauge without labels. It renders (as 0) from registration on.
    pub fn register_unlabeled_gauge(&self, name: &str, help: &str) -> Result<Gauge> {
        let gauge = Gauge::with_opts(Opts::new(name, help)).map_err(|e| invalid(name, e))?;
        self.insert(name, gauge)
    }

    /// `buckets` must be non-empty and strictly increasing; `+Inf` is implicit.
    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
        buckets: &[f64],
    ) -> Result<HistogramVec> {
        // prometheus silently substitutes its default layout for an empty one
        if buckets.is_empty() {
            return Err(LoanWatchError::InvalidMetric(format!(
                "{name}: histogram needs at least one bucket"
            )));
        }
        let opts = HistogramOpts::new(name, help).buckets(buckets.to_vec());
        let vec = HistogramVec::new(opts, labels).map_err(|e| invalid(name, e))?;
        self.insert(name, vec)
    }

    /// Register a collector built elsewhere (process metrics, exporters).
    pub fn register_collector(&self, name: &str, collector: Box<dyn Collector>) -> Result<()> {
        self.inner
            .register(collector)
            .map_err(|e| already_registered(name, e))?;
        tracing::debug!(metric = name, "registered collector");
        Ok(())
    }

    /// Snapshot of every family with at least one series, sorted by name.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.inner.gather()
    }

    /// Names of the families [`gather`](Self::gather) currently returns.
    pub fn family_names(&self) -> Vec<String> {
        self.gather()
            .iter()
            .map(|mf| mf.get_name().to_owned())
            .collect()
    }

    /// Text exposition of the whole registry: the full document or an error,
    /// never a partial body.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.gather(), &mut buffer)
            .map_err(|e| LoanWatchError::Internal(format!("encode metrics: {e}")))?;
        String::from_utf8(buffer)
            .map_err(|e| LoanWatchError::Internal(format!("metrics are not utf-8: {e}")))
    }

    /// Content type of [`render`](Self::render) output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_owned()
    }

    fn insert<C>(&self, name: &str, collector: C) -> Result<C>
    where
        C: Collector + Clone + 'static,
    {
        self.inner
            .register(Box::new(collector.clone()))
            .map_err(|e| already_registered(name, e))?;
        tracing::debug!(metric = name, "registered metric");
        Ok(collector)
    }
}

fn invalid(name: &str, e: prometheus::Error) -> LoanWatchError {
    LoanWatchError::InvalidMetric(format!("{name}: {e}"))
}

// The collector was already built, so a refusal here is a clash with a
// descriptor the registry holds (`AlreadyReg`, or same name with other labels).
fn already_registered(name: &str, e: prometheus::Error) -> LoanWatchError {
    tracing::debug!(metric = name, error = %e, "registration refused");
    LoanWatchError::AlreadyRegistered(name.to_owned())
}

/// Map a failed series lookup (`get_metric_with_label_values`,
/// `get_metric_with`) onto the shared error type.
pub fn label_error(metric: &str, e: prometheus::Error) -> LoanWatchError {
    match e {
        prometheus::Error::InconsistentCardinality { expect, got } => LoanWatchError::LabelArity {
            metric: metric.to_owned(),
            expected: expect,
            got,
        },
        other => LoanWatchError::LabelMismatch {
            metric: metric.to_owned(),
            reason: other.to_string(),
        },
    }
}
