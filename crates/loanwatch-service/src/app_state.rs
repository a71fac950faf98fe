//! Shared application state for the loanwatch service.
//!
//! Owns the metrics registry explicitly; nothing here is a process global, so
//! tests build as many isolated states as they like.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use loanwatch_core::error::Result;

use crate::config::ServiceConfig;
use crate::obs::{LoanMetrics, MetricsRegistry, RequestHook};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServiceConfig,
    registry: Arc<MetricsRegistry>,
    loan_metrics: Arc<LoanMetrics>,
    draining: AtomicBool,
}

impl AppState {
    /// Build application state, registering every instrument.
    /// Returns Result so main can abort startup on a registration error.
    pub fn new(cfg: ServiceConfig) -> Result<Self> {
        let registry = Arc::new(MetricsRegistry::new());
        let loan_metrics = Arc::new(LoanMetrics::register(&registry, &cfg.metrics)?);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                loan_metrics,
                draining: AtomicBool::new(false),
            }),
        })
    }

    pub fn cfg(&self) -> &ServiceConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.inner.registry)
    }

    /// Handles for business trackers.
    pub fn loan_metrics(&self) -> Arc<LoanMetrics> {
        Arc::clone(&self.inner.loan_metrics)
    }

    pub fn hook(&self) -> RequestHook {
        RequestHook::new(self.loan_metrics())
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
