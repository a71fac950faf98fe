//! Request lifecycle hook.
//!
//! `on_entry` runs before the handler and returns an [`InFlight`] value that
//! the caller hands back to `on_exit` once the response exists. Every metric
//! update is isolated: a failing update is logged and the rest still run, and
//! nothing here can change the response.
//!
//! Exit without a matching entry (`inflight = None`) still counts the request
//! and any error, but skips the duration observation and the in-progress
//! decrement, since neither has a start to pair with.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use loanwatch_core::error::Result;

use crate::obs::loan_metrics::LoanMetrics;
use crate::obs::metrics::label_error;

/// Endpoint label for requests that matched no route.
pub const UNKNOWN_ENDPOINT: &str = "unknown";

/// Per-request state created at entry and consumed at exit.
#[derive(Debug, Clone, Copy)]
pub struct InFlight {
    started: Instant,
}

impl InFlight {
    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[derive(Clone)]
pub struct RequestHook {
    metrics: Arc<LoanMetrics>,
}

impl RequestHook {
    pub fn new(metrics: Arc<LoanMetrics>) -> Self {
        Self { metrics }
    }

    pub fn on_entry(&self, method: &str, endpoint: &str) -> InFlight {
        let inflight = InFlight {
            started: Instant::now(),
        };
        isolate("http_requests_in_progress", || {
            self.metrics
                .http_requests_in_progress
                .get_metric_with_label_values(&[method, endpoint])
                .map_err(|e| label_error("http_requests_in_progress", e))?
                .inc();
            Ok(())
        });
        inflight
    }

    pub fn on_exit(&self, method: &str, endpoint: &str, status: u16, inflight: Option<&InFlight>) {
        let status_label = status.to_string();

        isolate("http_requests_total", || {
            self.metrics
                .http_requests_total
                .get_metric_with_label_values(&[method, endpoint, status_label.as_str()])
                .map_err(|e| label_error("http_requests_total", e))?
                .inc();
            Ok(())
        });

        match inflight {
            Some(f) => {
                let latency = f.elapsed();
                isolate("http_request_duration_seconds", || {
                    self.metrics
                        .http_request_duration_seconds
                        .get_metric_with_label_values(&[method, endpoint])
                        .map_err(|e| label_error("http_request_duration_seconds", e))?
                        .observe(latency.as_secs_f64());
                    Ok(())
                });
                self.leave(method, endpoint);
            }
            None => {
                tracing::debug!(%method, %endpoint, status, "exit hook without entry context");
            }
        }

        if status >= 400 {
            isolate("http_errors_total", || {
                self.metrics
                    .http_errors_total
                    .get_metric_with_label_values(&[method, endpoint, status_label.as_str()])
                    .map_err(|e| label_error("http_errors_total", e))?
                    .inc();
                Ok(())
            });
        }
    }

    /// The request was dropped before a response existed (client went away).
    /// Only the in-progress gauge is settled; nothing is counted.
    pub fn on_abandon(&self, method: &str, endpoint: &str, _inflight: &InFlight) {
        self.leave(method, endpoint);
    }

    fn leave(&self, method: &str, endpoint: &str) {
        isolate("http_requests_in_progress", || {
            self.metrics
                .http_requests_in_progress
                .get_metric_with_label_values(&[method, endpoint])
                .map_err(|e| label_error("http_requests_in_progress", e))?
                .dec();
            Ok(())
        });
    }
}

fn isolate(metric: &'static str, update: impl FnOnce() -> Result<()>) {
    if let Err(e) = update() {
        tracing::warn!(metric, code = e.code().as_str(), error = %e, "metric update failed");
    }
}

/// Settles the in-progress gauge if the handler future is dropped mid-flight.
struct AbandonGuard<'a> {
    hook: &'a RequestHook,
    method: &'a str,
    endpoint: &'a str,
    inflight: Option<InFlight>,
}

impl AbandonGuard<'_> {
    fn finish(mut self, status: u16) {
        let inflight = self.inflight.take();
        self.hook
            .on_exit(self.method, self.endpoint, status, inflight.as_ref());
    }
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if let Some(inflight) = self.inflight.take() {
            self.hook.on_abandon(self.method, self.endpoint, &inflight);
        }
    }
}

/// Axum middleware wiring [`RequestHook`] around every routed request.
///
/// The endpoint label is the matched route template (`/loans/:id`), or
/// [`UNKNOWN_ENDPOINT`] when routing found nothing.
pub async fn track_requests(State(hook): State<RequestHook>, req: Request, next: Next) -> Response {
    let method = req.method().as_str().to_owned();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNKNOWN_ENDPOINT.to_owned());

    let guard = AbandonGuard {
        hook: &hook,
        method: &method,
        endpoint: &endpoint,
        inflight: Some(hook.on_entry(&method, &endpoint)),
    };

    let response = next.run(req).await;
    guard.finish(response.status().as_u16());
    response
}
