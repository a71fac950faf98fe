//! Scrape, health and readiness endpoints.
//!
//! Scrape bodies are read back with `prometheus-parse`, a parser independent
//! of the encoder that produced them.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::get,
    Router,
};
use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, MetricFamily};
use prometheus_parse::{Scrape, Value};
use tower::ServiceExt;

use loanwatch_service::app_state::AppState;
use loanwatch_service::config::{self, ServiceConfig};
use loanwatch_service::obs::{
    track_loan_amount, track_loan_creation, update_active_loans_gauge,
    update_database_connections,
};
use loanwatch_service::router::build_router;

fn app(state: &AppState) -> Router {
    let api = Router::new().route("/loans", get(|| async { "[]" }));
    build_router(state.clone(), api)
}

async fn get_text(app: &Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let res = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

fn parse(body: &str) -> Scrape {
    Scrape::parse(body.lines().map(|l| Ok::<_, std::io::Error>(l.to_owned()))).unwrap()
}

/// Counter or gauge value of the series carrying these labels.
fn value(scrape: &Scrape, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    scrape
        .samples
        .iter()
        .find(|s| {
            s.metric == name
                && labels
                    .iter()
                    .all(|(k, v)| s.labels.get(k).map(|x| x.to_string()).as_deref() == Some(*v))
        })
        .and_then(|s| match &s.value {
            Value::Counter(v) | Value::Gauge(v) | Value::Untyped(v) => Some(*v),
            _ => None,
        })
}

/// Trailing number of the first sample line starting with `prefix` that
/// contains every one of `needles`.
fn line_value(body: &str, prefix: &str, needles: &[&str]) -> Option<u64> {
    body.lines()
        .find(|l| l.starts_with(prefix) && needles.iter().all(|n| l.contains(n)))
        .and_then(|l| l.rsplit_once(' '))
        .map(|(_, v)| v.parse().unwrap())
}

#[tokio::test]
async fn scrape_round_trips_recorded_values() {
    let state = AppState::new(ServiceConfig::default()).unwrap();
    let app = app(&state);
    let m = state.loan_metrics();

    for _ in 0..3 {
        get_text(&app, "/loans").await;
    }
    get_text(&app, "/missing").await;
    track_loan_creation(&m, "USD", None);
    track_loan_creation(&m, "EUR", Some("approved"));
    track_loan_amount(&m, 100.0, "USD");
    track_loan_amount(&m, 50.5, "USD");
    update_active_loans_gauge(&m, [("active", 5), ("closed", 3)]);
    update_database_connections(&m, 4);

    let (status, content_type, body) = get_text(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/plain; version=0.0.4"));

    let scrape = parse(&body);
    assert_eq!(
        value(&scrape, "http_requests_total", &[("method", "GET"), ("endpoint", "/loans"), ("status", "200")]),
        Some(3.0)
    );
    assert_eq!(
        value(&scrape, "http_errors_total", &[("method", "GET"), ("endpoint", "unknown"), ("status", "404")]),
        Some(1.0)
    );
    assert_eq!(
        value(&scrape, "http_requests_in_progress", &[("method", "GET"), ("endpoint", "/loans")]),
        Some(0.0)
    );
    assert_eq!(
        value(&scrape, "loans_created_total", &[("currency", "USD"), ("status", "pending")]),
        Some(1.0)
    );
    assert_eq!(
        value(&scrape, "loans_created_total", &[("currency", "EUR"), ("status", "approved")]),
        Some(1.0)
    );
    assert_eq!(value(&scrape, "loan_amount_total", &[("currency", "USD")]), Some(150.5));
    assert_eq!(value(&scrape, "active_loans", &[("status", "active")]), Some(5.0));
    assert_eq!(value(&scrape, "active_loans", &[("status", "closed")]), Some(3.0));
    assert_eq!(value(&scrape, "database_connections", &[]), Some(4.0));
    assert_eq!(
        scrape.docs.get("loan_amount_total").map(String::as_str),
        Some("Total loan amount disbursed")
    );

    let latency = m.http_request_duration_seconds.with_label_values(&["GET", "/loans"]);
    assert_eq!(latency.get_sample_count(), 3);
    assert_eq!(
        line_value(&body, "http_request_duration_seconds_count{", &["endpoint=\"/loans\""]),
        Some(3)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scrapes_during_traffic_stay_consistent() {
    const TASKS: usize = 8;
    const REQUESTS: usize = 50;

    let state = AppState::new(ServiceConfig::default()).unwrap();
    let app = app(&state);

    let mut traffic = Vec::new();
    for _ in 0..TASKS {
        let app = app.clone();
        traffic.push(tokio::spawn(async move {
            for _ in 0..REQUESTS {
                get_text(&app, "/loans").await;
            }
        }));
    }

    let series = [("method", "GET"), ("endpoint", "/loans"), ("status", "200")];
    let mut last_total = 0.0;
    for _ in 0..40 {
        let (status, _, body) = get_text(&app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        let scrape = parse(&body);

        let total = value(&scrape, "http_requests_total", &series).unwrap_or(0.0);
        assert!(total >= last_total, "counter went backwards: {last_total} -> {total}");
        assert!(total <= (TASKS * REQUESTS) as f64);
        last_total = total;

        let in_progress = value(&scrape, "http_requests_in_progress", &[("method", "GET"), ("endpoint", "/loans")]);
        assert!(in_progress.unwrap_or(0.0) >= 0.0);

        let inf = line_value(&body, "http_request_duration_seconds_bucket{", &["le=\"+Inf\""]);
        let count = line_value(&body, "http_request_duration_seconds_count{", &[]);
        assert_eq!(inf, count, "+Inf bucket and _count disagree in one scrape");
        tokio::task::yield_now().await;
    }

    for t in traffic {
        t.await.unwrap();
    }
    let (_, _, body) = get_text(&app, "/metrics").await;
    let scrape = parse(&body);
    assert_eq!(value(&scrape, "http_requests_total", &series), Some((TASKS * REQUESTS) as f64));
    assert_eq!(
        value(&scrape, "http_requests_in_progress", &[("method", "GET"), ("endpoint", "/loans")]),
        Some(0.0)
    );
}

#[tokio::test]
async fn repeated_scrapes_are_identical() {
    let state = AppState::new(ServiceConfig::default()).unwrap();
    let app = app(&state);
    get_text(&app, "/loans").await;
    track_loan_amount(&state.loan_metrics(), 12.25, "GBP");

    let (_, _, first) = get_text(&app, "/metrics").await;
    let (_, _, second) = get_text(&app, "/metrics").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn scrape_lists_every_family() {
    let state = AppState::new(ServiceConfig::default()).unwrap();
    let app = app(&state);
    let m = state.loan_metrics();
    get_text(&app, "/loans").await;
    get_text(&app, "/missing").await;
    track_loan_creation(&m, "USD", None);
    track_loan_amount(&m, 1.0, "USD");
    update_active_loans_gauge(&m, [("active", 1)]);

    let (_, _, body) = get_text(&app, "/metrics").await;
    for (name, kind) in [
        ("http_requests_total", "counter"),
        ("http_request_duration_seconds", "histogram"),
        ("http_requests_in_progress", "gauge"),
        ("http_errors_total", "counter"),
        ("loans_created_total", "counter"),
        ("loan_amount_total", "counter"),
        ("active_loans", "gauge"),
        ("database_connections", "gauge"),
    ] {
        assert!(body.contains(&format!("# TYPE {name} {kind}\n")), "missing {name}");
    }
}

#[tokio::test]
async fn metrics_path_is_configurable() {
    let cfg = config::load_from_str("version: 1\nmetrics:\n  path: \"/internal/metrics\"\n").unwrap();
    let state = AppState::new(cfg).unwrap();
    let app = app(&state);

    let (status, _, body) = get_text(&app, "/internal/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("# TYPE database_connections gauge"));

    let (status, _, _) = get_text(&app, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// A family without a name; the text encoder refuses it.
struct NamelessFamily {
    desc: Desc,
}

impl NamelessFamily {
    fn new() -> Self {
        let desc = Desc::new("broken_family".into(), "never encodable".into(), vec![], HashMap::new())
            .unwrap();
        Self { desc }
    }
}

impl Collector for NamelessFamily {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut gauge = proto::Gauge::default();
        gauge.set_value(1.0);
        let mut metric = proto::Metric::default();
        metric.set_gauge(gauge);
        let mut family = MetricFamily::default();
        family.set_field_type(proto::MetricType::GAUGE);
        family.mut_metric().push(metric);
        vec![family]
    }
}

#[tokio::test]
async fn render_failure_is_a_500_with_empty_body() {
    let state = AppState::new(ServiceConfig::default()).unwrap();
    let app = app(&state);
    track_loan_amount(&state.loan_metrics(), 10.0, "USD");
    state
        .registry()
        .register_collector("broken_family", Box::new(NamelessFamily::new()))
        .unwrap();

    let err = state.registry().render().expect_err("must fail");
    assert_eq!(err.code().as_str(), "INTERNAL");

    let (status, _, body) = get_text(&app, "/metrics").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.is_empty(), "partial body leaked: {body:?}");
}

#[tokio::test]
async fn health_and_readiness_follow_draining() {
    let state = AppState::new(ServiceConfig::default()).unwrap();
    let app = app(&state);

    assert_eq!(get_text(&app, "/healthz").await.0, StatusCode::OK);
    let (status, _, body) = get_text(&app, "/readyz").await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "ready"));

    state.set_draining();
    let (status, _, body) = get_text(&app, "/readyz").await;
    assert_eq!((status, body.as_str()), (StatusCode::SERVICE_UNAVAILABLE, "draining"));
    assert_eq!(get_text(&app, "/healthz").await.0, StatusCode::OK);
}

#[test]
fn registries_are_isolated() {
    let a = AppState::new(ServiceConfig::default()).unwrap();
    let b = AppState::new(ServiceConfig::default()).unwrap();

    track_loan_amount(&a.loan_metrics(), 10.0, "USD");

    let scrape = parse(&b.registry().render().unwrap());
    assert_eq!(value(&scrape, "loan_amount_total", &[("currency", "USD")]), None);
    assert_eq!(value(&scrape, "database_connections", &[]), Some(0.0));
}
