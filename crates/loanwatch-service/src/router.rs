//! Axum router wiring.
//!
//! The application router is wrapped by the request hook; the operational
//! routes are merged afterwards so scrapes and health checks are not counted.

use axum::{http::StatusCode, middleware, routing::get, Router};

use crate::{app_state::AppState, obs::hook, ops};

pub fn build_router(state: AppState, app: Router<AppState>) -> Router {
    let instrumented = app
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.hook(), hook::track_requests));

    let operational = Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route(&state.cfg().metrics.path, get(ops::metrics));

    instrumented.merge(operational).with_state(state)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
