//! loanwatch service library entry.
//!
//! Wires the metrics registry, the request hook, the business trackers and
//! the operational endpoints into an axum stack. It is intended to be
//! consumed by the binary (`main.rs`), by services embedding their own
//! routes, and by integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
