//! loanwatch core: the error surface shared by the loanwatch crates.
//!
//! It carries no runtime dependencies beyond `thiserror`, so tooling can
//! match on [`ErrorCode`] without pulling in the HTTP or metrics stack.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `LoanWatchError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;

/// Shared result type.
pub use error::{ErrorCode, LoanWatchError, Result};
