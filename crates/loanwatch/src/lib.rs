//! Top-level facade crate for loanwatch.
//!
//! Re-exports core types and the service library so users can depend on a single crate.

pub mod core {
    pub use loanwatch_core::*;
}

pub mod service {
    pub use loanwatch_service::*;
}
