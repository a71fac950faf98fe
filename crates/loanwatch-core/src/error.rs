//! Shared error type across loanwatch crates.

use thiserror::Error;

/// Stable error codes, safe to surface in logs and operator tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Instrument name registered twice.
    AlreadyRegistered,
    /// Wrong number of label values.
    LabelArity,
    /// Label set does not match the declared label names.
    LabelMismatch,
    /// Illegal metric name, label name or bucket layout.
    InvalidMetric,
    /// Bad configuration.
    Config,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::AlreadyRegistered => "ALREADY_REGISTERED",
            ErrorCode::LabelArity => "LABEL_ARITY",
            ErrorCode::LabelMismatch => "LABEL_MISMATCH",
            ErrorCode::InvalidMetric => "INVALID_METRIC",
            ErrorCode::Config => "CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, LoanWatchError>;

/// Unified error type used by core and service.
#[derive(Debug, Error)]
pub enum LoanWatchError {
    #[error("metric already registered: {0}")]
    AlreadyRegistered(String),
    #[error("metric {metric}: expected {expected} label values, got {got}")]
    LabelArity {
        metric: String,
        expected: usize,
        got: usize,
    },
    #[error("metric {metric}: label set mismatch: {reason}")]
    LabelMismatch { metric: String, reason: String },
    #[error("invalid metric: {0}")]
    InvalidMetric(String),
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl LoanWatchError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            LoanWatchError::AlreadyRegistered(_) => ErrorCode::AlreadyRegistered,
            LoanWatchError::LabelArity { .. } => ErrorCode::LabelArity,
            LoanWatchError::LabelMismatch { .. } => ErrorCode::LabelMismatch,
            LoanWatchError::InvalidMetric(_) => ErrorCode::InvalidMetric,
            LoanWatchError::Config(_) => ErrorCode::Config,
            LoanWatchError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            LoanWatchError::Internal(_) => ErrorCode::Internal,
        }
    }
}
