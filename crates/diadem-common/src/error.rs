//! Error types for diadem solvers.
//!
//! Structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//!
//! Every error here is fatal for the run that raised it: a solve either
//! completes with a full result (MEU plus policy) or aborts, leaving no
//! partial output to be trusted. Callers distinguish "this model shape is
//! unsupported" from "this query kind is unsupported" via the category and
//! pick a different algorithm upstream.

use crate::capabilities::QueryKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for diadem operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Model shape and validation errors.
    Model,
    /// Elimination-ordering errors.
    Ordering,
    /// Internal solver contract violations.
    Solver,
    /// Unsupported query families.
    Query,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Ordering => write!(f, "ordering"),
            ErrorCategory::Solver => write!(f, "solver"),
            ErrorCategory::Query => write!(f, "query"),
        }
    }
}

/// Unified error type for diadem.
#[derive(Error, Debug)]
pub enum Error {
    // Model errors (10-19)
    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    // Ordering errors (20-29)
    #[error("invalid elimination order: {0}")]
    InvalidOrder(String),

    // Solver errors (30-39)
    #[error("unknown elimination operator: {name}")]
    UnknownOperator { name: String },

    #[error("precondition violated: {0}")]
    Precondition(String),

    // Query errors (40-49)
    #[error("unsupported query: {query}")]
    UnsupportedQuery { query: QueryKind },
}

impl Error {
    /// Returns the stable error code for this error type.
    ///
    /// Codes are grouped by category:
    /// - 10-19: Model errors
    /// - 20-29: Ordering errors
    /// - 30-39: Solver errors
    /// - 40-49: Query errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidModel(_) => 10,
            Error::UnsupportedModel(_) => 11,
            Error::InvalidOrder(_) => 20,
            Error::UnknownOperator { .. } => 30,
            Error::Precondition(_) => 31,
            Error::UnsupportedQuery { .. } => 40,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidModel(_) | Error::UnsupportedModel(_) => ErrorCategory::Model,
            Error::InvalidOrder(_) => ErrorCategory::Ordering,
            Error::UnknownOperator { .. } | Error::Precondition(_) => ErrorCategory::Solver,
            Error::UnsupportedQuery { .. } => ErrorCategory::Query,
        }
    }
}
