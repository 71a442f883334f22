//! Error types for valuation operations.
//!
//! This module defines [`ValuationError`] which covers the ticker-level and
//! configuration failures of the pipeline. Field-level misses are not errors;
//! they are carried as [`FieldValue::Missing`](crate::types::FieldValue).

use thiserror::Error;

/// Errors that can occur while fetching data for, or configuring, a valuation run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    /// Network-related errors (connection failures, HTTP errors, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a source.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The source that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The requested symbol was not found.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Every request made for a symbol failed.
    #[error("Data source unreachable for {symbol}: {reason}")]
    SourceUnreachable {
        /// The symbol that could not be served.
        symbol: String,
        /// The last error seen.
        reason: String,
    },

    /// A ticker's evaluation exceeded the configured timeout.
    #[error("Evaluation of {symbol} timed out after {elapsed:?}")]
    Timeout {
        /// The symbol being evaluated.
        symbol: String,
        /// The timeout that elapsed.
        elapsed: std::time::Duration,
    },

    /// Error parsing data from a source.
    #[error("Parse error: {0}")]
    Parse(String),

    /// No source is configured.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The source does not serve the requested field or series.
    ///
    /// Such requests are never made, so they do not count as failures.
    #[error("Feature not supported: {0}")]
    NotSupported(String),

    /// Error writing or reading tabular output.
    #[error("I/O error: {0}")]
    Io(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for ValuationError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Result type alias using [`ValuationError`].
pub type Result<T> = std::result::Result<T, ValuationError>;
