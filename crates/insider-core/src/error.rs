//! Error types for ingestion operations.
//!
//! This module defines [`IngestError`] which covers all error cases that can
//! occur when listing, fetching, parsing, enriching or persisting filings.
//!
//! An unresolved share count is deliberately *not* an error: enrichment
//! degrades to a null ownership percentage instead, so lookups surface it as
//! `Option::None` rather than a variant here.

use thiserror::Error;

/// Errors that can occur during ingestion operations.
#[derive(Error, Debug)]
pub enum IngestError {
    /// A request completed with a non-success HTTP status.
    #[error("HTTP {status} fetching {url}")]
    Http {
        /// URL of the failed request.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// Network-level failures (connection refused, DNS, broken transfer).
    #[error("network error: {0}")]
    Network(String),

    /// A request exceeded its configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// A feed or filing document could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Error reading from or writing to the relational store.
    #[error("store error: {0}")]
    Store(String),

    /// The requested ticker symbol is unknown to a provider.
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    /// The run configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IngestError {
    /// Returns true when retrying the same request may succeed.
    ///
    /// Covers 429, server errors, timeouts and transport failures. Client
    /// errors other than 429 are permanent and fail fast.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Network(_) | Self::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Result type alias using [`IngestError`].
pub type Result<T> = std::result::Result<T, IngestError>;
