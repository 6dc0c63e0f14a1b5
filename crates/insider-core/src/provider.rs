//! Source and provider traits for fetching filings and share data.
//!
//! This module defines the seams the pipeline is wired through:
//!
//! - [`FilingSource`] - Feed listing and filing document retrieval
//! - [`SharesProvider`] - Outstanding-share lookups

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{FilingCandidate, Symbol},
};

/// Source of filing candidates and their documents.
///
/// Implementations own their transport (and its rate limiting); the pipeline
/// only sees candidates and document bytes.
#[async_trait]
pub trait FilingSource: Send + Sync + Debug {
    /// Returns the name of this source (e.g. "SEC EDGAR").
    fn name(&self) -> &str;

    /// Lists the most recent filing candidates, capped at `limit`.
    ///
    /// Each call re-polls the feed from the top; there is no persisted
    /// cursor. Entries whose metadata cannot be resolved are skipped with a
    /// warning. A feed that cannot be fetched or parsed is an error - there
    /// is nothing to ingest without a listing.
    async fn recent_filings(&self, limit: usize) -> Result<Vec<FilingCandidate>>;

    /// Fetches the filing document for one candidate.
    async fn filing_document(&self, candidate: &FilingCandidate) -> Result<Vec<u8>>;
}

/// Provider of outstanding-share counts by ticker symbol.
#[async_trait]
pub trait SharesProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g. "Yahoo Finance").
    fn name(&self) -> &str;

    /// Looks up the issuer's outstanding share count.
    ///
    /// A zero or missing value is an error: callers fall through to the next
    /// provider in precedence order rather than caching garbage.
    async fn shares_outstanding(&self, symbol: &Symbol) -> Result<u64>;
}
