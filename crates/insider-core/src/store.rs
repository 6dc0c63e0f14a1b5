//! Store traits for filings and the share-count cache.
//!
//! Implementations persist to a relational backend. All filing writes are
//! idempotent upserts: re-ingesting the same accession id must leave the
//! tables exactly as a single ingestion would.

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{
        AccessionId, EnrichedTransaction, FilingAggregate, FilingReference, ShareCountEntry,
        Symbol,
    },
};

/// Idempotent persistence for filings, their transaction details and their
/// aggregates.
#[async_trait]
pub trait FilingStore: Send + Sync {
    /// Inserts or updates filing metadata, keyed on accession id.
    async fn upsert_filing(&self, filing: &FilingReference) -> Result<()>;

    /// Replaces the full detail set for a filing.
    ///
    /// The end state equals exactly the given set; stale rows from a prior
    /// ingestion do not survive.
    async fn replace_transactions(
        &self,
        accession_id: &AccessionId,
        transactions: &[EnrichedTransaction],
    ) -> Result<()>;

    /// Overwrites the filing's aggregate row. Aggregates are recomputed
    /// fresh per ingestion, never incremented.
    async fn upsert_aggregate(
        &self,
        accession_id: &AccessionId,
        aggregate: &FilingAggregate,
    ) -> Result<()>;

    /// Persists metadata, details and aggregate as one unit.
    ///
    /// Either all three writes commit or none do, so a failure mid-write
    /// leaves the previous complete state intact.
    async fn persist_filing(
        &self,
        filing: &FilingReference,
        transactions: &[EnrichedTransaction],
        aggregate: &FilingAggregate,
    ) -> Result<()>;
}

/// Storage backing the share-count cache.
#[async_trait]
pub trait ShareCountStore: Send + Sync {
    /// Reads the cached entry for a symbol, fresh or stale.
    async fn get_share_count(&self, symbol: &Symbol) -> Result<Option<ShareCountEntry>>;

    /// Writes through a freshly fetched entry, replacing any prior one.
    async fn put_share_count(&self, entry: &ShareCountEntry) -> Result<()>;
}
