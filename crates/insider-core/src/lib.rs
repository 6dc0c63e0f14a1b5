#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/insiderdata/insider/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the insider filing ingestion pipeline.
//!
//! This crate provides the foundational abstractions for ingesting Form 4
//! insider-trading disclosures:
//!
//! - [`FilingSource`](provider::FilingSource) - Feed listing and filing retrieval
//! - [`SharesProvider`](provider::SharesProvider) - Outstanding share counts
//! - [`FilingStore`](store::FilingStore) - Idempotent filing persistence
//! - [`ShareCountStore`](store::ShareCountStore) - Share-count cache storage
//! - [`RateGate`](gate::RateGate) - Shared outbound rate limiting
//! - [`metrics`] - Pure derivation of trade values, ownership percentages and
//!   per-filing aggregates

/// Error types for ingestion operations.
pub mod error;
/// Shared rate gate for outbound requests.
pub mod gate;
/// Pure metric computation over parsed transactions.
pub mod metrics;
/// Source and provider traits for fetching filings and share data.
pub mod provider;
/// Store traits for filings and the share-count cache.
pub mod store;
/// Core data types (Symbol, FilingReference, RawTransaction, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{IngestError, Result};
pub use gate::RateGate;
pub use metrics::{aggregate, compute};
pub use provider::{FilingSource, SharesProvider};
pub use store::{FilingStore, ShareCountStore};
pub use types::{
    AccessionId, EnrichedTransaction, FilingAggregate, FilingCandidate, FilingReference,
    Form4Document, IssuerInfo, OwnerInfo, RawTransaction, ShareCountEntry, ShareSource, Symbol,
    TradeSide, TransactionCode,
};
