#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/insiderdata/insider/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SQLite persistence for the insider ingestion pipeline.
//!
//! This crate implements the store traits from `insider-core`:
//!
//! - [`SqliteStore`] - filings, transaction details, aggregates and the
//!   share-count cache in one SQLite database

/// SQLite-backed store implementation.
pub mod sqlite;

// Re-export the traits for convenience
pub use insider_core::{FilingStore, ShareCountStore};

pub use sqlite::SqliteStore;
