#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/insiderdata/insider/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Insider filing ingestion and aggregation pipeline.
//!
//! This crate wires the provider, parser and store crates together. For each
//! candidate the feed lists, the [`Pipeline`] fetches the filing document,
//! parses its transactions, enriches them with outstanding-share data
//! through the layered [`ShareCounter`] lookup, computes derived metrics and
//! persists the filing as one idempotent unit.
//!
//! # Features
//!
//! - `yahoo` - Yahoo Finance fallback share provider and the
//!   [`Pipeline::from_config`] wiring helper
//! - `store-sqlite` - SQLite store implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use insider::{IngestConfig, Pipeline, SqliteStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> insider::Result<()> {
//!     let config = IngestConfig::new("MyApp/1.0 (contact@example.com)");
//!     let store = Arc::new(SqliteStore::new("insider.db")?);
//!
//!     let pipeline = Pipeline::from_config(config, store.clone(), store)?;
//!     let report = pipeline.run().await?;
//!
//!     println!(
//!         "persisted {} of {} filings ({} failed)",
//!         report.persisted,
//!         report.listed,
//!         report.failed()
//!     );
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use insider_core::*;

// Filing source, parser and primary share provider
pub use insider_edgar::EdgarClient;

// Store implementation
#[cfg(feature = "store-sqlite")]
pub use insider_store::SqliteStore;

// Fallback share provider
#[cfg(feature = "yahoo")]
pub use insider_yahoo::YahooSharesProvider;

mod config;
mod pipeline;
mod shares;

pub use config::IngestConfig;
pub use pipeline::{FilingFailure, IngestReport, Pipeline, Stage};
pub use shares::ShareCounter;
