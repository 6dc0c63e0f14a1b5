#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/insiderdata/insider/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR filing source.
//!
//! This crate provides access to the EDGAR side of the pipeline:
//!
//! - [`EdgarClient`] - rate-limited, retrying fetcher with the identifying
//!   header the SEC requires
//! - [`feed`] - atom index feed walker producing filing candidates
//! - [`form4`] - Form 4 XML parser
//! - Primary share-count lookups (ticker → CIK → submissions metadata)
//!
//! # Example
//!
//! ```no_run
//! use insider_core::{FilingSource, RateGate};
//! use insider_edgar::EdgarClient;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gate = Arc::new(RateGate::new(Duration::from_millis(100)));
//!     let client = EdgarClient::new("MyApp/1.0 (contact@example.com)", gate);
//!
//!     let candidates = client.recent_filings(25).await?;
//!     for candidate in &candidates {
//!         println!("{} filed by {}", candidate.accession_id, candidate.filer_name);
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use insider_core::{
    FilingCandidate, FilingSource, IngestError, RateGate, Result, SharesProvider, Symbol,
};

/// Atom feed walker for recent Form 4 filings.
pub mod feed;
/// Form 4 XML parser.
pub mod form4;

pub use form4::parse_form4;

/// SEC EDGAR data API base URL.
const EDGAR_DATA_URL: &str = "https://data.sec.gov";

/// SEC EDGAR archives base URL (filing documents).
const ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data";

/// SEC company tickers URL.
const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default attempt cap for transient failures.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff.
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// SEC EDGAR client.
///
/// All outbound requests pass through the shared [`RateGate`] and carry the
/// identifying user agent the SEC's fair access policy requires. Transient
/// failures (429, server errors, timeouts) retry with exponential backoff up
/// to a small attempt cap; other client errors fail immediately.
#[derive(Debug)]
pub struct EdgarClient {
    client: reqwest::Client,
    gate: Arc<RateGate>,
    max_attempts: u32,
    backoff_base: Duration,
    feed_url: String,
    archives_base: String,
    data_base: String,
    tickers_url: String,
}

impl EdgarClient {
    /// Create a new EDGAR client with the specified user agent and shared
    /// rate gate.
    ///
    /// The SEC requires identifying user agent headers. Format should be:
    /// "AppName/Version (contact@email.com)"
    pub fn new(user_agent: &str, gate: Arc<RateGate>) -> Self {
        Self::with_timeout(user_agent, gate, DEFAULT_TIMEOUT)
    }

    /// Create a new EDGAR client with an explicit per-request timeout.
    pub fn with_timeout(user_agent: &str, gate: Arc<RateGate>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self::with_client(client, gate)
    }

    /// Create a new EDGAR client from a pre-configured HTTP client.
    ///
    /// The client must already carry the identifying user agent and the
    /// desired request timeout.
    pub fn with_client(client: reqwest::Client, gate: Arc<RateGate>) -> Self {
        Self {
            client,
            gate,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            feed_url: feed::FEED_URL.to_string(),
            archives_base: ARCHIVES_URL.to_string(),
            data_base: EDGAR_DATA_URL.to_string(),
            tickers_url: COMPANY_TICKERS_URL.to_string(),
        }
    }

    /// Override the retry policy for transient failures.
    #[must_use]
    pub fn with_retry_policy(mut self, max_attempts: u32, backoff_base: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff_base = backoff_base;
        self
    }

    /// Fetch a URL, waiting on the rate gate before every attempt.
    ///
    /// Retries 429 and server errors with exponential backoff up to the
    /// attempt cap; other non-success statuses fail immediately.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut delay = self.backoff_base;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.gate.acquire().await;

            let error = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .bytes()
                            .await
                            .map(|body| body.to_vec())
                            .map_err(|e| IngestError::Network(e.to_string()));
                    }
                    IngestError::Http {
                        url: url.to_string(),
                        status: status.as_u16(),
                    }
                }
                Err(e) if e.is_timeout() => IngestError::Timeout(url.to_string()),
                Err(e) => IngestError::Network(e.to_string()),
            };

            if !error.is_transient() || attempt >= self.max_attempts {
                return Err(error);
            }

            warn!(url, attempt, error = %error, "transient fetch failure, backing off");
            sleep(delay).await;
            delay *= 2;
        }
    }

    /// Fetch a URL and decode its JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.fetch(url).await?;
        serde_json::from_slice(&body).map_err(|e| IngestError::Parse(format!("{url}: {e}")))
    }

    /// Look up a company's CIK number from its ticker symbol.
    ///
    /// Returns the CIK as a zero-padded 10-digit string.
    pub async fn get_cik(&self, ticker: &str) -> Result<String> {
        if ticker.is_empty() {
            return Err(IngestError::SymbolNotFound(String::new()));
        }
        let ticker_upper = ticker.to_uppercase();

        debug!("fetching company tickers from SEC");
        let data: HashMap<String, CompanyTickerInfo> = self.get_json(&self.tickers_url).await?;

        for company in data.values() {
            if company.ticker.to_uppercase() == ticker_upper {
                let cik = format!("{:0>10}", company.cik_str);
                debug!(ticker, cik, "resolved CIK");
                return Ok(cik);
            }
        }

        Err(IngestError::SymbolNotFound(ticker.to_string()))
    }

    /// Resolve the Form 4 XML document URL for a candidate.
    ///
    /// The index page link in the feed points at an HTML landing page; the
    /// accession directory's `index.json` lists the actual members.
    pub async fn resolve_document_url(&self, candidate: &FilingCandidate) -> Result<String> {
        let directory_url = format!(
            "{}/{}/{}/index.json",
            self.archives_base, candidate.cik, candidate.accession_id
        );
        let listing: DirectoryListing = self.get_json(&directory_url).await?;

        listing
            .directory
            .item
            .iter()
            .find(|member| member.name.ends_with(".xml"))
            .map(|member| {
                format!(
                    "{}/{}/{}/{}",
                    self.archives_base, candidate.cik, candidate.accession_id, member.name
                )
            })
            .ok_or_else(|| {
                IngestError::Parse(format!(
                    "no XML document listed for {}",
                    candidate.accession_id
                ))
            })
    }

    fn feed_request_url(&self, limit: usize) -> String {
        let separator = if self.feed_url.contains('?') { '&' } else { '?' };
        format!("{}{}count={}", self.feed_url, separator, limit)
    }
}

#[async_trait]
impl FilingSource for EdgarClient {
    fn name(&self) -> &str {
        "SEC EDGAR"
    }

    async fn recent_filings(&self, limit: usize) -> Result<Vec<FilingCandidate>> {
        let url = self.feed_request_url(limit);
        debug!(url, "polling filing feed");
        let body = self.fetch(&url).await?;
        let candidates = feed::parse_feed(&body, limit)?;
        debug!(count = candidates.len(), "listed filing candidates");
        Ok(candidates)
    }

    async fn filing_document(&self, candidate: &FilingCandidate) -> Result<Vec<u8>> {
        let url = self.resolve_document_url(candidate).await?;
        debug!(accession = %candidate.accession_id, url, "fetching filing document");
        self.fetch(&url).await
    }
}

#[async_trait]
impl SharesProvider for EdgarClient {
    fn name(&self) -> &str {
        "SEC EDGAR"
    }

    async fn shares_outstanding(&self, symbol: &Symbol) -> Result<u64> {
        let cik = self.get_cik(symbol.as_str()).await?;
        let url = format!("{}/submissions/CIK{}.json", self.data_base, cik);

        debug!(%symbol, url, "fetching entity share count");
        let submissions: CompanySubmissions = self.get_json(&url).await?;

        let shares = submissions
            .entity_info
            .and_then(|info| info.shares_outstanding)
            .unwrap_or(0.0);
        if shares > 0.0 {
            Ok(shares as u64)
        } else {
            Err(IngestError::Parse(format!(
                "no outstanding share count reported for {symbol}"
            )))
        }
    }
}

// =============================================================================
// SEC API Response Types
// =============================================================================

/// Company ticker information from SEC JSON.
#[derive(Debug, Deserialize)]
struct CompanyTickerInfo {
    /// CIK as a number (SEC returns this as an integer)
    cik_str: u64,
    /// Ticker symbol
    ticker: String,
    /// Company name
    #[allow(dead_code)]
    title: String,
}

/// Accession directory listing from `index.json`.
#[derive(Debug, Deserialize)]
struct DirectoryListing {
    #[serde(default)]
    directory: Directory,
}

#[derive(Debug, Default, Deserialize)]
struct Directory {
    #[serde(default)]
    item: Vec<DirectoryItem>,
}

#[derive(Debug, Deserialize)]
struct DirectoryItem {
    name: String,
}

/// Company submissions/entity metadata.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompanySubmissions {
    #[serde(default)]
    entity_info: Option<EntityInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityInfo {
    #[serde(default)]
    shares_outstanding: Option<f64>,
}

// =============================================================================
// Tests
// =============================================================================
