#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/insiderdata/insider/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance fallback share-count provider.
//!
//! Implements [`SharesProvider`] over the quote summary API's
//! `defaultKeyStatistics` module. Lookups are best-effort: the pipeline only
//! consults this provider after the primary source has failed, and treats a
//! miss here as degraded data rather than an error.
//!
//! # Example
//!
//! ```no_run
//! use insider_core::{RateGate, SharesProvider, Symbol};
//! use insider_yahoo::YahooSharesProvider;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> insider_core::Result<()> {
//! let gate = Arc::new(RateGate::new(Duration::from_millis(100)));
//! let provider = YahooSharesProvider::new(gate);
//! let shares = provider.shares_outstanding(&Symbol::new("AAPL")).await?;
//! println!("{shares} shares outstanding");
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use insider_core::{IngestError, RateGate, Result, SharesProvider, Symbol};

/// Yahoo Finance quote summary API base URL.
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Browser-style user agent for Yahoo endpoints.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Yahoo Finance share-count provider.
///
/// Shares the process-wide [`RateGate`] with every other outbound caller so
/// the fallback path cannot blow the global request budget.
#[derive(Debug)]
pub struct YahooSharesProvider {
    client: reqwest::Client,
    gate: Arc<RateGate>,
    base_url: String,
}

impl YahooSharesProvider {
    /// Create a new provider with default settings.
    pub fn new(gate: Arc<RateGate>) -> Self {
        Self::with_timeout(gate, DEFAULT_TIMEOUT)
    }

    /// Create a new provider with an explicit per-request timeout.
    pub fn with_timeout(gate: Arc<RateGate>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self::with_client(client, gate)
    }

    /// Create a new provider from a pre-configured HTTP client.
    pub fn with_client(client: reqwest::Client, gate: Arc<RateGate>) -> Self {
        Self {
            client,
            gate,
            base_url: QUOTE_SUMMARY_URL.to_string(),
        }
    }

    async fn fetch_key_statistics(&self, symbol: &Symbol) -> Result<QuoteSummaryResponse> {
        self.gate.acquire().await;

        let url = format!(
            "{}/{}?modules=defaultKeyStatistics",
            self.base_url,
            symbol.as_str()
        );
        debug!(%symbol, url, "fetching key statistics");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IngestError::Timeout(url.clone())
                } else {
                    IngestError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(IngestError::SymbolNotFound(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(IngestError::Http {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<QuoteSummaryResponse>()
            .await
            .map_err(|e| IngestError::Parse(e.to_string()))
    }
}

#[async_trait]
impl SharesProvider for YahooSharesProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn shares_outstanding(&self, symbol: &Symbol) -> Result<u64> {
        let summary = self.fetch_key_statistics(symbol).await?;

        let shares = summary
            .quote_summary
            .result
            .into_iter()
            .next()
            .and_then(|data| data.default_key_statistics)
            .and_then(|stats| stats.shares_outstanding)
            .and_then(|value| value.raw)
            .unwrap_or(0.0);

        if shares > 0.0 {
            Ok(shares as u64)
        } else {
            Err(IngestError::SymbolNotFound(symbol.to_string()))
        }
    }
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(default)]
    result: Vec<QuoteSummaryData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryData {
    default_key_statistics: Option<KeyStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    shares_outstanding: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_provider(server: &MockServer) -> YahooSharesProvider {
        let gate = Arc::new(RateGate::new(Duration::from_millis(1)));
        let mut provider = YahooSharesProvider::new(gate);
        provider.base_url = server.url("/v10/finance/quoteSummary");
        provider
    }

    #[tokio::test]
    async fn reads_shares_from_key_statistics() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v10/finance/quoteSummary/ACME")
                    .query_param("modules", "defaultKeyStatistics");
                then.status(200).body(
                    r#"{"quoteSummary":{"result":[{"defaultKeyStatistics":{
                        "sharesOutstanding":{"raw":2500000,"fmt":"2.5M"}}}],"error":null}}"#,
                );
            })
            .await;

        let provider = test_provider(&server);
        let shares = provider
            .shares_outstanding(&Symbol::new("ACME"))
            .await
            .unwrap();

        assert_eq!(shares, 2_500_000);
    }

    #[tokio::test]
    async fn unknown_symbol_maps_to_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v10/finance/quoteSummary/ZZZZ");
                then.status(404);
            })
            .await;

        let provider = test_provider(&server);
        let err = provider
            .shares_outstanding(&Symbol::new("ZZZZ"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::SymbolNotFound(_)));
    }

    #[tokio::test]
    async fn missing_statistics_are_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v10/finance/quoteSummary/ACME");
                then.status(200)
                    .body(r#"{"quoteSummary":{"result":[{}],"error":null}}"#);
            })
            .await;

        let provider = test_provider(&server);
        let err = provider
            .shares_outstanding(&Symbol::new("ACME"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::SymbolNotFound(_)));
    }
}
