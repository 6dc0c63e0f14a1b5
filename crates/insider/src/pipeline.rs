//! Pipeline orchestrator: feed listing → fetch → parse → enrich → persist.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use insider_core::{
    AccessionId, FilingCandidate, FilingReference, FilingSource, FilingStore, IngestError, Result,
    aggregate, compute,
};
use insider_edgar::parse_form4;

use crate::config::IngestConfig;
use crate::shares::ShareCounter;

/// Ingestion stage at which a filing failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Resolving or retrieving the filing document.
    Fetch,
    /// Decoding the filing document.
    Parse,
    /// Enriching transactions with share data and metrics.
    Enrich,
    /// Writing the filing unit to the store.
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::Enrich => "enrich",
            Self::Persist => "persist",
        };
        write!(f, "{name}")
    }
}

/// One filing's failure record.
#[derive(Debug)]
pub struct FilingFailure {
    /// The filing that failed.
    pub accession_id: AccessionId,
    /// Stage the failure occurred in.
    pub stage: Stage,
    /// Rendered error message.
    pub message: String,
}

/// Summary of one ingestion run.
///
/// Individual filing failures are warnings, not run failures; only an
/// unreachable feed aborts a run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Candidates listed by the feed.
    pub listed: usize,
    /// Filings whose document was retrieved.
    pub fetched: usize,
    /// Filings whose document parsed.
    pub parsed: usize,
    /// Filings persisted in full.
    pub persisted: usize,
    /// Filings skipped (no resolvable ticker or no common-stock
    /// transactions).
    pub skipped: usize,
    /// Per-filing failures, in completion order.
    pub failures: Vec<FilingFailure>,
}

impl IngestReport {
    /// Number of filings that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Per-filing progress, folded into the run report.
#[derive(Debug)]
struct Outcome {
    fetched: bool,
    parsed: bool,
    persisted: bool,
    skipped: bool,
    failure: Option<FilingFailure>,
}

impl Outcome {
    const fn start() -> Self {
        Self {
            fetched: false,
            parsed: false,
            persisted: false,
            skipped: false,
            failure: None,
        }
    }

    fn fail(mut self, accession_id: AccessionId, stage: Stage, error: &IngestError) -> Self {
        self.failure = Some(FilingFailure {
            accession_id,
            stage,
            message: error.to_string(),
        });
        self
    }
}

/// Orchestrates one ingestion run over a filing source, the share lookup
/// and a filing store.
///
/// Filings are processed with bounded concurrency; every worker shares the
/// source's single rate gate, so parallelism never multiplies the outbound
/// request budget. Candidates are deduplicated by accession id at listing
/// time, which keeps writes for one filing from racing each other. A
/// failure in any stage marks that filing failed and the run moves on.
pub struct Pipeline {
    source: Arc<dyn FilingSource>,
    shares: Arc<ShareCounter>,
    store: Arc<dyn FilingStore>,
    config: IngestConfig,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("source", &self.source.name())
            .field("shares", &self.shares)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline after validating the configuration.
    ///
    /// # Errors
    /// Returns [`IngestError::InvalidConfig`] when the configuration is
    /// rejected.
    pub fn new(
        source: Arc<dyn FilingSource>,
        shares: Arc<ShareCounter>,
        store: Arc<dyn FilingStore>,
        config: IngestConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            shares,
            store,
            config,
        })
    }

    /// Runs one ingestion pass over the feed.
    ///
    /// # Errors
    /// Fails only when the feed itself cannot be listed; per-filing failures
    /// are recorded in the report and do not abort the run.
    pub async fn run(&self) -> Result<IngestReport> {
        let candidates = self.source.recent_filings(self.config.feed_limit).await?;
        let listed = candidates.len();
        info!(listed, source = self.source.name(), "listed filing candidates");

        let outcomes: Vec<Outcome> = stream::iter(candidates)
            .map(|candidate| self.ingest_one(candidate))
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;

        let mut report = IngestReport {
            listed,
            ..Default::default()
        };
        for outcome in outcomes {
            if outcome.fetched {
                report.fetched += 1;
            }
            if outcome.parsed {
                report.parsed += 1;
            }
            if outcome.persisted {
                report.persisted += 1;
            }
            if outcome.skipped {
                report.skipped += 1;
            }
            if let Some(failure) = outcome.failure {
                report.failures.push(failure);
            }
        }

        info!(
            fetched = report.fetched,
            parsed = report.parsed,
            persisted = report.persisted,
            skipped = report.skipped,
            failed = report.failed(),
            "ingestion run complete"
        );
        Ok(report)
    }

    /// Walks one filing through fetch → parse → enrich → persist.
    async fn ingest_one(&self, candidate: FilingCandidate) -> Outcome {
        let accession_id = candidate.accession_id.clone();
        let mut outcome = Outcome::start();

        let document_bytes = match self.source.filing_document(&candidate).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(accession = %accession_id, error = %e, "failed to fetch filing");
                return outcome.fail(accession_id, Stage::Fetch, &e);
            }
        };
        outcome.fetched = true;

        let document = match parse_form4(&document_bytes) {
            Ok(document) => document,
            Err(e) => {
                warn!(accession = %accession_id, error = %e, "failed to parse filing");
                return outcome.fail(accession_id, Stage::Parse, &e);
            }
        };
        outcome.parsed = true;

        let Some(symbol) = document.issuer.symbol() else {
            debug!(accession = %accession_id, "no resolvable ticker, skipping");
            outcome.skipped = true;
            return outcome;
        };

        if document.transactions.is_empty() {
            debug!(accession = %accession_id, %symbol, "no common-stock transactions, skipping");
            outcome.skipped = true;
            return outcome;
        }

        let shares_outstanding = self.shares.lookup(&symbol).await;
        let enriched: Vec<_> = document
            .transactions
            .iter()
            .map(|transaction| compute(transaction, shares_outstanding))
            .collect();
        let rollup = aggregate(&enriched);
        let filing = FilingReference::from_document(&candidate, &document);

        match self.store.persist_filing(&filing, &enriched, &rollup).await {
            Ok(()) => {
                debug!(accession = %accession_id, %symbol, count = enriched.len(), "persisted filing");
                outcome.persisted = true;
                outcome
            }
            Err(e) => {
                warn!(accession = %accession_id, error = %e, "failed to persist filing");
                outcome.fail(accession_id, Stage::Persist, &e)
            }
        }
    }
}

#[cfg(feature = "yahoo")]
impl Pipeline {
    /// Wires the standard stack: EDGAR as filing source and primary share
    /// provider, Yahoo Finance as fallback, one shared rate gate.
    ///
    /// # Errors
    /// Returns [`IngestError::InvalidConfig`] when the configuration is
    /// rejected.
    pub fn from_config(
        config: IngestConfig,
        filing_store: Arc<dyn FilingStore>,
        share_store: Arc<dyn insider_core::ShareCountStore>,
    ) -> Result<Self> {
        use insider_core::RateGate;

        config.validate()?;

        let gate = Arc::new(RateGate::new(config.rate_interval));
        let edgar = Arc::new(
            insider_edgar::EdgarClient::with_timeout(
                &config.user_agent,
                Arc::clone(&gate),
                config.request_timeout,
            )
            .with_retry_policy(config.max_attempts, config.backoff_base),
        );
        let yahoo = Arc::new(insider_yahoo::YahooSharesProvider::with_timeout(
            Arc::clone(&gate),
            config.request_timeout,
        ));
        let shares = Arc::new(ShareCounter::new(
            share_store,
            edgar.clone(),
            yahoo,
            config.cache_ttl,
        ));

        Self::new(edgar, shares, filing_store, config)
    }
}
