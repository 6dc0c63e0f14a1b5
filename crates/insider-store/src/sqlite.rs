//! SQLite-backed store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

use insider_core::{
    AccessionId, EnrichedTransaction, FilingAggregate, FilingReference, FilingStore, IngestError,
    Result, ShareCountEntry, ShareCountStore, ShareSource, Symbol, TransactionCode,
};

/// SQLite-backed store for filings and the share-count cache.
///
/// Stores data in a SQLite database file, providing persistence across
/// application restarts. Schema creation is idempotent and runs in the
/// constructor.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation
    /// fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| IngestError::Store(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| IngestError::Store(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS filings (
                accession_id TEXT PRIMARY KEY,
                issuer_symbol TEXT NOT NULL,
                issuer_name TEXT NOT NULL,
                filer_name TEXT NOT NULL,
                owner_title TEXT,
                filing_date TEXT NOT NULL,
                filing_url TEXT NOT NULL,
                ingested_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| IngestError::Store(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS transaction_details (
                accession_id TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                transaction_code TEXT NOT NULL,
                security_title TEXT NOT NULL,
                shares REAL NOT NULL,
                price_per_share REAL NOT NULL,
                trade_value REAL NOT NULL,
                ownership_pct REAL,
                transaction_date TEXT,
                PRIMARY KEY (accession_id, ordinal)
            )",
            [],
        )
        .map_err(|e| IngestError::Store(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_details_code_date
             ON transaction_details(transaction_code, transaction_date)",
            [],
        )
        .map_err(|e| IngestError::Store(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS filing_aggregates (
                accession_id TEXT PRIMARY KEY,
                total_buy_value REAL NOT NULL,
                total_sell_value REAL NOT NULL,
                net_share_change REAL NOT NULL,
                transaction_count INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| IngestError::Store(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS share_cache (
                issuer_symbol TEXT PRIMARY KEY,
                shares_outstanding INTEGER NOT NULL,
                source TEXT NOT NULL,
                fetched_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| IngestError::Store(e.to_string()))?;

        debug!("store schema initialized");
        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| IngestError::Store(e.to_string()))
    }

    fn upsert_filing_in(conn: &Connection, filing: &FilingReference) -> Result<()> {
        conn.execute(
            "INSERT INTO filings
             (accession_id, issuer_symbol, issuer_name, filer_name, owner_title,
              filing_date, filing_url, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(accession_id) DO UPDATE SET
                issuer_symbol = excluded.issuer_symbol,
                issuer_name = excluded.issuer_name,
                filer_name = excluded.filer_name,
                owner_title = excluded.owner_title,
                filing_date = excluded.filing_date,
                filing_url = excluded.filing_url,
                ingested_at = excluded.ingested_at",
            params![
                filing.accession_id.as_str(),
                filing.issuer_symbol.as_str(),
                filing.issuer_name,
                filing.filer_name,
                filing.owner_title,
                filing.filed_at.to_rfc3339(),
                filing.filing_url,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| IngestError::Store(e.to_string()))?;
        Ok(())
    }

    fn replace_transactions_in(
        conn: &Connection,
        accession_id: &AccessionId,
        transactions: &[EnrichedTransaction],
    ) -> Result<()> {
        conn.execute(
            "DELETE FROM transaction_details WHERE accession_id = ?1",
            params![accession_id.as_str()],
        )
        .map_err(|e| IngestError::Store(e.to_string()))?;

        for (ordinal, enriched) in transactions.iter().enumerate() {
            conn.execute(
                "INSERT INTO transaction_details
                 (accession_id, ordinal, transaction_code, security_title, shares,
                  price_per_share, trade_value, ownership_pct, transaction_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    accession_id.as_str(),
                    ordinal as i64,
                    enriched.transaction.code.as_code(),
                    enriched.transaction.security_title,
                    enriched.transaction.shares,
                    enriched.transaction.price_per_share,
                    enriched.trade_value,
                    enriched.ownership_pct,
                    enriched.transaction.transaction_date.map(|d| d.to_string()),
                ],
            )
            .map_err(|e| IngestError::Store(e.to_string()))?;
        }
        Ok(())
    }

    fn upsert_aggregate_in(
        conn: &Connection,
        accession_id: &AccessionId,
        aggregate: &FilingAggregate,
    ) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO filing_aggregates
             (accession_id, total_buy_value, total_sell_value, net_share_change, transaction_count)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                accession_id.as_str(),
                aggregate.total_buy_value,
                aggregate.total_sell_value,
                aggregate.net_share_change,
                aggregate.transaction_count,
            ],
        )
        .map_err(|e| IngestError::Store(e.to_string()))?;
        Ok(())
    }

    /// Number of filings persisted.
    pub fn filing_count(&self) -> Result<u64> {
        let conn = self.lock_conn()?;
        conn.query_row("SELECT COUNT(*) FROM filings", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|count| count as u64)
        .map_err(|e| IngestError::Store(e.to_string()))
    }

    /// Number of detail rows persisted for one filing.
    pub fn transaction_count(&self, accession_id: &AccessionId) -> Result<u64> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT COUNT(*) FROM transaction_details WHERE accession_id = ?1",
            params![accession_id.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count as u64)
        .map_err(|e| IngestError::Store(e.to_string()))
    }

    /// Number of detail rows persisted across all filings.
    pub fn total_transaction_count(&self) -> Result<u64> {
        let conn = self.lock_conn()?;
        conn.query_row("SELECT COUNT(*) FROM transaction_details", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|count| count as u64)
        .map_err(|e| IngestError::Store(e.to_string()))
    }

    /// The persisted aggregate row for one filing, if any.
    pub fn get_aggregate(&self, accession_id: &AccessionId) -> Result<Option<FilingAggregate>> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT total_buy_value, total_sell_value, net_share_change, transaction_count
             FROM filing_aggregates WHERE accession_id = ?1",
            params![accession_id.as_str()],
            |row| {
                Ok(FilingAggregate {
                    total_buy_value: row.get(0)?,
                    total_sell_value: row.get(1)?,
                    net_share_change: row.get(2)?,
                    transaction_count: row.get::<_, i64>(3)? as u32,
                })
            },
        )
        .optional()
        .map_err(|e| IngestError::Store(e.to_string()))
    }

    /// The persisted transaction codes for one filing, in ordinal order.
    pub fn transaction_codes(&self, accession_id: &AccessionId) -> Result<Vec<TransactionCode>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT transaction_code FROM transaction_details
                 WHERE accession_id = ?1 ORDER BY ordinal ASC",
            )
            .map_err(|e| IngestError::Store(e.to_string()))?;

        let rows = stmt
            .query_map(params![accession_id.as_str()], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| IngestError::Store(e.to_string()))?;

        let mut codes = Vec::new();
        for row in rows {
            let code = row.map_err(|e| IngestError::Store(e.to_string()))?;
            codes.push(TransactionCode::from_code(&code));
        }
        Ok(codes)
    }
}

#[async_trait]
impl FilingStore for SqliteStore {
    #[instrument(skip(self, filing), fields(accession = %filing.accession_id))]
    async fn upsert_filing(&self, filing: &FilingReference) -> Result<()> {
        let conn = self.lock_conn()?;
        Self::upsert_filing_in(&conn, filing)?;
        debug!("upserted filing metadata");
        Ok(())
    }

    #[instrument(skip(self, transactions), fields(accession = %accession_id, count = transactions.len()))]
    async fn replace_transactions(
        &self,
        accession_id: &AccessionId,
        transactions: &[EnrichedTransaction],
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| IngestError::Store(e.to_string()))?;
        Self::replace_transactions_in(&tx, accession_id, transactions)?;
        tx.commit().map_err(|e| IngestError::Store(e.to_string()))?;
        debug!("replaced transaction details");
        Ok(())
    }

    #[instrument(skip(self, aggregate), fields(accession = %accession_id))]
    async fn upsert_aggregate(
        &self,
        accession_id: &AccessionId,
        aggregate: &FilingAggregate,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        Self::upsert_aggregate_in(&conn, accession_id, aggregate)?;
        debug!("upserted filing aggregate");
        Ok(())
    }

    #[instrument(skip(self, filing, transactions, aggregate), fields(accession = %filing.accession_id))]
    async fn persist_filing(
        &self,
        filing: &FilingReference,
        transactions: &[EnrichedTransaction],
        aggregate: &FilingAggregate,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| IngestError::Store(e.to_string()))?;

        Self::upsert_filing_in(&tx, filing)?;
        Self::replace_transactions_in(&tx, &filing.accession_id, transactions)?;
        Self::upsert_aggregate_in(&tx, &filing.accession_id, aggregate)?;

        tx.commit().map_err(|e| IngestError::Store(e.to_string()))?;
        debug!(count = transactions.len(), "persisted filing unit");
        Ok(())
    }
}

#[async_trait]
impl ShareCountStore for SqliteStore {
    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn get_share_count(&self, symbol: &Symbol) -> Result<Option<ShareCountEntry>> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                "SELECT shares_outstanding, source, fetched_at
                 FROM share_cache WHERE issuer_symbol = ?1",
                params![symbol.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| IngestError::Store(e.to_string()))?;

        let Some((shares, source, fetched_at)) = row else {
            debug!("share cache miss");
            return Ok(None);
        };

        let source = ShareSource::parse(&source)
            .ok_or_else(|| IngestError::Store(format!("unknown share source: {source}")))?;
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map_err(|e| IngestError::Store(format!("bad fetched_at timestamp: {e}")))?
            .with_timezone(&Utc);

        debug!(shares, "share cache hit");
        Ok(Some(ShareCountEntry {
            symbol: symbol.clone(),
            shares_outstanding: shares as u64,
            source,
            fetched_at,
        }))
    }

    #[instrument(skip(self, entry), fields(symbol = %entry.symbol, source = entry.source.as_str()))]
    async fn put_share_count(&self, entry: &ShareCountEntry) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO share_cache
             (issuer_symbol, shares_outstanding, source, fetched_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.symbol.as_str(),
                entry.shares_outstanding as i64,
                entry.source.as_str(),
                entry.fetched_at.to_rfc3339(),
            ],
        )
        .map_err(|e| IngestError::Store(e.to_string()))?;
        debug!("cached share count");
        Ok(())
    }
}
