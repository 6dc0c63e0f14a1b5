//! Core data types for insider filing ingestion.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`AccessionId`] - Unique SEC filing identifier
//! - [`FilingCandidate`] - Feed-level filing reference
//! - [`FilingReference`] - Full filing metadata after document parse
//! - [`RawTransaction`] - One non-derivative transaction as filed
//! - [`EnrichedTransaction`] - Transaction plus derived metrics
//! - [`FilingAggregate`] - Per-filing rollup
//! - [`ShareCountEntry`] - Cached outstanding-share count

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Unique accession identifier of one SEC filing.
///
/// Stored in the dashless form used in EDGAR archive paths.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessionId(String);

impl AccessionId {
    /// Creates a new accession id, stripping any dashes.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().replace('-', ""))
    }

    /// Returns the accession id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccessionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A candidate filing as listed by the index feed.
///
/// The feed carries filer-side metadata only; issuer name and ticker are not
/// known until the filing document itself has been parsed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilingCandidate {
    /// Unique filing identifier.
    pub accession_id: AccessionId,
    /// CIK of the reporting filer, as listed in the feed entry.
    pub cik: String,
    /// Name of the reporting filer.
    pub filer_name: String,
    /// Form type of the entry (e.g. "4", "4/A").
    pub form_type: String,
    /// URL of the filing's index page.
    pub index_url: String,
    /// Timestamp the feed reported for the filing.
    pub filed_at: DateTime<Utc>,
}

/// Full filing metadata, completed from the parsed document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilingReference {
    /// Unique filing identifier.
    pub accession_id: AccessionId,
    /// Ticker symbol of the issuer whose securities were traded.
    pub issuer_symbol: Symbol,
    /// Name of the issuer.
    pub issuer_name: String,
    /// Name of the reporting insider.
    pub filer_name: String,
    /// Role of the insider at the issuer (e.g. "Director & CEO"), if stated.
    pub owner_title: Option<String>,
    /// URL of the filing's index page.
    pub filing_url: String,
    /// Timestamp the feed reported for the filing.
    pub filed_at: DateTime<Utc>,
}

impl FilingReference {
    /// Completes a feed candidate with issuer and owner details from the
    /// parsed document.
    #[must_use]
    pub fn from_document(candidate: &FilingCandidate, document: &Form4Document) -> Self {
        Self {
            accession_id: candidate.accession_id.clone(),
            issuer_symbol: Symbol::new(document.issuer.trading_symbol.clone()),
            issuer_name: document.issuer.name.clone(),
            filer_name: if document.owner.name.is_empty() {
                candidate.filer_name.clone()
            } else {
                document.owner.name.clone()
            },
            owner_title: document.owner.title(),
            filing_url: candidate.index_url.clone(),
            filed_at: candidate.filed_at,
        }
    }
}

/// Classification of an insider transaction, from the Form 4 byte code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionCode {
    /// Open-market or private purchase (code `P`).
    Purchase,
    /// Exercise or conversion of a derivative security (code `M`).
    Exercise,
    /// Open-market or private sale (code `S`).
    Sale,
    /// Conversion of a derivative security (code `C`).
    Conversion,
    /// Any code outside the recognized set. Persisted, never dropped.
    #[default]
    Other,
}

impl TransactionCode {
    /// Maps a Form 4 transaction code to its classification.
    ///
    /// Unrecognized codes map to [`Self::Other`] so no filed transaction is
    /// silently lost.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "P" => Self::Purchase,
            "M" => Self::Exercise,
            "S" => Self::Sale,
            "C" => Self::Conversion,
            _ => Self::Other,
        }
    }

    /// Returns the single-letter form persisted in the store.
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::Purchase => "P",
            Self::Exercise => "M",
            Self::Sale => "S",
            Self::Conversion => "C",
            Self::Other => "O",
        }
    }

    /// Which side of the book the transaction sits on, if known.
    ///
    /// Purchases and exercises acquire shares; sales and conversions dispose
    /// of them. [`Self::Other`] has no known side and contributes only to the
    /// transaction count when aggregating.
    #[must_use]
    pub const fn side(&self) -> Option<TradeSide> {
        match self {
            Self::Purchase | Self::Exercise => Some(TradeSide::Buy),
            Self::Sale | Self::Conversion => Some(TradeSide::Sell),
            Self::Other => None,
        }
    }
}

impl fmt::Display for TransactionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// Direction of a classified transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    /// Shares acquired.
    Buy,
    /// Shares disposed.
    Sell,
}

/// One non-derivative transaction as filed, in document order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Classified transaction code.
    pub code: TransactionCode,
    /// Security title as filed (e.g. "Common Stock").
    pub security_title: String,
    /// Number of shares in the transaction.
    pub shares: f64,
    /// Price per share; zero when unreported.
    pub price_per_share: f64,
    /// Date of the transaction, when stated.
    pub transaction_date: Option<NaiveDate>,
    /// Shares beneficially owned following the transaction.
    pub shares_owned_after: f64,
}

/// A transaction with its derived financial metrics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTransaction {
    /// The transaction as filed.
    pub transaction: RawTransaction,
    /// `shares * price_per_share`, rounded to cents. Zero when the price is
    /// unreported.
    pub trade_value: f64,
    /// Post-transaction ownership as a percentage of shares outstanding;
    /// `None` when the share count is unknown or zero.
    pub ownership_pct: Option<f64>,
}

/// Per-filing rollup across its enriched transactions.
///
/// Recomputed fresh on every ingestion; persistence overwrites rather than
/// accumulates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilingAggregate {
    /// Total value of acquiring transactions.
    pub total_buy_value: f64,
    /// Total value of disposing transactions.
    pub total_sell_value: f64,
    /// Net change in shares held (acquisitions minus disposals).
    pub net_share_change: f64,
    /// Number of transactions folded into this aggregate.
    pub transaction_count: u32,
}

/// Provenance of a cached share count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShareSource {
    /// Looked up from the primary filing-data provider.
    Primary,
    /// Looked up from the best-effort fallback provider.
    Fallback,
}

impl ShareSource {
    /// Returns the string form persisted in the store.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }

    /// Parses the persisted string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "primary" => Some(Self::Primary),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

/// Cached outstanding-share count for one issuer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShareCountEntry {
    /// Issuer ticker symbol (cache key).
    pub symbol: Symbol,
    /// Outstanding share count.
    pub shares_outstanding: u64,
    /// Which provider produced the value.
    pub source: ShareSource,
    /// When the value was fetched.
    pub fetched_at: DateTime<Utc>,
}

impl ShareCountEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(symbol: Symbol, shares_outstanding: u64, source: ShareSource) -> Self {
        Self {
            symbol,
            shares_outstanding,
            source,
            fetched_at: Utc::now(),
        }
    }

    /// Returns true when the entry is older than the freshness window and
    /// must be treated as a miss.
    #[must_use]
    pub fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.fetched_at);
        age >= chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX)
    }
}

/// Issuer details from a filing document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IssuerInfo {
    /// Issuer company name.
    pub name: String,
    /// Issuer trading symbol as filed; may be empty or "NONE".
    pub trading_symbol: String,
}

impl IssuerInfo {
    /// Returns the issuer ticker when one is actually resolvable.
    ///
    /// Filings for issuers without a listed security carry "NONE" (or
    /// nothing) in the symbol field.
    #[must_use]
    pub fn symbol(&self) -> Option<Symbol> {
        let trimmed = self.trading_symbol.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(Symbol::new(trimmed))
        }
    }
}

/// Reporting-owner details from a filing document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerInfo {
    /// Reporting owner name.
    pub name: String,
    /// Owner is a director of the issuer.
    pub is_director: bool,
    /// Owner is an officer of the issuer.
    pub is_officer: bool,
    /// Officer title, when stated.
    pub officer_title: Option<String>,
    /// Owner holds ten percent or more of the issuer.
    pub is_ten_percent_owner: bool,
    /// Owner declared some other relationship.
    pub is_other: bool,
}

impl OwnerInfo {
    /// Renders the declared relationships as a single title string, the way
    /// they are persisted with the filing.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();
        if self.is_director {
            parts.push("Director".to_string());
        }
        if self.is_officer {
            match &self.officer_title {
                Some(title) if !title.trim().is_empty() => parts.push(title.trim().to_string()),
                _ => parts.push("Officer".to_string()),
            }
        }
        if self.is_ten_percent_owner {
            parts.push("10% Owner".to_string());
        }
        if self.is_other {
            parts.push("Other".to_string());
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" & "))
        }
    }
}

/// A parsed Form 4 document: issuer and owner fragments plus the ordered
/// common-stock transactions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Form4Document {
    /// Issuer fragment.
    pub issuer: IssuerInfo,
    /// Reporting-owner fragment.
    pub owner: OwnerInfo,
    /// Non-derivative common-stock transactions in document order.
    pub transactions: Vec<RawTransaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_uppercases() {
        assert_eq!(Symbol::new("aapl").as_str(), "AAPL");
        assert_eq!(Symbol::new("AAPL"), Symbol::new("aapl"));
    }

    #[test]
    fn accession_strips_dashes() {
        let id = AccessionId::new("0001234567-24-000123");
        assert_eq!(id.as_str(), "000123456724000123");
    }

    #[test]
    fn transaction_codes_classify() {
        assert_eq!(TransactionCode::from_code("P"), TransactionCode::Purchase);
        assert_eq!(TransactionCode::from_code("M"), TransactionCode::Exercise);
        assert_eq!(TransactionCode::from_code("S"), TransactionCode::Sale);
        assert_eq!(TransactionCode::from_code("C"), TransactionCode::Conversion);
        assert_eq!(TransactionCode::from_code("X"), TransactionCode::Other);
        assert_eq!(TransactionCode::from_code(" P "), TransactionCode::Purchase);
    }

    #[test]
    fn transaction_sides() {
        assert_eq!(TransactionCode::Purchase.side(), Some(TradeSide::Buy));
        assert_eq!(TransactionCode::Exercise.side(), Some(TradeSide::Buy));
        assert_eq!(TransactionCode::Sale.side(), Some(TradeSide::Sell));
        assert_eq!(TransactionCode::Conversion.side(), Some(TradeSide::Sell));
        assert_eq!(TransactionCode::Other.side(), None);
    }

    #[test]
    fn issuer_symbol_resolution() {
        let listed = IssuerInfo {
            name: "Acme Corp".to_string(),
            trading_symbol: "acme".to_string(),
        };
        assert_eq!(listed.symbol(), Some(Symbol::new("ACME")));

        let unlisted = IssuerInfo {
            name: "Private Holdings LLC".to_string(),
            trading_symbol: "NONE".to_string(),
        };
        assert_eq!(unlisted.symbol(), None);

        let blank = IssuerInfo::default();
        assert_eq!(blank.symbol(), None);
    }

    #[test]
    fn owner_title_rendering() {
        let owner = OwnerInfo {
            name: "Doe Jane".to_string(),
            is_director: true,
            is_officer: true,
            officer_title: Some("Chief Executive Officer".to_string()),
            ..Default::default()
        };
        assert_eq!(
            owner.title().as_deref(),
            Some("Director & Chief Executive Officer")
        );

        let untitled_officer = OwnerInfo {
            is_officer: true,
            ..Default::default()
        };
        assert_eq!(untitled_officer.title().as_deref(), Some("Officer"));

        assert_eq!(OwnerInfo::default().title(), None);
    }

    #[test]
    fn share_source_round_trip() {
        assert_eq!(ShareSource::parse("primary"), Some(ShareSource::Primary));
        assert_eq!(ShareSource::parse("fallback"), Some(ShareSource::Fallback));
        assert_eq!(ShareSource::parse("unknown"), None);
    }

    #[test]
    fn fresh_entry_is_not_stale() {
        let entry = ShareCountEntry::new(Symbol::new("ACME"), 1_000_000, ShareSource::Primary);
        assert!(!entry.is_stale(Duration::from_secs(3600)));
        assert!(entry.is_stale(Duration::ZERO));
    }
}
