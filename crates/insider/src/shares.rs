//! Layered outstanding-share lookup: cache → primary → fallback.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use insider_core::{ShareCountEntry, ShareCountStore, ShareSource, SharesProvider, Symbol};

/// Share-count lookup with a deterministic precedence order.
///
/// 1. A fresh cache entry wins outright; neither provider is called.
/// 2. Otherwise the primary provider is tried, then the fallback, with the
///    winner written through to the cache under its source tag.
/// 3. If both providers fail but a stale cache entry exists, the stale value
///    is preferred over reporting nothing.
/// 4. Only when all of the above come up empty does the lookup return
///    `None`, and enrichment degrades to a null ownership percentage.
///
/// The check-then-fetch sequence is atomic per symbol: concurrent lookups of
/// the same issuer serialize on a per-key lock, so a burst of filings for
/// one company costs at most one provider round trip.
pub struct ShareCounter {
    store: Arc<dyn ShareCountStore>,
    primary: Arc<dyn SharesProvider>,
    fallback: Arc<dyn SharesProvider>,
    ttl: Duration,
    locks: Mutex<HashMap<Symbol, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for ShareCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareCounter")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.name())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ShareCounter {
    /// Creates a lookup over the given store and providers.
    pub fn new(
        store: Arc<dyn ShareCountStore>,
        primary: Arc<dyn SharesProvider>,
        fallback: Arc<dyn SharesProvider>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            primary,
            fallback,
            ttl,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn key_lock(&self, symbol: &Symbol) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Resolves the issuer's outstanding share count, or `None` when every
    /// layer comes up empty.
    ///
    /// Never fails: provider and cache errors are logged and the lookup
    /// degrades, because an unresolved share count must not abort the
    /// filing it enriches.
    pub async fn lookup(&self, symbol: &Symbol) -> Option<u64> {
        let lock = self.key_lock(symbol).await;
        let _guard = lock.lock().await;

        let cached = match self.store.get_share_count(symbol).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(%symbol, error = %e, "share cache read failed, treating as miss");
                None
            }
        };

        if let Some(entry) = &cached {
            if !entry.is_stale(self.ttl) {
                debug!(%symbol, shares = entry.shares_outstanding, "share cache hit");
                return Some(entry.shares_outstanding);
            }
        }

        for (provider, source) in [
            (&self.primary, ShareSource::Primary),
            (&self.fallback, ShareSource::Fallback),
        ] {
            match provider.shares_outstanding(symbol).await {
                Ok(shares) if shares > 0 => {
                    debug!(%symbol, shares, provider = provider.name(), "resolved share count");
                    let entry = ShareCountEntry::new(symbol.clone(), shares, source);
                    if let Err(e) = self.store.put_share_count(&entry).await {
                        warn!(%symbol, error = %e, "failed to cache share count");
                    }
                    return Some(shares);
                }
                Ok(_) => {
                    warn!(%symbol, provider = provider.name(), "provider returned zero shares");
                }
                Err(e) => {
                    warn!(%symbol, provider = provider.name(), error = %e, "share lookup failed");
                }
            }
        }

        // Stale data beats no data.
        if let Some(entry) = cached {
            warn!(%symbol, shares = entry.shares_outstanding, "using stale cached share count");
            return Some(entry.shares_outstanding);
        }

        warn!(%symbol, "share count unresolved");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use insider_core::{IngestError, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider stub that counts calls and returns a fixed outcome.
    #[derive(Debug)]
    struct StubProvider {
        name: &'static str,
        shares: Option<u64>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn succeeding(name: &'static str, shares: u64) -> Arc<Self> {
            Arc::new(Self {
                name,
                shares: Some(shares),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                shares: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SharesProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn shares_outstanding(&self, symbol: &Symbol) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.shares
                .ok_or_else(|| IngestError::SymbolNotFound(symbol.to_string()))
        }
    }

    /// In-memory share store for lookup tests.
    #[derive(Debug, Default)]
    struct MemoryShareStore {
        entries: Mutex<HashMap<Symbol, ShareCountEntry>>,
    }

    #[async_trait]
    impl ShareCountStore for MemoryShareStore {
        async fn get_share_count(&self, symbol: &Symbol) -> Result<Option<ShareCountEntry>> {
            Ok(self.entries.lock().await.get(symbol).cloned())
        }

        async fn put_share_count(&self, entry: &ShareCountEntry) -> Result<()> {
            self.entries
                .lock()
                .await
                .insert(entry.symbol.clone(), entry.clone());
            Ok(())
        }
    }

    fn counter(
        store: Arc<MemoryShareStore>,
        primary: Arc<StubProvider>,
        fallback: Arc<StubProvider>,
        ttl: Duration,
    ) -> ShareCounter {
        ShareCounter::new(store, primary, fallback, ttl)
    }

    #[tokio::test]
    async fn fresh_entry_skips_both_providers() {
        let store = Arc::new(MemoryShareStore::default());
        let symbol = Symbol::new("ACME");
        store
            .put_share_count(&ShareCountEntry::new(
                symbol.clone(),
                1_000_000,
                ShareSource::Primary,
            ))
            .await
            .unwrap();

        let primary = StubProvider::succeeding("primary", 9);
        let fallback = StubProvider::succeeding("fallback", 9);
        let counter = counter(
            store,
            primary.clone(),
            fallback.clone(),
            Duration::from_secs(3600),
        );

        assert_eq!(counter.lookup(&symbol).await, Some(1_000_000));
        assert_eq!(primary.calls(), 0);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn primary_failure_activates_fallback_once() {
        let store = Arc::new(MemoryShareStore::default());
        let symbol = Symbol::new("XYZ");

        let primary = StubProvider::failing("primary");
        let fallback = StubProvider::succeeding("fallback", 500_000);
        let counter = counter(
            store.clone(),
            primary.clone(),
            fallback.clone(),
            Duration::from_secs(3600),
        );

        assert_eq!(counter.lookup(&symbol).await, Some(500_000));
        assert_eq!(fallback.calls(), 1);

        let cached = store.get_share_count(&symbol).await.unwrap().unwrap();
        assert_eq!(cached.source, ShareSource::Fallback);
        assert_eq!(cached.shares_outstanding, 500_000);
    }

    #[tokio::test]
    async fn primary_success_writes_through() {
        let store = Arc::new(MemoryShareStore::default());
        let symbol = Symbol::new("ACME");

        let primary = StubProvider::succeeding("primary", 750_000);
        let fallback = StubProvider::succeeding("fallback", 9);
        let counter = counter(
            store.clone(),
            primary,
            fallback.clone(),
            Duration::from_secs(3600),
        );

        assert_eq!(counter.lookup(&symbol).await, Some(750_000));
        assert_eq!(fallback.calls(), 0);

        let cached = store.get_share_count(&symbol).await.unwrap().unwrap();
        assert_eq!(cached.source, ShareSource::Primary);
    }

    #[tokio::test]
    async fn stale_entry_is_preferred_over_unknown() {
        let store = Arc::new(MemoryShareStore::default());
        let symbol = Symbol::new("ACME");
        store
            .put_share_count(&ShareCountEntry {
                symbol: symbol.clone(),
                shares_outstanding: 321_000,
                source: ShareSource::Primary,
                fetched_at: Utc::now() - chrono::TimeDelta::days(30),
            })
            .await
            .unwrap();

        let primary = StubProvider::failing("primary");
        let fallback = StubProvider::failing("fallback");
        let counter = counter(
            store,
            primary.clone(),
            fallback.clone(),
            Duration::from_secs(3600),
        );

        // Both providers are consulted first, then the stale value wins.
        assert_eq!(counter.lookup(&symbol).await, Some(321_000));
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn unresolvable_symbol_degrades_to_none() {
        let store = Arc::new(MemoryShareStore::default());
        let primary = StubProvider::failing("primary");
        let fallback = StubProvider::failing("fallback");
        let counter = counter(store, primary, fallback, Duration::from_secs(3600));

        assert_eq!(counter.lookup(&Symbol::new("GONE")).await, None);
    }

    #[tokio::test]
    async fn stale_entry_is_refreshed_by_provider() {
        let store = Arc::new(MemoryShareStore::default());
        let symbol = Symbol::new("ACME");
        store
            .put_share_count(&ShareCountEntry {
                symbol: symbol.clone(),
                shares_outstanding: 100,
                source: ShareSource::Fallback,
                fetched_at: Utc::now() - chrono::TimeDelta::days(30),
            })
            .await
            .unwrap();

        let primary = StubProvider::succeeding("primary", 999_999);
        let fallback = StubProvider::failing("fallback");
        let counter = counter(store.clone(), primary, fallback, Duration::from_secs(3600));

        assert_eq!(counter.lookup(&symbol).await, Some(999_999));
        let cached = store.get_share_count(&symbol).await.unwrap().unwrap();
        assert_eq!(cached.source, ShareSource::Primary);
        assert!(!cached.is_stale(Duration::from_secs(3600)));
    }
}
