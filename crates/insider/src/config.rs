//! Run configuration for the ingestion pipeline.

use std::time::Duration;

use insider_core::{IngestError, Result};

/// Default cap on feed candidates per run.
const DEFAULT_FEED_LIMIT: usize = 1000;

/// Default minimum interval between outbound requests (SEC fair access
/// policy allows 10 requests per second).
const DEFAULT_RATE_INTERVAL: Duration = Duration::from_millis(100);

/// Default per-request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default attempt cap for transient fetch failures.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff.
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Default freshness window for cached share counts.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for one ingestion run.
///
/// All values are externally supplied; [`IngestConfig::validate`] runs
/// before a pipeline is constructed so bad configuration surfaces at
/// startup, not mid-run.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    /// Identifying user agent, "AppName/Version (contact@email.com)".
    pub user_agent: String,
    /// Maximum feed candidates per run.
    pub feed_limit: usize,
    /// Minimum interval between outbound requests, shared process-wide.
    pub rate_interval: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Attempt cap for transient fetch failures.
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    pub backoff_base: Duration,
    /// Freshness window for cached share counts.
    pub cache_ttl: Duration,
    /// Number of filings processed concurrently.
    pub workers: usize,
}

impl IngestConfig {
    /// Creates a configuration with the given user agent and defaults for
    /// everything else.
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            feed_limit: DEFAULT_FEED_LIMIT,
            rate_interval: DEFAULT_RATE_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            cache_ttl: DEFAULT_CACHE_TTL,
            workers: 1,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`IngestError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(IngestError::InvalidConfig(
                "user_agent must not be empty".to_string(),
            ));
        }
        if !self.user_agent.contains('(') || !self.user_agent.contains('@') {
            return Err(IngestError::InvalidConfig(
                "user_agent must identify the application and a contact address".to_string(),
            ));
        }
        if self.feed_limit == 0 {
            return Err(IngestError::InvalidConfig(
                "feed_limit must be positive".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(IngestError::InvalidConfig(
                "request_timeout must be positive".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(IngestError::InvalidConfig(
                "max_attempts must be positive".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(IngestError::InvalidConfig(
                "workers must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = IngestConfig::new("TestApp/1.0 (test@example.com)");
        assert!(config.validate().is_ok());
        assert_eq!(config.feed_limit, 1000);
        assert_eq!(config.rate_interval, Duration::from_millis(100));
    }

    #[test]
    fn rejects_anonymous_user_agent() {
        assert!(IngestConfig::new("").validate().is_err());
        assert!(IngestConfig::new("TestApp/1.0").validate().is_err());
    }

    #[test]
    fn rejects_zero_bounds() {
        let mut config = IngestConfig::new("TestApp/1.0 (test@example.com)");
        config.feed_limit = 0;
        assert!(config.validate().is_err());

        let mut config = IngestConfig::new("TestApp/1.0 (test@example.com)");
        config.workers = 0;
        assert!(config.validate().is_err());

        let mut config = IngestConfig::new("TestApp/1.0 (test@example.com)");
        config.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
