//! Configuration types for identifier resolution.
//!
//! All resolver behaviour is controlled through [`ResolverConfig`], built via
//! its [`ResolverConfigBuilder`]. One struct holds every knob so the same
//! config can be handed to the HTTP client factory, the cache and the batch
//! enricher.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Thirty days, the default lifetime of a cached resolution.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60 * 24 * 30;

/// Configuration for the resolvers and the batch enricher.
///
/// Built via [`ResolverConfig::builder()`] or using
/// [`ResolverConfig::default()`].
///
/// # Example
/// ```rust
/// use case_extract::ResolverConfig;
///
/// let config = ResolverConfig::builder()
///     .max_retries(2)
///     .request_timeout_secs(10)
///     .cache_dir(None)
///     .build()
///     .unwrap();
/// assert!(config.cache_dir.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// `User-Agent` header sent with every request. Default: `case-extractor/1.0`.
    pub user_agent: String,

    /// Retries after the first attempt for a retryable failure. Range: 0–3. Default: 1.
    ///
    /// Retryable: connection errors, timeouts and HTTP 429/500/502/503/504.
    /// Any other 4xx is returned immediately.
    pub max_retries: u32,

    /// Base backoff in milliseconds. Default: 200.
    ///
    /// Attempt `n` (1-based) waits `retry_backoff_ms * 2^(n-1)` unless the
    /// server sent a `Retry-After` header.
    pub retry_backoff_ms: u64,

    /// Upper bound applied to a server-provided `Retry-After`. Default: 30.
    pub max_retry_after_secs: u64,

    /// TCP connect timeout per request. Default: 2.
    pub connect_timeout_secs: u64,

    /// Whole-request timeout per request. Default: 5.
    pub request_timeout_secs: u64,

    /// Idle connections kept per host. Default: 50.
    pub pool_max_idle_per_host: usize,

    /// Lifetime of a cache entry in seconds. Default: 30 days.
    pub cache_ttl_secs: u64,

    /// Directory of the durable cache. `None` selects the in-process cache.
    ///
    /// Default: `<data_local_dir>/case-extract/resolvers`, or `None` when the
    /// platform has no data directory.
    pub cache_dir: Option<PathBuf>,

    /// Records enriched at once by [`crate::enrich::enrich_records`]. Default: 4.
    pub concurrency: usize,

    /// Upstream base URLs.
    pub endpoints: Endpoints,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            user_agent: "case-extractor/1.0".to_string(),
            max_retries: 1,
            retry_backoff_ms: 200,
            max_retry_after_secs: 30,
            connect_timeout_secs: 2,
            request_timeout_secs: 5,
            pool_max_idle_per_host: 50,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_dir: default_cache_dir(),
            concurrency: 4,
            endpoints: Endpoints::default(),
        }
    }
}

impl ResolverConfig {
    /// Create a new builder for `ResolverConfig`.
    pub fn builder() -> ResolverConfigBuilder {
        ResolverConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Default on-disk cache location.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("case-extract").join("resolvers"))
}

/// Base URLs of the four upstream services.
///
/// Overridable so tests can point every resolver at a local mock server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// NCBI E-utilities base, without a trailing slash.
    pub pubmed: String,
    /// MediaWiki action API of Wikidata.
    pub wikidata_api: String,
    /// Wikidata SPARQL endpoint.
    pub wikidata_sparql: String,
    /// EBI Ontology Lookup Service base.
    pub ols: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            pubmed: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            wikidata_api: "https://www.wikidata.org/w/api.php".to_string(),
            wikidata_sparql: "https://query.wikidata.org/sparql".to_string(),
            ols: "https://www.ebi.ac.uk/ols4".to_string(),
        }
    }
}

impl Endpoints {
    /// Route every service to one base URL, as a mock server expects.
    ///
    /// Paths become `{base}/esearch.fcgi`, `{base}/w/api.php`,
    /// `{base}/sparql` and `{base}/api/search`.
    pub fn single_host(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            pubmed: base.to_string(),
            wikidata_api: format!("{base}/w/api.php"),
            wikidata_sparql: format!("{base}/sparql"),
            ols: base.to_string(),
        }
    }
}

/// Builder for [`ResolverConfig`].
#[derive(Debug)]
pub struct ResolverConfigBuilder {
    config: ResolverConfig,
}

impl ResolverConfigBuilder {
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(3);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_retry_after_secs(mut self, secs: u64) -> Self {
        self.config.max_retry_after_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.config.pool_max_idle_per_host = n;
        self
    }

    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.cache_ttl_secs = secs;
        self
    }

    pub fn cache_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.cache_dir = dir;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.config.endpoints = endpoints;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ResolverConfig, ExtractError> {
        let c = &self.config;
        if c.user_agent.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "User agent must not be empty".into(),
            ));
        }
        if c.connect_timeout_secs == 0 || c.request_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "Timeouts must be at least 1 second".into(),
            ));
        }
        if c.pool_max_idle_per_host == 0 || c.pool_max_idle_per_host > 50 {
            return Err(ExtractError::InvalidConfig(format!(
                "Connection pool size must be 1–50, got {}",
                c.pool_max_idle_per_host
            )));
        }
        if c.concurrency == 0 {
            return Err(ExtractError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
