//! External identifier resolution.
//!
//! Two resolvers map free text to canonical identifiers:
//!
//! * [`PubMedResolver`]: paper title → PubMed ID (exact title search)
//! * [`DiseaseResolver`]: disease label → `OMIM:<id>` / `Orphanet:<id>`
//!
//! Both share one [`HttpClient`] (bounded retry, pooled connections) and one
//! [`ResolutionCache`]. The cache is injected, never global, so tests can
//! hand in a fresh [`MemoryCache`] and count what reaches the network.
//!
//! ## Failure policy
//!
//! Every network step returns `Result<Option<T>, LookupError>`: found,
//! empty, or failed. [`on_failure`] is the single table deciding what a
//! failure means; today every [`LookupError`] maps to
//! [`OnFailure::TreatAsEmpty`], so callers only ever see empty strings.

pub mod cache;
pub mod disease;
pub mod http;
pub mod pubmed;

use crate::config::ResolverConfig;
use crate::error::{ExtractError, LookupError};
use crate::tables::normalize::collapse_whitespace;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

pub use cache::{open_cache, DiskCache, MemoryCache, ResolutionCache};
pub use disease::{DiseaseIds, DiseaseResolver};
pub use http::{build_client, HttpClient};
pub use pubmed::PubMedResolver;

/// Cache namespace of PubMed lookups.
pub const PMID_NAMESPACE: &str = "pmid:";
/// Cache namespace of OMIM/Orphanet lookups.
pub const IDS_NAMESPACE: &str = "ids:";

/// Collapse whitespace and trim; the form every lookup and cache key uses.
pub fn normalize_query(query: &str) -> String {
    collapse_whitespace(query)
}

/// `namespace` + hex SHA-256 of the normalised query.
pub fn cache_key(namespace: &str, normalized: &str) -> String {
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{namespace}{}", hex::encode(digest))
}

/// What a failed resolver step means for the rest of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Log, contribute nothing, continue with the next step.
    TreatAsEmpty,
    /// Surface the error to the caller.
    Propagate,
}

/// Policy table for resolver step failures.
pub fn on_failure(err: &LookupError) -> OnFailure {
    match err {
        LookupError::Transport { .. } => OnFailure::TreatAsEmpty,
        LookupError::Timeout { .. } => OnFailure::TreatAsEmpty,
        LookupError::Status { .. } => OnFailure::TreatAsEmpty,
        LookupError::Malformed { .. } => OnFailure::TreatAsEmpty,
    }
}

/// Apply [`on_failure`] to one step result.
///
/// Resolvers expose no error channel, so a `Propagate` verdict degrades to
/// an empty contribution as well; it is logged at a higher level.
pub(crate) fn lenient<T>(query: &str, result: Result<Option<T>, LookupError>) -> Option<T> {
    match result {
        Ok(found) => found,
        Err(e) => {
            match on_failure(&e) {
                OnFailure::TreatAsEmpty => warn!("{} lookup failed for '{}': {}", e.provider(), query, e),
                OnFailure::Propagate => tracing::error!(
                    "{} lookup failed for '{}' and cannot be propagated: {}",
                    e.provider(),
                    query,
                    e
                ),
            }
            None
        }
    }
}

/// Both resolvers wired to one client and one cache.
#[derive(Clone)]
pub struct Resolvers {
    pub pubmed: PubMedResolver,
    pub disease: DiseaseResolver,
}

impl Resolvers {
    /// Build the client and open the cache described by `config`.
    pub fn new(config: &ResolverConfig) -> Result<Self, ExtractError> {
        Self::with_cache(config, open_cache(config))
    }

    /// Build with an explicit cache.
    pub fn with_cache(
        config: &ResolverConfig,
        cache: Arc<dyn ResolutionCache>,
    ) -> Result<Self, ExtractError> {
        let http = build_client(config)?;
        Ok(Self {
            pubmed: PubMedResolver::new(http.clone(), Arc::clone(&cache), config),
            disease: DiseaseResolver::new(http, cache, config),
        })
    }

    /// See [`PubMedResolver::resolve_pmid`].
    pub async fn resolve_pmid(&self, title: &str) -> String {
        self.pubmed.resolve_pmid(title).await
    }

    /// See [`DiseaseResolver::resolve_ids`].
    pub async fn resolve_ids(&self, disease_label: &str) -> DiseaseIds {
        self.disease.resolve_ids(disease_label).await
    }
}
