//! PubMed ID lookup by exact title (NCBI E-utilities `esearch`).

use super::cache::ResolutionCache;
use super::http::HttpClient;
use super::{cache_key, lenient, normalize_query, PMID_NAMESPACE};
use crate::config::ResolverConfig;
use crate::error::LookupError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const PROVIDER: &str = "pubmed";

/// Title → PMID resolver.
#[derive(Clone)]
pub struct PubMedResolver {
    http: HttpClient,
    cache: Arc<dyn ResolutionCache>,
    base_url: String,
    ttl: Duration,
}

impl PubMedResolver {
    pub fn new(http: HttpClient, cache: Arc<dyn ResolutionCache>, config: &ResolverConfig) -> Self {
        Self {
            http,
            cache,
            base_url: config.endpoints.pubmed.trim_end_matches('/').to_string(),
            ttl: Duration::from_secs(config.cache_ttl_secs),
        }
    }

    /// Resolve a paper title to its PubMed ID.
    ///
    /// Returns `""` for an empty title (no request is made), when nothing
    /// matches, or when the lookup failed. Negative results are cached too.
    pub async fn resolve_pmid(&self, title: &str) -> String {
        let title = normalize_query(title);
        if title.is_empty() {
            return String::new();
        }

        let key = cache_key(PMID_NAMESPACE, &title);
        if let Some(Value::String(hit)) = self.cache.get(&key) {
            debug!("PMID cache hit for '{}'", title);
            return hit;
        }

        let pmid = lenient(&title, self.search_exact_title(&title).await).unwrap_or_default();
        self.cache.set(&key, &Value::String(pmid.clone()), self.ttl);

        if pmid.is_empty() {
            info!("No PMID for '{}'", title);
        } else {
            info!("PMID {} for '{}'", pmid, title);
        }
        pmid
    }

    async fn search_exact_title(&self, title: &str) -> Result<Option<String>, LookupError> {
        let url = format!("{}/esearch.fcgi", self.base_url);
        let term = format!("{title}[Title]");
        let js = self
            .http
            .get_json(
                PROVIDER,
                &url,
                &[
                    ("db", "pubmed"),
                    ("retmode", "json"),
                    ("retmax", "1"),
                    ("term", term.as_str()),
                ],
            )
            .await?;
        first_id(&js)
    }
}

/// `esearchresult.idlist[0]`, accepting string or numeric IDs.
fn first_id(js: &Value) -> Result<Option<String>, LookupError> {
    let result = js.get("esearchresult").ok_or_else(|| LookupError::Malformed {
        provider: PROVIDER,
        detail: "missing 'esearchresult'".to_string(),
    })?;

    let first = match result.get("idlist") {
        Some(Value::Array(ids)) => ids.first(),
        Some(Value::Null) | None => None,
        Some(_) => {
            return Err(LookupError::Malformed {
                provider: PROVIDER,
                detail: "'idlist' is not an array".to_string(),
            })
        }
    };

    Ok(match first {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
