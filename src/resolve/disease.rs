//! OMIM / Orphanet lookup by disease label.
//!
//! ## Fallback chain
//!
//! No single provider covers every disease or matches labels exactly, so the
//! lookup runs strict sources first and only broadens for fields still empty:
//!
//! 1. Wikidata entity search: the candidate whose English label equals the
//!    query (case-insensitive), else the top hit; then its claims
//!    `P492` (OMIM) and `P1550` (Orphanet)
//! 2. Wikidata SPARQL: an entity whose English label equals the query
//!    (case-insensitive); fills whichever field is still empty
//! 3. EBI OLS exact-label search in ORDO: Orphanet only
//!
//! A failed step contributes nothing; the chain always runs to the end.

use super::cache::ResolutionCache;
use super::http::HttpClient;
use super::{cache_key, lenient, normalize_query, IDS_NAMESPACE};
use crate::config::ResolverConfig;
use crate::error::LookupError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Wikidata property: OMIM ID.
pub const PROP_OMIM: &str = "P492";
/// Wikidata property: Orphanet ID.
pub const PROP_ORPHANET: &str = "P1550";

const WIKIDATA_SEARCH: &str = "wikidata-search";
const WIKIDATA_CLAIMS: &str = "wikidata-claims";
const WIKIDATA_SPARQL: &str = "wikidata-sparql";
const OLS: &str = "ols";

/// Resolved identifiers; an empty string means unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseIds {
    /// `OMIM:<digits>` or `""`.
    #[serde(rename = "OMIM", default)]
    pub omim: String,
    /// `Orphanet:<digits>` or `""`.
    #[serde(rename = "OrphaNet", default)]
    pub orphanet: String,
}

impl DiseaseIds {
    /// Build from bare provider values, adding the canonical prefixes.
    pub fn from_raw(omim: &str, orphanet: &str) -> Self {
        Self {
            omim: prefixed("OMIM", omim),
            orphanet: prefixed("Orphanet", orphanet),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.omim.is_empty() && !self.orphanet.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.omim.is_empty() && self.orphanet.is_empty()
    }

    /// Take `other`'s values only for fields still empty here.
    fn fill_missing(&mut self, other: DiseaseIds) {
        if self.omim.is_empty() {
            self.omim = other.omim;
        }
        if self.orphanet.is_empty() {
            self.orphanet = other.orphanet;
        }
    }
}

fn prefixed(prefix: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        String::new()
    } else {
        format!("{prefix}:{raw}")
    }
}

/// Disease label → OMIM / Orphanet resolver.
#[derive(Clone)]
pub struct DiseaseResolver {
    http: HttpClient,
    cache: Arc<dyn ResolutionCache>,
    wikidata_api: String,
    wikidata_sparql: String,
    ols: String,
    ttl: Duration,
}

impl DiseaseResolver {
    pub fn new(http: HttpClient, cache: Arc<dyn ResolutionCache>, config: &ResolverConfig) -> Self {
        let e = &config.endpoints;
        Self {
            http,
            cache,
            wikidata_api: e.wikidata_api.clone(),
            wikidata_sparql: e.wikidata_sparql.clone(),
            ols: e.ols.trim_end_matches('/').to_string(),
            ttl: Duration::from_secs(config.cache_ttl_secs),
        }
    }

    /// Resolve a disease label to OMIM and Orphanet identifiers.
    ///
    /// Each field is independently `""` when unresolved. An empty label
    /// returns immediately without a request. The final pair is cached,
    /// negative results included.
    pub async fn resolve_ids(&self, disease_label: &str) -> DiseaseIds {
        let label = normalize_query(disease_label);
        let key = cache_key(IDS_NAMESPACE, &label);

        if label.is_empty() {
            let ids = DiseaseIds::default();
            self.store(&key, &ids);
            return ids;
        }

        if let Some(hit) = self.cached(&key) {
            debug!("Disease ID cache hit for '{}'", label);
            return hit;
        }

        let mut ids = DiseaseIds::default();

        if let Some(found) = lenient(&label, self.from_entity_search(&label).await) {
            ids.fill_missing(found);
        }

        if !ids.is_complete() {
            if let Some(found) = lenient(&label, self.from_sparql(&label).await) {
                ids.fill_missing(found);
            }
        }

        if ids.orphanet.is_empty() {
            if let Some(orpha) = lenient(&label, self.orphanet_from_ols(&label).await) {
                ids.orphanet = prefixed("Orphanet", &orpha);
            }
        }

        self.store(&key, &ids);
        info!(
            "Resolved '{}' → OMIM='{}' Orphanet='{}'",
            label, ids.omim, ids.orphanet
        );
        ids
    }

    fn cached(&self, key: &str) -> Option<DiseaseIds> {
        let v = self.cache.get(key)?;
        serde_json::from_value(v).ok()
    }

    fn store(&self, key: &str, ids: &DiseaseIds) {
        if let Ok(v) = serde_json::to_value(ids) {
            self.cache.set(key, &v, self.ttl);
        }
    }

    // ── Step 1: entity search + claims ───────────────────────────────────────

    async fn from_entity_search(&self, label: &str) -> Result<Option<DiseaseIds>, LookupError> {
        let Some(qid) = self.search_entity(label).await? else {
            return Ok(None);
        };
        debug!("Wikidata entity {} for '{}'", qid, label);
        self.claims_for(&qid).await.map(Some)
    }

    async fn search_entity(&self, label: &str) -> Result<Option<String>, LookupError> {
        let js = self
            .http
            .get_json(
                WIKIDATA_SEARCH,
                &self.wikidata_api,
                &[
                    ("action", "wbsearchentities"),
                    ("format", "json"),
                    ("language", "en"),
                    ("search", label),
                    ("limit", "5"),
                    ("strictlanguage", "1"),
                ],
            )
            .await?;
        pick_entity(&js, label)
    }

    async fn claims_for(&self, qid: &str) -> Result<DiseaseIds, LookupError> {
        let js = self
            .http
            .get_json(
                WIKIDATA_CLAIMS,
                &self.wikidata_api,
                &[
                    ("action", "wbgetentities"),
                    ("format", "json"),
                    ("ids", qid),
                    ("props", "claims"),
                ],
            )
            .await?;
        ids_from_claims(&js, qid)
    }

    // ── Step 2: SPARQL ───────────────────────────────────────────────────────

    async fn from_sparql(&self, label: &str) -> Result<Option<DiseaseIds>, LookupError> {
        let query = sparql_query(label);
        let js = self
            .http
            .post_form_json(
                WIKIDATA_SPARQL,
                &self.wikidata_sparql,
                &[("query", query.as_str())],
                "application/sparql-results+json",
            )
            .await?;
        ids_from_sparql(&js)
    }

    // ── Step 3: OLS ──────────────────────────────────────────────────────────

    async fn orphanet_from_ols(&self, label: &str) -> Result<Option<String>, LookupError> {
        let url = format!("{}/api/search", self.ols);
        let js = self
            .http
            .get_json(
                OLS,
                &url,
                &[
                    ("q", label),
                    ("ontology", "ordo"),
                    ("queryFields", "label"),
                    ("exact", "true"),
                ],
            )
            .await?;
        orphanet_from_ols_response(&js)
    }
}

/// Lowercase with whitespace collapsed, for label equality.
fn match_form(s: &str) -> String {
    normalize_query(s).to_lowercase()
}

/// Exact (case-insensitive) label match among the hits, else the top hit.
fn pick_entity(js: &Value, label: &str) -> Result<Option<String>, LookupError> {
    let hits = match js.get("search") {
        Some(Value::Array(hits)) => hits,
        Some(Value::Null) | None => return Ok(None),
        Some(_) => {
            return Err(LookupError::Malformed {
                provider: WIKIDATA_SEARCH,
                detail: "'search' is not an array".to_string(),
            })
        }
    };

    let target = match_form(label);
    let id_of = |h: &Value| h.get("id").and_then(Value::as_str).map(str::to_string);

    let exact = hits.iter().find(|h| {
        h.get("label")
            .and_then(Value::as_str)
            .is_some_and(|l| match_form(l) == target)
    });

    Ok(exact.and_then(id_of).or_else(|| hits.first().and_then(id_of)))
}

/// First value of `P492` / `P1550` in `entities[qid].claims`.
fn ids_from_claims(js: &Value, qid: &str) -> Result<DiseaseIds, LookupError> {
    let claims = js
        .get("entities")
        .and_then(|e| e.get(qid))
        .ok_or_else(|| LookupError::Malformed {
            provider: WIKIDATA_CLAIMS,
            detail: format!("missing entity {qid}"),
        })?
        .get("claims");

    let first = |prop: &str| -> String {
        claims
            .and_then(|c| c.get(prop))
            .and_then(|p| p.get(0))
            .and_then(|s| s.pointer("/mainsnak/datavalue/value"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };

    Ok(DiseaseIds::from_raw(&first(PROP_OMIM), &first(PROP_ORPHANET)))
}

/// SPARQL selecting the OMIM / Orphanet IDs of an entity whose English
/// label equals `label`, ignoring case.
pub fn sparql_query(label: &str) -> String {
    let escaped = label.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        r#"SELECT ?omim ?orpha WHERE {{
  ?d rdfs:label ?label .
  FILTER(LANG(?label) = "en")
  FILTER(LCASE(STR(?label)) = LCASE("{escaped}"))
  OPTIONAL {{ ?d wdt:{PROP_OMIM} ?omim. }}
  OPTIONAL {{ ?d wdt:{PROP_ORPHANET} ?orpha. }}
}}
LIMIT 1"#
    )
}

fn ids_from_sparql(js: &Value) -> Result<Option<DiseaseIds>, LookupError> {
    let bindings = js
        .pointer("/results/bindings")
        .and_then(Value::as_array)
        .ok_or_else(|| LookupError::Malformed {
            provider: WIKIDATA_SPARQL,
            detail: "missing 'results.bindings'".to_string(),
        })?;

    let Some(row) = bindings.first() else {
        return Ok(None);
    };
    let value = |var: &str| {
        row.get(var)
            .and_then(|b| b.get("value"))
            .and_then(Value::as_str)
            .unwrap_or("")
    };
    let ids = DiseaseIds::from_raw(value("omim"), value("orpha"));
    Ok((!ids.is_empty()).then_some(ids))
}

/// Numeric Orphanet ID from the first hit's `obo_id` (`Orphanet_558`).
///
/// `obo_id` may be a single string or a list of strings.
fn orphanet_from_ols_response(js: &Value) -> Result<Option<String>, LookupError> {
    let response = js.get("response").ok_or_else(|| LookupError::Malformed {
        provider: OLS,
        detail: "missing 'response'".to_string(),
    })?;

    let found = response.get("numFound").and_then(Value::as_u64).unwrap_or(0);
    if found == 0 {
        return Ok(None);
    }
    let Some(doc) = response.get("docs").and_then(|d| d.get(0)) else {
        return Ok(None);
    };

    let candidates: Vec<&str> = match doc.get("obo_id") {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    Ok(candidates
        .into_iter()
        .find_map(|c| c.strip_prefix("Orphanet_").or_else(|| c.strip_prefix("Orphanet:")))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string))
}
