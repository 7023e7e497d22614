//! Integration tests for the resolvers against a local mockito server.
//!
//! Each test gets its own server and its own cache, so call counts
//! (`expect(n)`) measure exactly what reached the network.

use case_extract::config::Endpoints;
use case_extract::resolve::{MemoryCache, ResolutionCache};
use case_extract::{enrich_record, CaseRecord, DiseaseIds, ResolverConfig, Resolvers};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("case_extract=debug")
        .try_init();
}

fn config(server: &ServerGuard, cache_dir: Option<PathBuf>) -> ResolverConfig {
    ResolverConfig::builder()
        .max_retries(1)
        .retry_backoff_ms(1)
        .cache_dir(cache_dir)
        .endpoints(Endpoints::single_host(&server.url()))
        .build()
        .unwrap()
}

fn resolvers(server: &ServerGuard) -> (Resolvers, Arc<MemoryCache>) {
    init_tracing();
    let cache = Arc::new(MemoryCache::new());
    let shared: Arc<dyn ResolutionCache> = cache.clone();
    let r = Resolvers::with_cache(&config(server, None), shared).unwrap();
    (r, cache)
}

fn pubmed_mock(server: &mut ServerGuard, title: &str, body: serde_json::Value) -> Mock {
    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("db".into(), "pubmed".into()),
            Matcher::UrlEncoded("retmode".into(), "json".into()),
            Matcher::UrlEncoded("term".into(), format!("{title}[Title]")),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
}

fn search_mock(server: &mut ServerGuard, body: serde_json::Value) -> Mock {
    server
        .mock("GET", "/w/api.php")
        .match_query(Matcher::UrlEncoded("action".into(), "wbsearchentities".into()))
        .with_status(200)
        .with_body(body.to_string())
}

fn claims_mock(server: &mut ServerGuard, qid: &str, body: serde_json::Value) -> Mock {
    server
        .mock("GET", "/w/api.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("action".into(), "wbgetentities".into()),
            Matcher::UrlEncoded("ids".into(), qid.into()),
        ]))
        .with_status(200)
        .with_body(body.to_string())
}

fn sparql_mock(server: &mut ServerGuard, body: serde_json::Value) -> Mock {
    server
        .mock("POST", "/sparql")
        .match_header("accept", "application/sparql-results+json")
        .with_status(200)
        .with_body(body.to_string())
}

fn ols_mock(server: &mut ServerGuard, body: serde_json::Value) -> Mock {
    server
        .mock("GET", "/api/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("ontology".into(), "ordo".into()),
            Matcher::UrlEncoded("exact".into(), "true".into()),
        ]))
        .with_status(200)
        .with_body(body.to_string())
}

fn claims(omim: Option<&str>, orpha: Option<&str>) -> serde_json::Value {
    let mut c = serde_json::Map::new();
    if let Some(v) = omim {
        c.insert("P492".into(), json!([{"mainsnak": {"datavalue": {"value": v}}}]));
    }
    if let Some(v) = orpha {
        c.insert("P1550".into(), json!([{"mainsnak": {"datavalue": {"value": v}}}]));
    }
    json!({"entities": {"Q2": {"claims": c}}})
}

fn no_bindings() -> serde_json::Value {
    json!({"results": {"bindings": []}})
}

fn no_ols_hits() -> serde_json::Value {
    json!({"response": {"numFound": 0, "docs": []}})
}

// ── PubMed ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pmid_is_resolved_once_then_served_from_cache() {
    let mut server = Server::new_async().await;
    let m = pubmed_mock(
        &mut server,
        "Phenylketonuria in an adult",
        json!({"esearchresult": {"idlist": ["31415926"]}}),
    )
    .expect(1)
    .create_async()
    .await;

    let (r, _cache) = resolvers(&server);
    assert_eq!(r.resolve_pmid("Phenylketonuria in an adult").await, "31415926");
    // Same title after whitespace normalisation hits the cache.
    assert_eq!(r.resolve_pmid("  Phenylketonuria   in an adult ").await, "31415926");
    m.assert_async().await;
}

#[tokio::test]
async fn empty_title_makes_no_request() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (r, cache) = resolvers(&server);
    assert_eq!(r.resolve_pmid("").await, "");
    assert_eq!(r.resolve_pmid(" \n\t ").await, "");
    assert!(cache.is_empty());
    m.assert_async().await;
}

#[tokio::test]
async fn unknown_title_is_cached_as_empty() {
    let mut server = Server::new_async().await;
    let m = pubmed_mock(&mut server, "No such paper", json!({"esearchresult": {"idlist": []}}))
        .expect(1)
        .create_async()
        .await;

    let (r, _cache) = resolvers(&server);
    assert_eq!(r.resolve_pmid("No such paper").await, "");
    assert_eq!(r.resolve_pmid("No such paper").await, "");
    m.assert_async().await;
}

#[tokio::test]
async fn server_errors_degrade_to_empty_after_one_retry() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let (r, _cache) = resolvers(&server);
    assert_eq!(r.resolve_pmid("Anything").await, "");
    m.assert_async().await;
}

#[tokio::test]
async fn disk_cache_survives_a_new_resolver() {
    let mut server = Server::new_async().await;
    let m = pubmed_mock(&mut server, "Durable", json!({"esearchresult": {"idlist": ["7"]}}))
        .expect(1)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();

    for _ in 0..2 {
        let r = Resolvers::new(&config(&server, Some(dir.path().to_path_buf()))).unwrap();
        assert_eq!(r.resolve_pmid("Durable").await, "7");
    }
    m.assert_async().await;
}

// `/proc/self` exists but refuses new files, so the resolver must fall back
// to the in-memory cache rather than silently caching nothing.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn read_only_cache_dir_still_caches_in_memory() {
    let mut server = Server::new_async().await;
    let m = pubmed_mock(&mut server, "Durable", json!({"esearchresult": {"idlist": ["7"]}}))
        .expect(1)
        .create_async()
        .await;

    let r = Resolvers::new(&config(&server, Some(PathBuf::from("/proc/self")))).unwrap();
    assert_eq!(r.resolve_pmid("Durable").await, "7");
    assert_eq!(r.resolve_pmid("Durable").await, "7");
    m.assert_async().await;
}

// ── Disease identifiers ──────────────────────────────────────────────────────

#[tokio::test]
async fn claims_answer_both_ids_without_fallbacks() {
    let mut server = Server::new_async().await;
    let search = search_mock(
        &mut server,
        json!({"search": [
            {"id": "Q9", "label": "Phenylketonuria, atypical"},
            {"id": "Q2", "label": "phenylketonuria"}
        ]}),
    )
    .expect(1)
    .create_async()
    .await;
    let claims = claims_mock(&mut server, "Q2", claims(Some("261600"), Some("716")))
        .expect(1)
        .create_async()
        .await;
    let sparql = sparql_mock(&mut server, no_bindings())
        .expect(0)
        .create_async()
        .await;
    let ols = ols_mock(&mut server, no_ols_hits())
        .expect(0)
        .create_async()
        .await;

    let (r, _cache) = resolvers(&server);
    let ids = r.resolve_ids("Phenylketonuria").await;
    assert_eq!(
        ids,
        DiseaseIds {
            omim: "OMIM:261600".into(),
            orphanet: "Orphanet:716".into()
        }
    );

    search.assert_async().await;
    claims.assert_async().await;
    sparql.assert_async().await;
    ols.assert_async().await;
}

#[tokio::test]
async fn sparql_fills_only_the_missing_field() {
    let mut server = Server::new_async().await;
    let _search = search_mock(&mut server, json!({"search": [{"id": "Q2", "label": "X"}]}))
        .create_async()
        .await;
    let _claims = claims_mock(&mut server, "Q2", claims(Some("111111"), None))
        .create_async()
        .await;
    let _sparql = sparql_mock(
        &mut server,
        json!({"results": {"bindings": [{
            "omim": {"value": "999999"},
            "orpha": {"value": "222"}
        }]}}),
    )
    .create_async()
    .await;
    let ols = ols_mock(&mut server, no_ols_hits())
        .expect(0)
        .create_async()
        .await;

    let (r, _cache) = resolvers(&server);
    let ids = r.resolve_ids("X").await;
    assert_eq!(ids.omim, "OMIM:111111");
    assert_eq!(ids.orphanet, "Orphanet:222");
    ols.assert_async().await;
}

#[tokio::test]
async fn ols_supplies_orphanet_when_wikidata_has_nothing() {
    let mut server = Server::new_async().await;
    let _search = search_mock(&mut server, json!({"search": []}))
        .create_async()
        .await;
    let _sparql = sparql_mock(&mut server, no_bindings()).create_async().await;
    let ols = ols_mock(
        &mut server,
        json!({"response": {"numFound": 1, "docs": [{"obo_id": ["Orphanet_79254"]}]}}),
    )
    .expect(1)
    .create_async()
    .await;

    let (r, _cache) = resolvers(&server);
    let ids = r.resolve_ids("Hyperphenylalaninemia").await;
    assert_eq!(ids.omim, "");
    assert_eq!(ids.orphanet, "Orphanet:79254");
    ols.assert_async().await;
}

#[tokio::test]
async fn unknown_disease_is_an_empty_pair_and_is_cached() {
    let mut server = Server::new_async().await;
    let search = search_mock(&mut server, json!({"search": []}))
        .expect(1)
        .create_async()
        .await;
    let sparql = sparql_mock(&mut server, no_bindings())
        .expect(1)
        .create_async()
        .await;
    let ols = ols_mock(&mut server, no_ols_hits())
        .expect(1)
        .create_async()
        .await;

    let (r, _cache) = resolvers(&server);
    for _ in 0..3 {
        assert_eq!(r.resolve_ids("Nonexistentitis").await, DiseaseIds::default());
    }
    search.assert_async().await;
    sparql.assert_async().await;
    ols.assert_async().await;
}

#[tokio::test]
async fn every_provider_failing_yields_empty_pair() {
    let mut server = Server::new_async().await;
    let _get = server
        .mock("GET", Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let _post = server
        .mock("POST", Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let (r, _cache) = resolvers(&server);
    assert_eq!(r.resolve_ids("Phenylketonuria").await, DiseaseIds::default());
}

#[tokio::test]
async fn empty_disease_label_makes_no_request() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (r, _cache) = resolvers(&server);
    assert_eq!(r.resolve_ids("   ").await, DiseaseIds::default());
    m.assert_async().await;
}

// ── Cache namespaces and enrichment ──────────────────────────────────────────

#[tokio::test]
async fn same_text_in_both_namespaces_does_not_collide() {
    let mut server = Server::new_async().await;
    let pm = pubmed_mock(
        &mut server,
        "Gaucher disease",
        json!({"esearchresult": {"idlist": ["42"]}}),
    )
    .expect(1)
    .create_async()
    .await;
    let search = search_mock(
        &mut server,
        json!({"search": [{"id": "Q2", "label": "Gaucher disease"}]}),
    )
    .expect(1)
    .create_async()
    .await;
    let _claims = claims_mock(&mut server, "Q2", claims(Some("230800"), Some("355")))
        .create_async()
        .await;

    let (r, cache) = resolvers(&server);
    assert_eq!(r.resolve_pmid("Gaucher disease").await, "42");
    let ids = r.resolve_ids("Gaucher disease").await;
    assert_eq!(ids.omim, "OMIM:230800");
    assert_eq!(r.resolve_pmid("Gaucher disease").await, "42");
    assert_eq!(cache.len(), 2);

    pm.assert_async().await;
    search.assert_async().await;
}

#[tokio::test]
async fn enrich_record_fills_identifiers() {
    let mut server = Server::new_async().await;
    let _pm = pubmed_mock(
        &mut server,
        "A case of PKU",
        json!({"esearchresult": {"idlist": ["5"]}}),
    )
    .create_async()
    .await;
    let _search = search_mock(&mut server, json!({"search": [{"id": "Q2", "label": "PKU"}]}))
        .create_async()
        .await;
    let _claims = claims_mock(&mut server, "Q2", claims(Some("261600"), Some("716")))
        .create_async()
        .await;

    let (r, _cache) = resolvers(&server);
    let record = CaseRecord {
        reference_title: "A case of PKU".into(),
        underlying_disease: "PKU".into(),
        source_file: "pku.pdf".into(),
        ..Default::default()
    };
    let out = enrich_record(&r, record).await;
    assert_eq!(out.pubmed_id, "5");
    assert_eq!(out.omim, "OMIM:261600");
    assert_eq!(out.orphanet, "Orphanet:716");
    assert_eq!(out.source_file, "pku.pdf");
}
