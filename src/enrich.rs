//! Fill a record's identifier fields from the external resolvers.
//!
//! `Reference_title` drives the PubMed lookup and `Underlying_disease` the
//! OMIM / Orphanet lookup. A resolved value replaces the field; an empty
//! resolution leaves whatever the record already carried.

use crate::progress::ProgressCallback;
use crate::record::CaseRecord;
use crate::resolve::Resolvers;
use futures::stream::{self, StreamExt};
use tracing::info;

/// Enrich one record. Both lookups run concurrently.
pub async fn enrich_record(resolvers: &Resolvers, record: CaseRecord) -> CaseRecord {
    enrich_one(resolvers, record).await.0
}

/// Enrich a batch with at most `concurrency` records in flight.
///
/// Output order matches input order.
pub async fn enrich_records(
    resolvers: &Resolvers,
    records: Vec<CaseRecord>,
    concurrency: usize,
    progress: Option<ProgressCallback>,
) -> Vec<CaseRecord> {
    let total = records.len();
    if let Some(ref cb) = progress {
        cb.on_enrich_start(total);
    }

    let results: Vec<(CaseRecord, bool)> = stream::iter(records.into_iter().enumerate().map(
        |(index, record)| {
            let progress = progress.clone();
            async move {
                if let Some(ref cb) = progress {
                    cb.on_record_start(index, total);
                }
                let result = enrich_one(resolvers, record).await;
                if let Some(ref cb) = progress {
                    cb.on_record_complete(index, total);
                }
                result
            }
        },
    ))
    .buffered(concurrency.max(1))
    .collect()
    .await;

    let resolved = results.iter().filter(|(_, hit)| *hit).count();
    info!("Enriched {} records ({} gained an identifier)", total, resolved);
    if let Some(ref cb) = progress {
        cb.on_enrich_complete(total, resolved);
    }

    results.into_iter().map(|(record, _)| record).collect()
}

/// Returns the enriched record and whether any lookup produced a value.
async fn enrich_one(resolvers: &Resolvers, mut record: CaseRecord) -> (CaseRecord, bool) {
    let (pmid, ids) = tokio::join!(
        resolvers.resolve_pmid(&record.reference_title),
        resolvers.resolve_ids(&record.underlying_disease),
    );

    let mut hit = false;
    for (field, value) in [
        (&mut record.pubmed_id, pmid),
        (&mut record.omim, ids.omim),
        (&mut record.orphanet, ids.orphanet),
    ] {
        if !value.is_empty() {
            *field = value;
            hit = true;
        }
    }
    (record, hit)
}
