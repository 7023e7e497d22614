//! # case-extract
//!
//! Deterministic plumbing around clinical case-report extraction: rebuild the
//! tables a PDF table detector found, and resolve free-text references to
//! canonical identifiers (PubMed ID, OMIM, Orphanet).
//!
//! ## Why this crate?
//!
//! Document converters routinely truncate or garble tables, and the model
//! that reads the converted text cannot look up identifiers reliably. This
//! crate handles both sides without a model: raw detector tables are cleaned
//! and appended in full after the main text, and the identifier fields of
//! the extracted record are filled from public services with caching,
//! bounded retries and a fallback chain.
//!
//! ## Pipeline Overview
//!
//! ```text
//! raw detector tables          main text (converted elsewhere)
//!  │                             │
//!  ├─ 1. Tables    filter, merge, normalise, promote headers
//!  ├─ 2. Combine   case-report gate + full-table appendix ─▶ record extractor
//!  │                                                          │
//!  └──────────────────────────────── 3. Enrich   PubMed / Wikidata / OLS
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use case_extract::{ResolverConfig, Resolvers};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ResolverConfig::default();
//!     let resolvers = Resolvers::new(&config)?;
//!
//!     let pmid = resolvers.resolve_pmid("Phenylketonuria in an adult: a case report").await;
//!     let ids = resolvers.resolve_ids("Phenylketonuria").await;
//!     println!("PMID={pmid} OMIM={} Orphanet={}", ids.omim, ids.orphanet);
//!     Ok(())
//! }
//! ```
//!
//! Resolvers never fail: an empty string means "not found or unavailable".
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `case-extract` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! case-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod enrich;
pub mod error;
pub mod input;
pub mod progress;
pub mod record;
pub mod resolve;
pub mod tables;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Endpoints, ResolverConfig, ResolverConfigBuilder};
pub use enrich::{enrich_record, enrich_records};
pub use error::{ExtractError, LookupError};
pub use progress::{EnrichProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{combined_markdown, is_case_report, CaseRecord};
pub use resolve::{DiseaseIds, Resolvers};
pub use tables::{
    extract_tables, normalize_cell, normalize_cells, reconstruct, tables_appendix, ExtractedTable,
    NormalizedTable, RawPage, RawRow, RawTable,
};
