//! Table reconstruction for tables detected on PDF pages.
//!
//! The PDF table detector is an external collaborator: it hands over, per
//! page, a list of raw tables, each a list of rows of optional text cells.
//! This module turns those into [`NormalizedTable`]s.
//!
//! ## Data Flow
//!
//! ```text
//! RawPage ──▶ RawTable ──▶ reconstruct ──▶ NormalizedTable ──▶ markdown
//!                          (filter, merge,                      (appendix)
//!                           normalise, header)
//! ```
//!
//! 1. [`normalize`]: clean a single cell (footnotes, ASCII folding, whitespace)
//! 2. [`reconstruct`]: blank-row filter, continuation merge, header promotion
//! 3. [`markdown`]: GFM rendering of reconstructed tables

pub mod markdown;
pub mod normalize;
pub mod reconstruct;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use markdown::tables_appendix;
pub use normalize::{normalize_cell, normalize_cells};
pub use reconstruct::reconstruct;

/// One detected row; cells are position-significant and may be missing.
pub type RawRow = Vec<Option<String>>;

/// One detected table region on one page.
pub type RawTable = Vec<RawRow>;

/// Every raw table detected on one page, in detection order.
pub type RawPage = Vec<RawTable>;

/// A reconstructed table: uniform-width rows of cleaned strings.
///
/// Every row has [`NormalizedTable::width`] cells and `headers` (when
/// present) has the same width. Blank rows are dropped on the raw cells,
/// before normalisation, so a row of footnote markers such as `["¹", "²"]`
/// survives as `["", ""]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTable {
    /// Column names when the first row was promoted; `None` means positional
    /// columns `0..width`.
    pub headers: Option<Vec<String>>,
    /// Data rows in encounter order.
    pub rows: Vec<Vec<String>>,
}

impl NormalizedTable {
    /// Number of columns.
    pub fn width(&self) -> usize {
        match &self.headers {
            Some(h) => h.len(),
            None => self.rows.first().map_or(0, Vec::len),
        }
    }

    /// Column identifiers: the promoted headers, or `"0"`, `"1"`, … .
    pub fn column_names(&self) -> Vec<String> {
        match &self.headers {
            Some(h) => h.clone(),
            None => (0..self.width()).map(|i| i.to_string()).collect(),
        }
    }
}

/// A reconstructed table plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// 1-based page number.
    pub page: usize,
    /// 1-based position among all tables of the document.
    pub index: usize,
    pub table: NormalizedTable,
}

/// Reconstruct every raw table of a document, page by page.
///
/// Tables that reconstruct to nothing are skipped without consuming an
/// index. `max_pages` stops after that many pages (`None` = all pages).
pub fn extract_tables(pages: &[RawPage], max_pages: Option<usize>) -> Vec<ExtractedTable> {
    let limit = max_pages.unwrap_or(usize::MAX);
    let mut out = Vec::new();

    for (page_idx, page) in pages.iter().enumerate().take(limit) {
        for raw in page {
            match reconstruct(raw) {
                Some(table) => {
                    out.push(ExtractedTable {
                        page: page_idx + 1,
                        index: out.len() + 1,
                        table,
                    });
                }
                None => debug!("Page {}: raw table had no surviving rows", page_idx + 1),
            }
        }
    }

    debug!("Extracted {} tables from {} pages", out.len(), pages.len().min(limit));
    out
}
