//! Input loading: read raw detector tables and case records from local files.
//!
//! Raw tables come from an external table detector as JSON, nested
//! pages → tables → rows → cells, where a cell is a string or `null`:
//!
//! ```json
//! [
//!   [ [["Name", "Value"], ["a", null]] ],
//!   []
//! ]
//! ```
//!
//! An object of the form `{"pages": [...]}` is accepted too. Numeric and
//! boolean cells are kept as their text form.
//!
//! Case records are read from a JSON array or from JSON Lines.

use crate::error::ExtractError;
use crate::record::CaseRecord;
use crate::tables::{RawPage, RawRow, RawTable};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Read a whole file as UTF-8, mapping I/O failures to [`ExtractError`].
pub fn read_text(path: &Path) -> Result<String, ExtractError> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            debug!("Read {} bytes from {}", text.len(), path.display());
            Ok(text)
        }
        Err(e) => Err(io_error(path, e)),
    }
}

fn io_error(path: &Path, e: std::io::Error) -> ExtractError {
    let path = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::NotFound => ExtractError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied { path },
        _ => ExtractError::InvalidInput {
            path,
            reason: e.to_string(),
        },
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> ExtractError {
    ExtractError::InvalidInput {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Load the raw tables of a document.
pub fn load_raw_pages(path: impl AsRef<Path>) -> Result<Vec<RawPage>, ExtractError> {
    let path = path.as_ref();
    let js: Value =
        serde_json::from_str(&read_text(path)?).map_err(|e| invalid(path, e.to_string()))?;
    let pages = parse_raw_pages(&js).map_err(|reason| invalid(path, reason))?;
    debug!(
        "Loaded {} pages / {} raw tables from {}",
        pages.len(),
        pages.iter().map(Vec::len).sum::<usize>(),
        path.display()
    );
    Ok(pages)
}

/// Convert a parsed JSON document into raw pages.
pub fn parse_raw_pages(js: &Value) -> Result<Vec<RawPage>, String> {
    let pages = match js {
        Value::Object(map) => map.get("pages").ok_or("expected a 'pages' key")?,
        other => other,
    };
    let pages = pages.as_array().ok_or("pages must be an array")?;

    pages
        .iter()
        .enumerate()
        .map(|(p, page)| {
            let tables = page
                .as_array()
                .ok_or_else(|| format!("page {} is not an array of tables", p + 1))?;
            tables
                .iter()
                .enumerate()
                .map(|(t, table)| {
                    parse_table(table)
                        .map_err(|e| format!("page {}, table {}: {}", p + 1, t + 1, e))
                })
                .collect::<Result<RawPage, String>>()
        })
        .collect()
}

fn parse_table(table: &Value) -> Result<RawTable, String> {
    let rows = table.as_array().ok_or("table is not an array of rows")?;
    rows.iter()
        .enumerate()
        .map(|(r, row)| {
            let cells = row
                .as_array()
                .ok_or_else(|| format!("row {} is not an array of cells", r + 1))?;
            cells
                .iter()
                .map(|c| cell_text(c).map_err(|e| format!("row {}: {}", r + 1, e)))
                .collect::<Result<RawRow, String>>()
        })
        .collect()
}

fn cell_text(cell: &Value) -> Result<Option<String>, String> {
    match cell {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        _ => Err("cell must be a string, number or null".to_string()),
    }
}

/// Load case records from a JSON array (or single object) or JSON Lines.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<CaseRecord>, ExtractError> {
    let path = path.as_ref();
    let text = read_text(path)?;
    let records = parse_records(&text).map_err(|reason| invalid(path, reason))?;
    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse records from text; JSON first, then JSON Lines.
pub fn parse_records(text: &str) -> Result<Vec<CaseRecord>, String> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| e.to_string());
    }
    if let Ok(one) = serde_json::from_str::<CaseRecord>(trimmed) {
        return Ok(vec![one]);
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| format!("line {}: {}", n + 1, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_pages_from_bare_array() {
        let js = json!([[[["Name", "Value"], ["a", null]]], []]);
        let pages = parse_raw_pages(&js).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0][0][1], vec![Some("a".to_string()), None]);
        assert!(pages[1].is_empty());
    }

    #[test]
    fn raw_pages_from_object_with_numbers() {
        let js = json!({"pages": [[[["n", 3]]]]});
        let pages = parse_raw_pages(&js).unwrap();
        assert_eq!(pages[0][0][0][1], Some("3".to_string()));
    }

    #[test]
    fn raw_pages_reject_nested_objects() {
        let js = json!([[[[{"x": 1}]]]]);
        let err = parse_raw_pages(&js).unwrap_err();
        assert!(err.contains("page 1, table 1"), "{err}");
    }

    #[test]
    fn records_from_array_object_and_lines() {
        let arr = r#"[{"Reference_title": "A"}, {"Reference_title": "B"}]"#;
        assert_eq!(parse_records(arr).unwrap().len(), 2);

        let one = r#"{"Reference_title": "A"}"#;
        assert_eq!(parse_records(one).unwrap()[0].reference_title, "A");

        let lines = "{\"Reference_title\": \"A\"}\n\n{\"Reference_title\": \"B\"}\n";
        let recs = parse_records(lines).unwrap();
        assert_eq!(recs[1].reference_title, "B");
    }

    #[test]
    fn bad_line_is_reported() {
        let err = parse_records("{\"Reference_title\": \"A\"}\nnot json\n").unwrap_err();
        assert!(err.starts_with("line 2"), "{err}");
    }

    #[test]
    fn missing_file_maps_to_file_not_found() {
        let err = load_raw_pages("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn malformed_file_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = load_raw_pages(&path).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidInput { .. }));
    }
}
