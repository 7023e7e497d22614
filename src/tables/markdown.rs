//! GFM rendering of reconstructed tables.
//!
//! The rendered tables are appended after the main document text so the
//! downstream reader sees complete versions of tables the document converter
//! may have truncated.

use super::{ExtractedTable, NormalizedTable};

impl NormalizedTable {
    /// Render as a GitHub-flavoured Markdown pipe table.
    ///
    /// Positional tables get `0`, `1`, … as header cells.
    pub fn to_markdown(&self) -> String {
        let names = self.column_names();
        let width = names.len().max(1);

        let mut out = String::new();
        push_row(&mut out, &names, width);
        out.push('|');
        for _ in 0..width {
            out.push_str(" --- |");
        }
        out.push('\n');
        for row in &self.rows {
            push_row(&mut out, row, width);
        }
        out
    }
}

fn push_row(out: &mut String, cells: &[String], width: usize) {
    out.push('|');
    for i in 0..width {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        out.push(' ');
        out.push_str(&escape_cell(cell));
        out.push_str(" |");
    }
    out.push('\n');
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|")
}

/// Render every table as a `**Full Table i**` block, in document order.
///
/// Returns an empty string when there are no tables.
pub fn tables_appendix(tables: &[ExtractedTable]) -> String {
    tables
        .iter()
        .map(|t| format!("\n\n**Full Table {}**\n\n{}", t.index, t.table.to_markdown()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_promoted_headers() {
        let t = NormalizedTable {
            headers: Some(vec!["Name".into(), "Value".into()]),
            rows: vec![vec!["a".into(), "1".into()]],
        };
        assert_eq!(t.to_markdown(), "| Name | Value |\n| --- | --- |\n| a | 1 |\n");
    }

    #[test]
    fn renders_positional_headers() {
        let t = NormalizedTable {
            headers: None,
            rows: vec![vec!["a".into(), "b".into()]],
        };
        assert!(t.to_markdown().starts_with("| 0 | 1 |\n"));
    }

    #[test]
    fn escapes_pipes() {
        let t = NormalizedTable {
            headers: None,
            rows: vec![vec!["a|b".into()]],
        };
        assert!(t.to_markdown().contains("a\\|b"));
    }

    #[test]
    fn appendix_numbers_tables() {
        let table = NormalizedTable {
            headers: None,
            rows: vec![vec!["x".into()]],
        };
        let tables = vec![
            ExtractedTable { page: 1, index: 1, table: table.clone() },
            ExtractedTable { page: 3, index: 2, table },
        ];
        let md = tables_appendix(&tables);
        assert!(md.contains("**Full Table 1**"));
        assert!(md.contains("**Full Table 2**"));
        assert!(tables_appendix(&[]).is_empty());
    }
}
