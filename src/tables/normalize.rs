//! Cell normalisation: deterministic cleanup of one extracted table cell.
//!
//! Rules (applied in order, per cell):
//! 1. Strip a trailing run of superscript digits (footnote markers such as
//!    `12.5¹` or `value²³`), together with the whitespace around it
//! 2. Fold the remaining text to its closest ASCII spelling (`α` → `a`)
//! 3. Collapse every whitespace run to one space and trim the ends
//!
//! A missing cell is treated as the empty string.

use once_cell::sync::Lazy;
use regex::Regex;

/// Normalise every cell of one column (or row) in order.
///
/// The output always has the same length as the input.
pub fn normalize_cells<S: AsRef<str>>(cells: &[Option<S>]) -> Vec<String> {
    cells
        .iter()
        .map(|c| normalize_cell(c.as_ref().map(AsRef::as_ref)))
        .collect()
}

/// Normalise a single cell.
pub fn normalize_cell(cell: Option<&str>) -> String {
    let s = strip_footnote_markers(cell.unwrap_or(""));
    let s = fold_to_ascii(&s);
    collapse_whitespace(&s)
}

// ── Rule 1: Footnote markers ─────────────────────────────────────────────────

// ¹ ² ³ and the U+2070 block (⁰ ⁴ … ⁹).
static RE_FOOTNOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:[\u{00B9}\u{00B2}\u{00B3}\u{2070}-\u{2079}])+\s*$").unwrap());

fn strip_footnote_markers(input: &str) -> String {
    RE_FOOTNOTE.replace(input, "").into_owned()
}

// ── Rule 2: ASCII folding ────────────────────────────────────────────────────

/// Characters without a transliteration are dropped.
fn fold_to_ascii(input: &str) -> String {
    if input.is_ascii() {
        return input.to_string();
    }
    deunicode::deunicode_with_tofu(input, "")
}

// ── Rule 3: Whitespace ───────────────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse whitespace runs (newlines included) to one space and trim.
pub fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_single_superscript() {
        assert_eq!(normalize_cell(Some("12.5¹")), "12.5");
    }

    #[test]
    fn strips_superscript_run_with_space() {
        assert_eq!(normalize_cell(Some("value ²³")), "value");
        assert_eq!(normalize_cell(Some("value²³")), "value");
        assert_eq!(normalize_cell(Some("n⁴⁵ ")), "n");
    }

    #[test]
    fn keeps_inner_superscripts() {
        // Only a trailing run is a footnote marker.
        assert_eq!(strip_footnote_markers("10³ cells/L"), "10³ cells/L");
    }

    #[test]
    fn folds_greek_and_accents() {
        assert_eq!(normalize_cell(Some("α-thalassemia")), "a-thalassemia");
        assert_eq!(normalize_cell(Some("Café")), "Cafe");
    }

    #[test]
    fn collapses_wrapped_lines() {
        assert_eq!(
            normalize_cell(Some("  elevated\nplasma   \t phenylalanine ")),
            "elevated plasma phenylalanine"
        );
    }

    #[test]
    fn missing_cell_is_empty() {
        assert_eq!(normalize_cell(None), "");
    }

    #[test]
    fn sequence_preserves_length_and_order() {
        let cells = vec![Some("a "), None, Some("\n"), Some("b²")];
        assert_eq!(normalize_cells(&cells), vec!["a", "", "", "b"]);
    }

    #[test]
    fn output_never_has_double_or_edge_whitespace() {
        let samples = [
            " a  b ",
            "\u{00A0}x\u{00A0}\u{00A0}y",
            "µg/dL ¹",
            "line1\r\n\r\nline2",
            "",
            "   ",
        ];
        for s in samples {
            let out = normalize_cell(Some(s));
            assert_eq!(out, out.trim(), "edge whitespace in {out:?}");
            assert!(!out.contains("  "), "double space in {out:?}");
            assert!(out.is_ascii(), "non-ascii in {out:?}");
        }
    }
}
