//! Table reconstruction: raw detector rows → [`NormalizedTable`].
//!
//! Steps (in order):
//! 1. Drop rows whose cells are all missing or whitespace
//! 2. Merge continuation rows into the first column of the previous row
//! 3. Pad rows to the widest row and normalise every cell
//! 4. Promote the first row to headers when it is mostly filled
//!
//! The continuation test is purely structural: a row whose cells after the
//! first are all missing or exactly empty is treated as the wrapped tail of
//! the previous row's first cell. A legitimate single-cell row following a
//! full row is merged too. Keep it that way; consumers rely on it.

use super::normalize::normalize_cell;
use super::{NormalizedTable, RawRow};

/// Reconstruct one raw table.
///
/// Returns `None` when no row survives the blank-row filter.
pub fn reconstruct(raw_table: &[RawRow]) -> Option<NormalizedTable> {
    let rows: Vec<&RawRow> = raw_table.iter().filter(|r| !is_blank_row(r)).collect();
    if rows.is_empty() {
        return None;
    }

    let merged = merge_continuations(&rows);
    let mut grid = normalize_grid(&merged);

    let headers = if grid.len() > 1 && should_promote_header(&grid[0]) {
        Some(grid.remove(0))
    } else {
        None
    };

    Some(NormalizedTable {
        headers,
        rows: grid,
    })
}

fn is_blank_row(row: &RawRow) -> bool {
    row.iter()
        .all(|c| c.as_deref().map_or(true, |s| s.trim().is_empty()))
}

/// Missing or exactly `""`; whitespace-only cells do not count.
fn is_empty_cell(cell: &Option<String>) -> bool {
    cell.as_deref().map_or(true, str::is_empty)
}

fn is_continuation(row: &RawRow) -> bool {
    row.iter().skip(1).all(is_empty_cell)
}

fn merge_continuations(rows: &[&RawRow]) -> Vec<RawRow> {
    let mut merged: Vec<RawRow> = Vec::with_capacity(rows.len());

    for row in rows {
        match merged.last_mut() {
            Some(last) if is_continuation(row) => {
                let tail = row.first().and_then(|c| c.as_deref()).unwrap_or("");
                match last.first_mut() {
                    Some(head) => {
                        let mut text = head.take().unwrap_or_default();
                        text.push(' ');
                        text.push_str(tail);
                        *head = Some(text);
                    }
                    None => last.push(Some(format!(" {tail}"))),
                }
            }
            _ => merged.push((*row).clone()),
        }
    }

    merged
}

/// Pad to the widest row, then normalise every cell.
fn normalize_grid(rows: &[RawRow]) -> Vec<Vec<String>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    rows.iter()
        .map(|row| {
            (0..width)
                .map(|i| normalize_cell(row.get(i).and_then(|c| c.as_deref())))
                .collect()
        })
        .collect()
}

/// Fewer than half of the cells are blank.
fn should_promote_header(first: &[String]) -> bool {
    let blank = first.iter().filter(|c| c.is_empty()).count();
    (blank as f64) < first.len() as f64 / 2.0
}
