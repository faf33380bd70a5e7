use std::collections::BTreeSet;

use crate::model::{ColumnMap, HeaderCell, RawCell};
use crate::normalize::normalize_label;

const LOW_CONFIDENCE_THRESHOLD: f32 = 0.55;

fn is_numeric(value: &str) -> bool {
    let trimmed = value.trim().replace(',', "");
    trimmed.parse::<f64>().is_ok()
}

fn non_numeric_ratio(cells: &[RawCell]) -> f32 {
    if cells.is_empty() {
        return 0.0;
    }

    let non_numeric = cells.iter().filter(|cell| !is_numeric(&cell.text)).count();
    non_numeric as f32 / cells.len() as f32
}

/// Number of leading rows that form the header of a table without `<thead>`:
/// the run of rows made only of `<th>` cells, or just the first row.
pub(crate) fn infer_header_rows<'a>(rows: impl IntoIterator<Item = &'a [RawCell]>) -> usize {
    let mut total = 0;
    let mut th_rows = 0;
    let mut leading = true;
    for row in rows {
        total += 1;
        if leading && !row.is_empty() && row.iter().all(|cell| cell.header) {
            th_rows += 1;
        } else {
            leading = false;
        }
    }

    if total == 0 {
        0
    } else if th_rows == 0 || th_rows == total {
        1
    } else {
        th_rows
    }
}

/// How much an inferred header row looks like a header rather than data.
pub(crate) fn header_confidence(header: &[RawCell], first_body: Option<&[RawCell]>) -> f32 {
    let first = non_numeric_ratio(header);
    let second = first_body.map_or(0.0, non_numeric_ratio);
    (first * 0.6 + (1.0 - second) * 0.4).clamp(0.0, 1.0)
}

pub(crate) fn is_low_confidence(confidence: f32) -> bool {
    confidence < LOW_CONFIDENCE_THRESHOLD
}

/// Resolves header rows into positioned, labeled cells.
///
/// Columns held by a `rowspan` from an earlier header row are skipped before a
/// cell is placed, so cells after a vertically spanning cell keep their
/// column. The bookkeeping is virtual; nothing is written back to the document.
pub(crate) fn map_columns(rows: &[Vec<RawCell>]) -> ColumnMap {
    let depth = rows.len();
    let mut occupied: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); depth];
    let mut map = ColumnMap::default();

    for (row, cells) in rows.iter().enumerate() {
        let mut total_cols = 0;
        let mut mapped = Vec::new();

        for cell in cells {
            while occupied[row].contains(&(total_cols + 1)) {
                total_cols += 1;
            }
            let start = total_cols + 1;
            total_cols += cell.colspan;

            let rows_covered = cell.rowspan.min(depth - row);
            for below in occupied.iter_mut().skip(row + 1).take(rows_covered - 1) {
                below.extend(start..=total_cols);
            }

            let label = normalize_label(&cell.text);
            if label.is_empty() {
                continue;
            }
            mapped.push(HeaderCell {
                row: row + 1,
                col: total_cols,
                span: cell.colspan,
                rows: rows_covered,
                label,
            });
        }

        let trailing = occupied[row].last().copied().unwrap_or(0);
        map.width = map.width.max(total_cols).max(trailing);
        map.rows.push(mapped);
    }

    map
}
