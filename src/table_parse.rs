use std::collections::BTreeMap;

use crate::error::ExtractError;
use crate::model::{Layout, LayoutNode, RawCell};
use crate::options::{ExtractOptions, SpanMode};
use crate::record::{Field, Record};
use crate::warning::{ExtractWarning, WarningCode};

/// A body `<tr>`; `group` is the index of the `<tbody>` it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BodyRow {
    pub(crate) group: usize,
    pub(crate) cells: Vec<RawCell>,
}

#[derive(Debug, Clone)]
struct Carry {
    value: String,
    rows_left: usize,
}

/// Expands body rows into per-column values, carrying `rowspan` values down.
#[derive(Debug, Default)]
pub(crate) struct RowExpander {
    carry: BTreeMap<usize, Carry>,
}

impl RowExpander {
    pub(crate) fn reset(&mut self) {
        self.carry.clear();
    }

    pub(crate) fn expand(&mut self, cells: &[RawCell]) -> Vec<String> {
        let mut values: Vec<String> = Vec::new();
        let mut pending = Vec::new();
        let mut cells = cells.iter();

        loop {
            if let Some(carry) = self.carry.get(&values.len()) {
                values.push(carry.value.clone());
                continue;
            }
            let Some(cell) = cells.next() else {
                break;
            };
            for _ in 0..cell.colspan {
                if cell.rowspan > 1 {
                    pending.push((
                        values.len(),
                        Carry {
                            value: cell.value.clone(),
                            rows_left: cell.rowspan - 1,
                        },
                    ));
                }
                values.push(cell.value.clone());
            }
        }

        // Carried columns to the right of a short row; the gap stays empty.
        let trailing = self
            .carry
            .range(values.len()..)
            .map(|(&position, carry)| (position, carry.value.clone()))
            .collect::<Vec<_>>();
        for (position, value) in trailing {
            values.resize(position, String::new());
            values.push(value);
        }

        for carry in self.carry.values_mut() {
            carry.rows_left -= 1;
        }
        self.carry.retain(|_, carry| carry.rows_left > 0);
        self.carry.extend(pending);

        values
    }
}

pub(crate) fn fill_layout(layout: &Layout, values: &[String]) -> Record {
    fill_group(layout.fields(), values)
}

fn fill_group(fields: &[(String, LayoutNode)], values: &[String]) -> Record {
    let mut record = Record::default();
    for (key, node) in fields {
        let field = match node {
            LayoutNode::Placeholder { column } => {
                Field::Value(values.get(*column).cloned().unwrap_or_default())
            }
            LayoutNode::Group(children) => Field::Group(fill_group(children, values)),
        };
        record.push(key.clone(), field);
    }
    record
}

/// Turns body rows into records. The first `skip` rows and rows outside
/// `options.rows` emit nothing but still carry their vertical spans.
pub(crate) fn extract_rows(
    rows: &[BodyRow],
    layout: &Layout,
    skip: usize,
    options: &ExtractOptions,
    warnings: &mut Vec<ExtractWarning>,
    table_id: usize,
) -> Result<Vec<Record>, ExtractError> {
    let mut expander = RowExpander::default();
    let mut group = None;
    let mut records = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        if group != Some(row.group) {
            expander.reset();
            group = Some(row.group);
        }

        let values = expander.expand(&row.cells);
        if index < skip {
            continue;
        }
        let number = index - skip + 1;
        if options
            .rows
            .as_ref()
            .is_some_and(|selection| !selection.contains(number))
        {
            continue;
        }

        if values.is_empty() {
            warnings.push(
                ExtractWarning::new(WarningCode::EmptyRow, "skipping body row without cells")
                    .with_table_id(table_id)
                    .with_row(number),
            );
            continue;
        }

        if values.len() != layout.width() {
            match options.span_mode {
                SpanMode::Strict => {
                    return Err(ExtractError::SpanMismatch {
                        row: number,
                        expected: layout.width(),
                        found: values.len(),
                    });
                }
                SpanMode::BestEffort => warnings.push(
                    ExtractWarning::new(
                        WarningCode::SpanMismatch,
                        format!(
                            "row expands to {} values for {} header columns",
                            values.len(),
                            layout.width()
                        ),
                    )
                    .with_table_id(table_id)
                    .with_row(number),
                ),
            }
        }

        records.push(fill_layout(layout, &values));
    }

    Ok(records)
}
