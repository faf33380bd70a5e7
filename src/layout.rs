use crate::model::{ColumnMap, HeaderCell, Layout, LayoutNode};
use crate::warning::{ExtractWarning, WarningCode};

#[derive(Debug, Clone, Copy)]
struct Ancestor<'a> {
    label: &'a str,
    start: usize,
}

struct LayoutBuilder<'a, 'w> {
    map: &'a ColumnMap,
    warnings: &'w mut Vec<ExtractWarning>,
    table_id: usize,
    unnamed: Vec<usize>,
}

/// Builds the nested field template for a table from its column map.
///
/// A header cell becomes a leaf when nothing labeled sits beneath its columns,
/// otherwise a group built from the header row under it. Spanning is read
/// from the cumulative column positions in the map. Columns with no label at
/// any depth and no labeled ancestor produce no field.
pub(crate) fn build_layout(
    map: &ColumnMap,
    warnings: &mut Vec<ExtractWarning>,
    table_id: usize,
) -> Layout {
    let mut builder = LayoutBuilder {
        map,
        warnings,
        table_id,
        unnamed: Vec::new(),
    };
    let root = if map.width == 0 {
        Vec::new()
    } else {
        builder.build_range(0, 1, map.width, None)
    };
    let unnamed = std::mem::take(&mut builder.unnamed);

    let layout = Layout {
        root,
        width: map.width,
    };

    if layout.is_empty() {
        warnings.push(
            ExtractWarning::new(
                WarningCode::NoHeaderFields,
                "header rows define no field names; records will be empty",
            )
            .with_table_id(table_id),
        );
    } else if let Some(&first) = unnamed.first() {
        let columns = unnamed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        warnings.push(
            ExtractWarning::new(
                WarningCode::UnnamedColumns,
                format!("columns {columns} have no header label; their values are dropped"),
            )
            .with_table_id(table_id)
            .with_column(first),
        );
    }

    layout
}

impl<'a> LayoutBuilder<'a, '_> {
    fn build_range(
        &mut self,
        row: usize,
        lo: usize,
        hi: usize,
        ancestor: Option<Ancestor<'a>>,
    ) -> Vec<(String, LayoutNode)> {
        let map = self.map;
        let mut fields = Vec::new();

        let Some(cells) = map.rows.get(row) else {
            for column in lo..=hi {
                match ancestor {
                    Some(parent) => self.push_field(
                        &mut fields,
                        format!("{}#{}", parent.label, column - parent.start),
                        LayoutNode::Placeholder { column: column - 1 },
                    ),
                    None => self.unnamed.push(column),
                }
            }
            return fields;
        };

        let mut next = lo;
        for cell in cells.iter().filter(|cell| (lo..=hi).contains(&cell.start())) {
            let start = cell.start();
            if start < next {
                continue;
            }
            if start > next {
                let gap = self.build_range(row + 1, next, start - 1, ancestor);
                self.extend_fields(&mut fields, gap);
            }

            let end = cell.col.min(hi);
            let node = self.build_cell(row, cell, start, end);
            self.push_field(&mut fields, cell.label.clone(), node);
            next = end + 1;
        }

        if next <= hi {
            let rest = self.build_range(row + 1, next, hi, ancestor);
            self.extend_fields(&mut fields, rest);
        }

        fields
    }

    fn build_cell(
        &mut self,
        row: usize,
        cell: &'a HeaderCell,
        start: usize,
        end: usize,
    ) -> LayoutNode {
        let below = row + cell.rows;
        let has_sub_labels = self
            .map
            .rows
            .iter()
            .skip(below)
            .flatten()
            .any(|sub| (start..=end).contains(&sub.start()));

        if !has_sub_labels {
            if start == end {
                return LayoutNode::Placeholder { column: start - 1 };
            }
            let leaves = (start..=end)
                .map(|column| {
                    (
                        format!("{}#{}", cell.label, column - start),
                        LayoutNode::Placeholder { column: column - 1 },
                    )
                })
                .collect();
            return LayoutNode::Group(leaves);
        }

        let parent = Ancestor {
            label: &cell.label,
            start,
        };
        LayoutNode::Group(self.build_range(below, start, end, Some(parent)))
    }

    fn extend_fields(
        &mut self,
        fields: &mut Vec<(String, LayoutNode)>,
        more: Vec<(String, LayoutNode)>,
    ) {
        for (label, node) in more {
            self.push_field(fields, label, node);
        }
    }

    fn push_field(
        &mut self,
        fields: &mut Vec<(String, LayoutNode)>,
        label: String,
        node: LayoutNode,
    ) {
        let taken = |key: &str| fields.iter().any(|(existing, _)| existing == key);
        if !taken(&label) {
            fields.push((label, node));
            return;
        }

        let mut suffix = 1;
        let key = loop {
            let candidate = format!("{label}#{suffix}");
            if !taken(&candidate) {
                break candidate;
            }
            suffix += 1;
        };
        self.warnings.push(
            ExtractWarning::new(
                WarningCode::DuplicateLabel,
                format!("duplicate header label '{label}' renamed to '{key}'"),
            )
            .with_table_id(self.table_id),
        );
        fields.push((key, node));
    }
}
