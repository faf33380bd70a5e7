use std::collections::HashMap;

use crate::model::{ExtractedTable, MergedOutput};

/// Flattens records of every table onto one column schema: `table_id`, then
/// each dotted field path in the order it is first seen.
pub(crate) fn merge_tables(tables: &[ExtractedTable]) -> MergedOutput {
    let mut headers = vec!["table_id".to_string()];
    let mut index_of: HashMap<String, usize> = HashMap::new();
    let mut flattened = Vec::new();

    for table in tables {
        for record in &table.records {
            let fields = record.flatten();
            for (path, _) in &fields {
                if !index_of.contains_key(path) {
                    index_of.insert(path.clone(), headers.len());
                    headers.push(path.clone());
                }
            }
            flattened.push((table.table_id, fields));
        }
    }

    let rows = flattened
        .into_iter()
        .map(|(table_id, fields)| {
            let mut row = vec![String::new(); headers.len()];
            row[0] = table_id.to_string();
            for (path, value) in fields {
                if let Some(&index) = index_of.get(&path) {
                    row[index] = value;
                }
            }
            row
        })
        .collect::<Vec<_>>();

    MergedOutput {
        headers,
        row_count: rows.len(),
        table_count: tables.len(),
        rows,
    }
}
