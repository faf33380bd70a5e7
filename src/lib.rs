//! Structured records from HTML tables whose header and body cells span rows
//! and columns.
//!
//! Header rows are mapped to column positions, turned into a nested field
//! template, and every body row fills that template after `colspan` values
//! are repeated and `rowspan` values carried into the rows beneath.

mod csv_out;
mod document;
mod error;
mod header;
mod layout;
mod merge;
mod model;
mod normalize;
mod options;
mod record;
mod table_parse;
mod warning;

use std::path::Path;

use serde::Serialize;

use crate::csv_out::{write_csv, write_csv_to_string};
use crate::merge::merge_tables;
use crate::model::MergedOutput;

pub use document::Document;
pub use error::ExtractError;
pub use model::{ColumnMap, ExtractedTable, HeaderCell, Layout, LayoutNode, PLACEHOLDER};
pub use normalize::{clean_text, normalize_label};
pub use options::{ExtractOptions, RowSelection, SpanMode};
pub use record::{Field, Record};
pub use warning::{ExtractWarning, WarningCode as ExtractWarningCode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    pub row_count: usize,
    pub table_count: usize,
    pub warnings: Vec<ExtractWarning>,
}

fn validate_options(options: &ExtractOptions) -> Result<(), ExtractError> {
    if !options.delimiter.is_ascii() || matches!(options.delimiter, b'"' | b'\n' | b'\r') {
        return Err(ExtractError::InvalidOption(format!(
            "delimiter {:?} cannot separate CSV fields",
            char::from(options.delimiter)
        )));
    }
    Ok(())
}

fn apply_output_column_filters(merged: MergedOutput, options: &ExtractOptions) -> MergedOutput {
    if !options.no_table {
        return merged;
    }

    let MergedOutput {
        mut headers,
        mut rows,
        row_count,
        table_count,
    } = merged;
    if headers.first().is_some_and(|header| header == "table_id") {
        headers.remove(0);
        for row in &mut rows {
            if !row.is_empty() {
                row.remove(0);
            }
        }
    }

    MergedOutput {
        headers,
        rows,
        row_count,
        table_count,
    }
}

fn extract_from_document(
    document: &Document,
    selector: &str,
    options: &ExtractOptions,
) -> Result<(Vec<ExtractedTable>, ExtractionReport), ExtractError> {
    let (tables, warnings) = if options.all_tables {
        document.extract_tables(selector, options)?
    } else {
        let (records, warnings) = document.extract_table_with(selector, options)?;
        (
            vec![ExtractedTable {
                table_id: 1,
                records,
            }],
            warnings,
        )
    };

    let report = ExtractionReport {
        row_count: tables.iter().map(|table| table.records.len()).sum(),
        table_count: tables.len(),
        warnings,
    };
    Ok((tables, report))
}

/// Extracts the table (or, with `all_tables`, every table) matching `selector`.
///
/// # Errors
/// Propagates selector, section and strict span errors from [`Document`].
pub fn extract_html(
    html: &str,
    selector: &str,
    options: &ExtractOptions,
) -> Result<(Vec<ExtractedTable>, ExtractionReport), ExtractError> {
    extract_from_document(&Document::parse(html), selector, options)
}

/// Like [`extract_html`] for undecoded input, honouring `options.encoding`.
///
/// # Errors
/// Propagates selector, section and strict span errors from [`Document`].
pub fn extract_html_bytes(
    input: &[u8],
    selector: &str,
    options: &ExtractOptions,
) -> Result<(Vec<ExtractedTable>, ExtractionReport), ExtractError> {
    let document = Document::from_bytes(input, options.encoding);
    extract_from_document(&document, selector, options)
}

/// Reads an HTML file and writes its table records as merged CSV.
///
/// # Errors
/// I/O and CSV errors, an unusable delimiter, or any extraction error.
pub fn extract_html_to_csv(
    input_html: &Path,
    output_csv: &Path,
    selector: &str,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    validate_options(options)?;

    let input = std::fs::read(input_html)?;
    let (tables, report) = extract_html_bytes(&input, selector, options)?;
    let merged = apply_output_column_filters(merge_tables(&tables), options);
    write_csv(output_csv, &merged, options.delimiter)?;
    Ok(report)
}

/// # Errors
/// An unusable delimiter or any extraction error.
pub fn extract_html_bytes_to_csv_string(
    input: &[u8],
    selector: &str,
    options: &ExtractOptions,
) -> Result<(String, ExtractionReport), ExtractError> {
    validate_options(options)?;

    let (tables, report) = extract_html_bytes(input, selector, options)?;
    let merged = apply_output_column_filters(merge_tables(&tables), options);
    let csv = write_csv_to_string(&merged, options.delimiter)?;
    Ok((csv, report))
}

/// Renders records as JSON: an array of records for a single table, or an
/// array of `{ table_id, records }` objects with `all_tables`.
///
/// # Errors
/// Any extraction error.
pub fn extract_html_bytes_to_json_string(
    input: &[u8],
    selector: &str,
    options: &ExtractOptions,
    pretty: bool,
) -> Result<(String, ExtractionReport), ExtractError> {
    let (tables, report) = extract_html_bytes(input, selector, options)?;

    let json = match (options.all_tables, pretty) {
        (true, true) => serde_json::to_string_pretty(&tables)?,
        (true, false) => serde_json::to_string(&tables)?,
        (false, pretty) => {
            let records = tables
                .into_iter()
                .next()
                .map(|table| table.records)
                .unwrap_or_default();
            if pretty {
                serde_json::to_string_pretty(&records)?
            } else {
                serde_json::to_string(&records)?
            }
        }
    };
    Ok((json, report))
}
