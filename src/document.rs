//! Parsed HTML and the table queries the extractor needs from it.
//!
//! Everything is read out of the `scraper` tree into owned [`RawCell`]s before
//! the header mapper, layout builder and row extractor run, so the document is
//! never modified and can be queried for several tables.

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ExtractError;
use crate::header::{header_confidence, infer_header_rows, is_low_confidence, map_columns};
use crate::layout::build_layout;
use crate::model::{ColumnMap, ExtractedTable, Layout, RawCell};
use crate::normalize::clean_text;
use crate::options::ExtractOptions;
use crate::record::Record;
use crate::table_parse::{BodyRow, extract_rows};
use crate::warning::{ExtractWarning, WarningCode};

// Same limits browsers apply.
const MAX_COLSPAN: usize = 1000;
const MAX_ROWSPAN: usize = 65534;

static IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("hardcoded image selector is valid"));

pub struct Document {
    html: Html,
}

struct Sections {
    header: Vec<Vec<RawCell>>,
    body: Vec<BodyRow>,
    skip: usize,
}

impl Document {
    #[must_use]
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// Decodes raw bytes before parsing. A byte order mark wins over
    /// `encoding`, which wins over the UTF-8 default.
    #[must_use]
    pub fn from_bytes(bytes: &[u8], encoding: Option<&'static Encoding>) -> Self {
        let (text, used, had_errors) = encoding.unwrap_or(UTF_8).decode(bytes);
        if had_errors {
            tracing::warn!(
                encoding = used.name(),
                "input contains malformed byte sequences; they were replaced"
            );
        }
        Self::parse(&text)
    }

    /// All elements matching a CSS selector, in document order.
    ///
    /// # Errors
    /// Returns [`ExtractError::InvalidSelector`] when the selector does not parse.
    pub fn select(&self, selector: &str) -> Result<Vec<ElementRef<'_>>, ExtractError> {
        let parsed = parse_selector(selector)?;
        Ok(self.html.select(&parsed).collect())
    }

    /// Extracts the first table matching `selector` with default options.
    ///
    /// Without a `<thead>`, `skip_rows` is the number of leading rows that form
    /// the header (`None` or `0` infers it); with one, it drops leading body rows.
    ///
    /// # Errors
    /// Fails when the selector is invalid, matches nothing, matches a
    /// non-table element, or the table has no `<tbody>`.
    pub fn extract_table(
        &self,
        selector: &str,
        skip_rows: Option<usize>,
    ) -> Result<Vec<Record>, ExtractError> {
        let options = ExtractOptions {
            skip_rows: skip_rows.unwrap_or(0),
            ..ExtractOptions::default()
        };
        self.extract_table_with(selector, &options)
            .map(|(records, _)| records)
    }

    /// Extracts the first table matching `selector`, returning its warnings.
    ///
    /// # Errors
    /// See [`Document::extract_table`]; strict span mode adds
    /// [`ExtractError::SpanMismatch`].
    pub fn extract_table_with(
        &self,
        selector: &str,
        options: &ExtractOptions,
    ) -> Result<(Vec<Record>, Vec<ExtractWarning>), ExtractError> {
        let table = self.first_match(selector)?;
        let mut warnings = Vec::new();
        let records = extract_from_element(table, selector, 1, options, &mut warnings)?;
        Ok((records, warnings))
    }

    /// Extracts every table matching `selector`.
    ///
    /// # Errors
    /// See [`Document::extract_table_with`]; the first failing table aborts.
    pub fn extract_tables(
        &self,
        selector: &str,
        options: &ExtractOptions,
    ) -> Result<(Vec<ExtractedTable>, Vec<ExtractWarning>), ExtractError> {
        let matches = self.select(selector)?;
        if matches.is_empty() {
            return Err(ExtractError::NoTableFound {
                selector: selector.to_string(),
            });
        }

        let mut warnings = Vec::new();
        let mut tables = Vec::with_capacity(matches.len());
        for (index, table) in matches.into_iter().enumerate() {
            let table_id = index + 1;
            let records = extract_from_element(table, selector, table_id, options, &mut warnings)?;
            tables.push(ExtractedTable { table_id, records });
        }
        Ok((tables, warnings))
    }

    /// The field template of the first table matching `selector`.
    ///
    /// # Errors
    /// Same section errors as [`Document::extract_table`].
    pub fn layout(&self, selector: &str, options: &ExtractOptions) -> Result<Layout, ExtractError> {
        let table = self.first_match(selector)?;
        let mut warnings = Vec::new();
        let (layout, _) = prepare(table, selector, 1, options, &mut warnings)?;
        Ok(layout)
    }

    /// Header cells of the first table matching `selector` with their
    /// resolved column positions.
    ///
    /// # Errors
    /// Same section errors as [`Document::extract_table`].
    pub fn column_map(
        &self,
        selector: &str,
        options: &ExtractOptions,
    ) -> Result<ColumnMap, ExtractError> {
        let table = self.first_match(selector)?;
        ensure_table(table, selector)?;
        let sections = resolve_sections(table, selector, 1, options, &mut Vec::new())?;
        Ok(map_columns(&sections.header))
    }

    fn first_match(&self, selector: &str) -> Result<ElementRef<'_>, ExtractError> {
        self.select(selector)?
            .into_iter()
            .next()
            .ok_or_else(|| ExtractError::NoTableFound {
                selector: selector.to_string(),
            })
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|error| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        reason: error.to_string(),
    })
}

fn extract_from_element(
    table: ElementRef<'_>,
    selector: &str,
    table_id: usize,
    options: &ExtractOptions,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Vec<Record>, ExtractError> {
    let (layout, sections) = prepare(table, selector, table_id, options, warnings)?;
    let records = extract_rows(
        &sections.body,
        &layout,
        sections.skip,
        options,
        warnings,
        table_id,
    )?;
    tracing::debug!(table_id, records = records.len(), "extracted table rows");
    Ok(records)
}

fn prepare(
    table: ElementRef<'_>,
    selector: &str,
    table_id: usize,
    options: &ExtractOptions,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<(Layout, Sections), ExtractError> {
    ensure_table(table, selector)?;
    let sections = resolve_sections(table, selector, table_id, options, warnings)?;
    let map = map_columns(&sections.header);
    let layout = build_layout(&map, warnings, table_id);
    tracing::debug!(
        table_id,
        header_rows = sections.header.len(),
        body_rows = sections.body.len(),
        width = layout.width(),
        fields = layout.placeholder_count(),
        "built table layout"
    );
    Ok((layout, sections))
}

fn ensure_table(element: ElementRef<'_>, selector: &str) -> Result<(), ExtractError> {
    let tag = element.value().name();
    if tag == "table" {
        Ok(())
    } else {
        Err(ExtractError::NotATable {
            selector: selector.to_string(),
            tag: tag.to_string(),
        })
    }
}

fn resolve_sections(
    table: ElementRef<'_>,
    selector: &str,
    table_id: usize,
    options: &ExtractOptions,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Sections, ExtractError> {
    let mut has_tbody = false;
    let mut body = Vec::new();
    for (group, tbody) in child_elements(table, "tbody").enumerate() {
        has_tbody = true;
        body.extend(
            read_rows(tbody, options)
                .into_iter()
                .map(|cells| BodyRow { group, cells }),
        );
    }
    if !has_tbody {
        return Err(ExtractError::NoBody {
            selector: selector.to_string(),
        });
    }

    let thead = child_elements(table, "thead")
        .next()
        .map(|thead| read_rows(thead, options))
        .filter(|rows| !rows.is_empty());
    if let Some(header) = thead {
        return Ok(Sections {
            header,
            body,
            skip: options.skip_rows,
        });
    }

    let count = if options.skip_rows > 0 {
        options.skip_rows
    } else {
        infer_header_rows(body.iter().map(|row| row.cells.as_slice()))
    };
    let header = body
        .drain(..count.min(body.len()))
        .map(|row| row.cells)
        .collect::<Vec<_>>();

    let all_th = header.iter().flatten().all(|cell| cell.header);
    if options.skip_rows == 0 && !all_th {
        if let Some(first) = header.first() {
            let confidence = header_confidence(first, body.first().map(|row| row.cells.as_slice()));
            if is_low_confidence(confidence) {
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::HeaderInferenceLowConfidence,
                        format!(
                            "first row used as header looks like data (confidence={confidence:.2})"
                        ),
                    )
                    .with_table_id(table_id),
                );
            }
        }
    }

    Ok(Sections {
        header,
        body,
        skip: 0,
    })
}

fn child_elements<'a>(
    parent: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == name)
}

fn read_rows(section: ElementRef<'_>, options: &ExtractOptions) -> Vec<Vec<RawCell>> {
    child_elements(section, "tr")
        .map(|row| {
            row.children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                .map(|cell| read_cell(cell, options))
                .collect()
        })
        .collect()
}

fn read_cell(cell: ElementRef<'_>, options: &ExtractOptions) -> RawCell {
    let text = cell.text().collect::<String>().trim().to_string();
    let mut value = clean_text(&text);
    if value.is_empty() && options.image_fallback {
        if let Some(src) = image_source(cell, options.base_url.as_ref()) {
            value = src;
        }
    }

    RawCell {
        text,
        value,
        colspan: span_attr(cell, "colspan", MAX_COLSPAN),
        rowspan: span_attr(cell, "rowspan", MAX_ROWSPAN),
        header: cell.value().name() == "th",
    }
}

// Missing, non-numeric and zero spans all count as 1.
fn span_attr(cell: ElementRef<'_>, name: &str, max: usize) -> usize {
    cell.value()
        .attr(name)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|&span| span >= 1)
        .map_or(1, |span| span.min(max))
}

fn image_source(cell: ElementRef<'_>, base_url: Option<&Url>) -> Option<String> {
    let src = cell
        .select(&IMAGE_SELECTOR)
        .filter_map(|image| image.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())?;

    Some(match base_url {
        Some(base) => base
            .join(src)
            .map_or_else(|_| src.to_string(), String::from),
        None => src.to_string(),
    })
}
