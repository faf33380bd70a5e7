use std::ops::RangeInclusive;
use std::str::FromStr;

use encoding_rs::Encoding;
use url::Url;

/// What to do when a body row's expanded width disagrees with the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanMode {
    /// Pad missing positions with empty strings, ignore extras, warn.
    BestEffort,
    /// Fail the whole extraction on the first inconsistent row.
    Strict,
}

/// 1-based selection of body rows, parsed from `1-3,7`. Ranges are kept as
/// bounds, never expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSelection {
    ranges: Vec<RangeInclusive<usize>>,
}

impl RowSelection {
    #[must_use]
    pub fn contains(&self, row: usize) -> bool {
        self.ranges.iter().any(|range| range.contains(&row))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

fn parse_row(text: &str, what: &str) -> Result<usize, String> {
    let row = text
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid {what}: '{}'", text.trim()))?;
    if row == 0 {
        return Err("rows are 1-based".to_string());
    }
    Ok(row)
}

impl FromStr for RowSelection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for token in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let range = match token.split_once('-') {
                Some((start, end)) => {
                    let start = parse_row(start, "row range start")?;
                    let end = parse_row(end, "row range end")?;
                    if end < start {
                        return Err(format!(
                            "invalid range '{token}': end is smaller than start"
                        ));
                    }
                    start..=end
                }
                None => {
                    let row = parse_row(token, "row number")?;
                    row..=row
                }
            };
            ranges.push(range);
        }

        if ranges.is_empty() {
            return Err("row selection cannot be empty".to_string());
        }

        Ok(Self { ranges })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    /// Header rows to take from the body when the table has no `<thead>`,
    /// or leading body rows to drop when it does. `0` infers the header.
    pub skip_rows: usize,
    pub span_mode: SpanMode,
    pub rows: Option<RowSelection>,
    pub all_tables: bool,
    pub base_url: Option<Url>,
    pub image_fallback: bool,
    pub encoding: Option<&'static Encoding>,
    pub delimiter: u8,
    pub no_table: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            skip_rows: 0,
            span_mode: SpanMode::BestEffort,
            rows: None,
            all_tables: false,
            base_url: None,
            image_fallback: true,
            encoding: None,
            delimiter: b',',
            no_table: false,
        }
    }
}
