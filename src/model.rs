use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::record::Record;

/// Marker printed for unfilled leaves in a rendered layout template.
pub const PLACEHOLDER: &str = "###";

/// A `<th>`/`<td>` read out of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCell {
    pub text: String,
    pub value: String,
    pub colspan: usize,
    pub rowspan: usize,
    pub header: bool,
}

impl RawCell {
    #[cfg(test)]
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            value: crate::normalize::clean_text(text),
            colspan: 1,
            rowspan: 1,
            header: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn span(mut self, colspan: usize, rowspan: usize) -> Self {
        self.colspan = colspan;
        self.rowspan = rowspan;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    /// 1-based header row.
    pub row: usize,
    /// 1-based index of the last column the cell covers.
    pub col: usize,
    pub span: usize,
    /// Header rows covered, clipped to the header depth.
    pub rows: usize,
    pub label: String,
}

impl HeaderCell {
    #[must_use]
    pub fn start(&self) -> usize {
        self.col + 1 - self.span
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub rows: Vec<Vec<HeaderCell>>,
    pub width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutNode {
    /// Filled by the expanded body value at `column` (0-based).
    Placeholder { column: usize },
    Group(Vec<(String, LayoutNode)>),
}

impl LayoutNode {
    fn collect_columns(&self, out: &mut Vec<usize>) {
        match self {
            Self::Placeholder { column } => out.push(*column),
            Self::Group(children) => {
                for (_, child) in children {
                    child.collect_columns(out);
                }
            }
        }
    }
}

impl Serialize for LayoutNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Placeholder { .. } => serializer.serialize_str(PLACEHOLDER),
            Self::Group(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for (key, child) in children {
                    map.serialize_entry(key, child)?;
                }
                map.end()
            }
        }
    }
}

/// Field-name template for one table, built once from its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub(crate) root: Vec<(String, LayoutNode)>,
    pub(crate) width: usize,
}

impl Layout {
    /// Columns the header covers, named or not.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn fields(&self) -> &[(String, LayoutNode)] {
        &self.root
    }

    /// Placeholder columns in pre-order, left to right.
    #[must_use]
    pub fn columns(&self) -> Vec<usize> {
        let mut out = Vec::new();
        for (_, node) in &self.root {
            node.collect_columns(&mut out);
        }
        out
    }

    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.columns().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// The layout as JSON with `"###"` leaves.
    ///
    /// # Errors
    /// Only fails if serialization itself fails.
    pub fn template(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

impl Serialize for Layout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.root.len()))?;
        for (key, node) in &self.root {
            map.serialize_entry(key, node)?;
        }
        map.end()
    }
}

/// Records of one matched table; `table_id` is 1-based in match order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedTable {
    pub table_id: usize,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedOutput {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub table_count: usize,
    pub row_count: usize,
}
