//! Payload parsers: raw page text → intermediate [`RawTable`].
//!
//! Parsers only extract. They do not rename, coerce or filter; that is the
//! normalizer's job. Structural surprises (table missing, header guard failed)
//! come back as [`ParseError`] so the walker can treat them as a stop signal
//! and the normalizer can skip the page.

pub mod chart;
pub mod directory;
pub mod html;
pub mod json;

pub use html::{TableGroup, TableLayout, TransposedTable};

use crate::params::{SourceParams, TemplateError};
use crate::table::Value;
use thiserror::Error;

/// Intermediate tabular shape: named columns, rows of cells in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty payload")]
    Empty,

    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("JSON pointer {0:?} not found")]
    MissingPath(String),

    #[error("JSON pointer {0:?} does not hold an array of objects")]
    NotRecords(String),

    #[error("table #{index} not found (page has {found} tables)")]
    TableMissing { index: usize, found: usize },

    #[error("marker {0:?} not found")]
    MarkerMissing(String),

    #[error("header guard failed: expected {expected:?}, found {found:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("template: {0}")]
    Template(#[from] TemplateError),
}

impl ParseError {
    /// The page simply does not carry the expected structure (end of a listing).
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            ParseError::Empty | ParseError::TableMissing { .. } | ParseError::MarkerMissing(_)
        )
    }
}

/// Page parser for a custom layout.
pub type ParseFn = fn(&str) -> Result<RawTable, ParseError>;

/// How a source's payload is laid out.
#[derive(Debug, Clone, Copy)]
pub enum PayloadFormat {
    /// JSON array of flat objects at a JSON pointer; the pointer may use placeholders.
    JsonArray { pointer: &'static str },
    /// Chart feed: `<item data="a|b|c"/>` elements, fields named by position.
    ChartItems { columns: &'static [&'static str] },
    /// One HTML table addressed by position.
    HtmlTable(TableLayout),
    /// Row-labelled HTML tables (metrics down, periods across), turned into one row per period.
    Transposed(&'static [TableGroup]),
    /// Source-specific parser.
    Custom(ParseFn),
}

impl PayloadFormat {
    pub fn parse(&self, payload: &str, params: &SourceParams) -> Result<RawTable, ParseError> {
        if payload.trim().is_empty() {
            return Err(ParseError::Empty);
        }
        match self {
            PayloadFormat::JsonArray { pointer } => {
                let pointer = params.render(pointer, None)?;
                json::parse_records(payload, &pointer)
            }
            PayloadFormat::ChartItems { columns } => Ok(chart::parse_items(payload, columns)),
            PayloadFormat::HtmlTable(layout) => html::parse_table(payload, layout),
            PayloadFormat::Transposed(groups) => html::parse_transposed(payload, groups),
            PayloadFormat::Custom(parse) => parse(payload),
        }
    }
}

/// Text cell → value; blank cells are nulls.
pub(crate) fn cell(text: String) -> Value {
    if text.is_empty() {
        Value::Null
    } else {
        Value::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_payload_is_absence() {
        let format = PayloadFormat::JsonArray { pointer: "" };
        let err = format.parse("  \n", &SourceParams::default()).unwrap_err();
        assert_eq!(err, ParseError::Empty);
        assert!(err.is_absence());
    }

    #[test]
    fn header_mismatch_is_not_absence() {
        let err = ParseError::HeaderMismatch {
            expected: vec!["a".into()],
            found: vec![],
        };
        assert!(!err.is_absence());
    }

    #[test]
    fn json_pointer_is_templated() {
        let format = PayloadFormat::JsonArray {
            pointer: "/result/{kind}ItemList",
        };
        let payload = r#"{"result":{"etnItemList":[{"itemcode":"500001"}]}}"#;
        let params = SourceParams::default().with_kind("etn");
        let raw = format.parse(payload, &params).unwrap();
        assert_eq!(raw.columns, vec!["itemcode"]);
        assert_eq!(raw.len(), 1);
    }
}
