//! HTML table extraction, positional and transposed.

use super::{cell, ParseError, RawTable};
use crate::table::Value;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("static selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("static selector"));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("static selector"));
static PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}[./]\d{2}").expect("static regex"));

/// One table addressed by document position.
#[derive(Debug, Clone, Copy)]
pub struct TableLayout {
    /// Zero-based position among all `<table>` elements of the page.
    pub index: usize,
    /// Header texts that must all be present before anything is extracted.
    pub guard: &'static [&'static str],
    /// Positional column names; `None` uses the last header row as names.
    pub columns: Option<&'static [&'static str]>,
}

/// A row-labelled table and the labels wanted from it.
#[derive(Debug, Clone, Copy)]
pub struct TransposedTable {
    pub index: usize,
    pub labels: &'static [&'static str],
}

/// Tables sharing one `type` tag (annual or quarterly, for instance).
#[derive(Debug, Clone, Copy)]
pub struct TableGroup {
    pub tag: &'static str,
    pub tables: &'static [TransposedTable],
}

/// Collapsed visible text of an element.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

struct Rows<'a> {
    headers: Vec<Vec<String>>,
    body: Vec<ElementRef<'a>>,
}

/// Split a table's rows into header rows (only `th`) and body rows (any `td`).
fn split_rows(table: ElementRef<'_>) -> Rows<'_> {
    let mut rows = Rows {
        headers: Vec::new(),
        body: Vec::new(),
    };
    for tr in table.select(&ROW) {
        let has_td = tr
            .select(&CELL)
            .any(|c| c.value().name().eq_ignore_ascii_case("td"));
        if has_td {
            rows.body.push(tr);
        } else {
            let texts: Vec<String> = tr.select(&CELL).map(text_of).collect();
            if !texts.is_empty() {
                rows.headers.push(texts);
            }
        }
    }
    rows
}

fn nth_table<'a>(doc: &'a Html, index: usize) -> Result<ElementRef<'a>, ParseError> {
    let tables: Vec<ElementRef<'a>> = doc.select(&TABLE).collect();
    let found = tables.len();
    tables
        .into_iter()
        .nth(index)
        .ok_or(ParseError::TableMissing { index, found })
}

/// Extract the table at `layout.index`.
///
/// Body rows whose cell count differs from the column count (separators,
/// colspan notes) are skipped.
pub fn parse_table(payload: &str, layout: &TableLayout) -> Result<RawTable, ParseError> {
    let doc = Html::parse_document(payload);
    let table = nth_table(&doc, layout.index)?;
    let rows = split_rows(table);

    let seen: Vec<String> = rows.headers.iter().flatten().cloned().collect();
    let seen_squashed: Vec<String> = seen.iter().map(|h| squash(h)).collect();
    if !layout
        .guard
        .iter()
        .all(|g| seen_squashed.iter().any(|h| *h == squash(g)))
    {
        return Err(ParseError::HeaderMismatch {
            expected: layout.guard.iter().map(|g| g.to_string()).collect(),
            found: seen,
        });
    }

    let columns: Vec<String> = match layout.columns {
        Some(names) => names.iter().map(|n| n.to_string()).collect(),
        None => rows.headers.last().cloned().unwrap_or_default(),
    };
    let mut raw = RawTable::new(columns);
    for tr in rows.body {
        let cells: Vec<String> = tr.select(&CELL).map(text_of).collect();
        if cells.len() != raw.columns.len() {
            continue;
        }
        raw.rows.push(cells.into_iter().map(cell).collect());
    }
    Ok(raw)
}

/// Period columns of a row-labelled table: (body cell position, period text).
fn period_columns(headers: &[Vec<String>], value_cells: usize) -> Vec<(usize, String)> {
    let Some(last) = headers.last() else {
        return Vec::new();
    };
    // The corner cell sits in this row unless it spans down from an earlier one.
    let offset = last.len().saturating_sub(value_cells);
    last.iter()
        .enumerate()
        .skip(offset)
        .filter(|(_, h)| PERIOD.is_match(h))
        .map(|(i, h)| (i - offset, h.clone()))
        .collect()
}

/// First non-empty text node of the label cell, ignoring tooltips and buttons.
fn row_label(tr: ElementRef<'_>) -> Option<String> {
    let th = tr
        .select(&CELL)
        .next()
        .filter(|c| c.value().name().eq_ignore_ascii_case("th"))?;
    th.text().map(str::trim).find(|t| !t.is_empty()).map(squash)
}

/// Turn row-labelled tables into one row per (table, period).
///
/// Output columns are `tdate` (raw period header such as `2020/12(E)`), the
/// union of all wanted labels, then `type` carrying the group tag.
pub fn parse_transposed(payload: &str, groups: &[TableGroup]) -> Result<RawTable, ParseError> {
    let doc = Html::parse_document(payload);

    let mut labels: Vec<&'static str> = Vec::new();
    for group in groups {
        for t in group.tables {
            for label in t.labels {
                if !labels.contains(label) {
                    labels.push(label);
                }
            }
        }
    }
    let mut columns = Vec::with_capacity(labels.len() + 2);
    columns.push("tdate".to_string());
    columns.extend(labels.iter().map(|l| l.to_string()));
    columns.push("type".to_string());
    let mut raw = RawTable::new(columns);

    for group in groups {
        // Tables of one group describe the same periods; their rows merge.
        let mut merged: Vec<Vec<Value>> = Vec::new();
        for spec in group.tables {
            let table = nth_table(&doc, spec.index)?;
            let rows = split_rows(table);

            let labelled: Vec<(String, Vec<String>)> = rows
                .body
                .iter()
                .filter_map(|tr| {
                    let label = row_label(*tr)?;
                    let values = tr
                        .select(&CELL)
                        .filter(|c| c.value().name().eq_ignore_ascii_case("td"))
                        .map(text_of)
                        .collect();
                    Some((label, values))
                })
                .collect();

            let wanted: Vec<String> = spec.labels.iter().map(|l| squash(l)).collect();
            if !labelled.iter().any(|(l, _)| wanted.contains(l)) {
                return Err(ParseError::HeaderMismatch {
                    expected: spec.labels.iter().map(|l| l.to_string()).collect(),
                    found: labelled.into_iter().map(|(l, _)| l).collect(),
                });
            }

            let width = labelled.first().map(|(_, v)| v.len()).unwrap_or(0);
            for (pos, period) in period_columns(&rows.headers, width) {
                let period = cell(period);
                let at = match merged.iter().position(|r| r[0] == period) {
                    Some(at) => at,
                    None => {
                        let mut row = vec![Value::Null; raw.columns.len()];
                        row[0] = period;
                        row[labels.len() + 1] = cell(group.tag.to_string());
                        merged.push(row);
                        merged.len() - 1
                    }
                };
                for (i, label) in labels.iter().enumerate() {
                    if !spec.labels.contains(label) || !merged[at][i + 1].is_null() {
                        continue;
                    }
                    let key = squash(label);
                    if let Some(value) = labelled
                        .iter()
                        .find(|(l, _)| *l == key)
                        .and_then(|(_, values)| values.get(pos).cloned())
                    {
                        merged[at][i + 1] = cell(value);
                    }
                }
            }
        }
        raw.rows.append(&mut merged);
    }
    Ok(raw)
}
