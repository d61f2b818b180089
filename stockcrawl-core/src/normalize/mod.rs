//! Raw pages → canonical [`Table`].
//!
//! For each page: parse with the source's format, select the declared
//! columns under their canonical names, run the fixups, drop rows missing a
//! required field. A page that fails to parse, or lacks a declared column,
//! is logged and contributes nothing; the rest of the walk still counts.
//!
//! Selection accepts either the upstream column name or the canonical one,
//! and every fixup leaves already-typed values alone, so feeding a
//! normalized table back through gives the same table.

pub mod dates;

use crate::catalog::{Field, SourceField, SourceSpec};
use crate::params::SourceParams;
use crate::parse::RawTable;
use crate::table::{Record, Table, Value};
use crate::walk::RawPage;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

/// Per-row transformation applied after selection, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixup {
    /// Strip thousands separators and whitespace, parse as a number.
    /// `""`, `"-"` and `"N/A"` are nulls.
    Numeric(Field),
    /// Parse an upstream date string.
    Date(Field),
    /// `YYYY.MM` / `YYYY/MM` prefix → last day of that month.
    MonthEnd(Field),
    /// Flag a trailing `(E)` (estimate) on `from` into boolean `into`.
    ForecastFlag { from: Field, into: Field },
    /// Left-pad a numeric code with zeros.
    ZeroPad { field: Field, width: usize },
    /// Whole months from the date in `from` to the run date, into `into`.
    MonthsSince { from: Field, into: Field },
}

impl Fixup {
    /// Fields this fixup reads or writes.
    pub fn fields(&self) -> Vec<Field> {
        match *self {
            Fixup::Numeric(f) | Fixup::Date(f) | Fixup::MonthEnd(f) => vec![f],
            Fixup::ZeroPad { field, .. } => vec![field],
            Fixup::ForecastFlag { from, into } | Fixup::MonthsSince { from, into } => {
                vec![from, into]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("column {source_column:?} for field {field} not in page (has {available:?})")]
    MissingColumn {
        field: Field,
        source_column: String,
        available: Vec<String>,
    },
}

/// Values that are the same for every row of one retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeContext {
    /// Fallback for [`SourceField::Ticker`].
    pub ticker: Option<String>,
    /// Reference date for month counts.
    pub as_of: NaiveDate,
}

impl NormalizeContext {
    pub fn new(ticker: Option<String>, as_of: NaiveDate) -> Self {
        Self { ticker, as_of }
    }

    pub fn today(ticker: Option<String>) -> Self {
        Self::new(ticker, chrono::Local::now().date_naive())
    }
}

pub struct Normalizer<'a> {
    spec: &'a SourceSpec,
    ctx: NormalizeContext,
}

impl<'a> Normalizer<'a> {
    pub fn new(spec: &'a SourceSpec, ctx: NormalizeContext) -> Self {
        Self { spec, ctx }
    }

    /// Normalize every page and concatenate in page order.
    pub fn normalize(&self, pages: &[RawPage], params: &SourceParams) -> Table {
        let mut table = Table::new(self.spec.column_names());
        for page in pages {
            let raw = match self.spec.format.parse(&page.payload, params) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(source = %self.spec.id, page = page.index, error = %e, "page skipped: parse failed");
                    continue;
                }
            };
            match self.normalize_raw(&raw) {
                Ok(part) => {
                    debug!(source = %self.spec.id, page = page.index, rows = part.len(), "page normalized");
                    if let Err(e) = table.append(part) {
                        warn!(source = %self.spec.id, page = page.index, error = %e, "page skipped");
                    }
                }
                Err(e) => {
                    warn!(source = %self.spec.id, page = page.index, error = %e, "page skipped");
                }
            }
        }
        if self.spec.dedup {
            let removed = table.dedup();
            if removed > 0 {
                debug!(source = %self.spec.id, removed, "duplicate rows dropped");
            }
        }
        table
    }

    /// Normalize one already-parsed table.
    pub fn normalize_raw(&self, raw: &RawTable) -> Result<Table, NormalizeError> {
        let mut table = Table::new(self.spec.column_names());
        if raw.is_empty() {
            return Ok(table);
        }

        let selectors = self
            .spec
            .columns
            .iter()
            .map(|(field, source)| self.selector(raw, *field, *source))
            .collect::<Result<Vec<_>, _>>()?;

        for row in &raw.rows {
            let mut values: Vec<Value> = selectors
                .iter()
                .map(|sel| match sel {
                    Selector::Index(i) => row.get(*i).cloned().unwrap_or(Value::Null),
                    Selector::Fallback(v) => v.clone(),
                    Selector::IndexOr(i, v) => match row.get(*i) {
                        Some(cell) if !cell.is_null() => cell.clone(),
                        _ => v.clone(),
                    },
                })
                .collect();

            for fixup in self.spec.fixups {
                self.apply(*fixup, &mut values);
            }

            if self
                .spec
                .required
                .iter()
                .any(|f| self.position(*f).map_or(true, |i| values[i].is_null()))
            {
                continue;
            }

            let record = Record::from_pairs(self.spec.fields().map(Field::as_str).zip(values));
            if let Err(e) = table.push(record) {
                warn!(source = %self.spec.id, error = %e, "row dropped");
            }
        }
        Ok(table)
    }

    fn position(&self, field: Field) -> Option<usize> {
        self.spec.fields().position(|f| f == field)
    }

    fn selector(
        &self,
        raw: &RawTable,
        field: Field,
        source: SourceField,
    ) -> Result<Selector, NormalizeError> {
        let canonical = raw.column_index(field.as_str());
        match source {
            SourceField::Column(name) => raw
                .column_index(name)
                .or(canonical)
                .map(Selector::Index)
                .ok_or_else(|| NormalizeError::MissingColumn {
                    field,
                    source_column: name.to_string(),
                    available: raw.columns.clone(),
                }),
            SourceField::Ticker => {
                let fallback = self
                    .ctx
                    .ticker
                    .as_ref()
                    .map(|t| Value::text(t.as_str()))
                    .unwrap_or(Value::Null);
                Ok(match canonical {
                    Some(i) => Selector::IndexOr(i, fallback),
                    None => Selector::Fallback(fallback),
                })
            }
            SourceField::Derived => Ok(match canonical {
                Some(i) => Selector::Index(i),
                None => Selector::Fallback(Value::Null),
            }),
        }
    }

    fn apply(&self, fixup: Fixup, values: &mut [Value]) {
        let Some(slot) = fixup.fields().first().and_then(|f| self.position(*f)) else {
            return;
        };
        match fixup {
            Fixup::Numeric(_) => values[slot] = numeric(&values[slot]),
            Fixup::Date(_) => values[slot] = date(&values[slot]),
            Fixup::MonthEnd(_) => {
                if let Some(end) = values[slot].as_text().map(dates::month_end) {
                    values[slot] = end.map(Value::Date).unwrap_or(Value::Null);
                }
            }
            Fixup::ForecastFlag { into, .. } => {
                let Some(target) = self.position(into) else {
                    return;
                };
                if !values[target].is_null() {
                    return;
                }
                if let Some(flag) = values[slot].as_text().map(|s| s.trim_end().ends_with("(E)")) {
                    values[target] = Value::Bool(flag);
                }
            }
            Fixup::ZeroPad { width, .. } => values[slot] = zero_pad(&values[slot], width),
            Fixup::MonthsSince { into, .. } => {
                let Some(target) = self.position(into) else {
                    return;
                };
                if !values[target].is_null() {
                    return;
                }
                if let Some(start) = values[slot].as_date() {
                    values[target] = Value::Int(dates::months_between(start, self.ctx.as_of));
                }
            }
        }
    }
}

enum Selector {
    Index(usize),
    Fallback(Value),
    IndexOr(usize, Value),
}

fn numeric(value: &Value) -> Value {
    match value {
        Value::Int(n) => Value::Number(*n as f64),
        Value::Text(s) => {
            let cleaned: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
            match cleaned.as_str() {
                "" | "-" | "N/A" => Value::Null,
                other => other.parse::<f64>().map(Value::Number).unwrap_or(Value::Null),
            }
        }
        Value::Number(_) | Value::Null => value.clone(),
        Value::Bool(_) | Value::Date(_) => Value::Null,
    }
}

fn date(value: &Value) -> Value {
    let parsed = match value {
        Value::Date(_) => return value.clone(),
        Value::Text(s) => dates::parse_date(s),
        Value::Int(n) => dates::parse_date(&n.to_string()),
        Value::Number(n) if n.fract() == 0.0 => dates::parse_date(&format!("{n:.0}")),
        _ => None,
    };
    parsed.map(Value::Date).unwrap_or(Value::Null)
}

fn zero_pad(value: &Value, width: usize) -> Value {
    let digits = match value {
        Value::Text(s) => s.trim().to_string(),
        Value::Int(n) => n.to_string(),
        Value::Number(n) if n.fract() == 0.0 => format!("{n:.0}"),
        _ => return value.clone(),
    };
    if digits.is_empty() {
        return Value::Null;
    }
    Value::Text(format!("{digits:0>width$}"))
}
