//! Normalized tables: ordered records sharing one column set.

use crate::parse::RawTable;
use chrono::NaiveDate;
use polars::prelude::{Column, DataFrame, PolarsError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io;
use thiserror::Error;

/// A single cell after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Int(i64),
    Bool(bool),
    Date(NaiveDate),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn key(&self) -> ValueKey {
        match self {
            Value::Null => ValueKey::Null,
            Value::Text(s) => ValueKey::Text(s.clone()),
            // -0.0 and 0.0 are the same row
            Value::Number(n) if *n == 0.0 => ValueKey::Number(0),
            Value::Number(n) => ValueKey::Number(n.to_bits()),
            Value::Int(n) => ValueKey::Int(*n),
            Value::Bool(b) => ValueKey::Bool(*b),
            Value::Date(d) => ValueKey::Date(*d),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{n}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

#[derive(PartialEq, Eq, Hash)]
enum ValueKey {
    Null,
    Text(String),
    Number(u64),
    Int(i64),
    Bool(bool),
    Date(NaiveDate),
}

/// Canonical column name → value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn has_columns(&self, columns: &[String]) -> bool {
        self.values.len() == columns.len() && columns.iter().all(|c| self.values.contains_key(c))
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("column mismatch: table has {expected:?}, got {found:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("DataFrame conversion failed: {0}")]
    Polars(#[from] PolarsError),
}

/// Ordered records with identical columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record; its column set must equal the table's.
    pub fn push(&mut self, record: Record) -> Result<(), TableError> {
        if !record.has_columns(&self.columns) {
            return Err(TableError::ColumnMismatch {
                expected: self.columns.clone(),
                found: record.values.keys().cloned().collect(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Concatenate `other` below this table, keeping order.
    pub fn append(&mut self, other: Table) -> Result<(), TableError> {
        if other.columns != self.columns {
            return Err(TableError::ColumnMismatch {
                expected: self.columns.clone(),
                found: other.columns,
            });
        }
        self.records.extend(other.records);
        Ok(())
    }

    /// Drop exact-duplicate rows, keeping the first occurrence. Returns how many were removed.
    pub fn dedup(&mut self) -> usize {
        let before = self.records.len();
        let columns = &self.columns;
        let mut seen: HashSet<Vec<ValueKey>> = HashSet::with_capacity(before);
        self.records.retain(|record| {
            let key: Vec<ValueKey> = columns
                .iter()
                .map(|c| record.get(c).unwrap_or(&Value::Null).key())
                .collect();
            seen.insert(key)
        });
        before - self.records.len()
    }

    /// Values of one column in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        if !self.columns.iter().any(|c| c == name) {
            return None;
        }
        Some(
            self.records
                .iter()
                .map(|r| r.get(name).unwrap_or(&Value::Null))
                .collect(),
        )
    }

    /// Back to the intermediate shape, typed values intact.
    pub fn into_raw(self) -> RawTable {
        let rows = self
            .records
            .into_iter()
            .map(|mut record| {
                self.columns
                    .iter()
                    .map(|c| record.values.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        RawTable {
            columns: self.columns,
            rows,
        }
    }

    /// Write the table as CSV with a header row. Nulls become empty fields.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), TableError> {
        let mut w = csv::Writer::from_writer(writer);
        w.write_record(&self.columns)?;
        for record in &self.records {
            w.write_record(
                self.columns
                    .iter()
                    .map(|c| record.get(c).map(|v| v.to_string()).unwrap_or_default()),
            )?;
        }
        w.flush()?;
        Ok(())
    }

    /// Typed DataFrame for downstream analysis.
    ///
    /// A column whose non-null cells are all numbers becomes f64 (i64 when all
    /// are integers), all dates becomes Date, all booleans becomes bool;
    /// anything mixed falls back to strings.
    pub fn to_dataframe(&self) -> Result<DataFrame, TableError> {
        let columns = self
            .columns
            .iter()
            .map(|name| self.typed_column(name))
            .collect::<Vec<_>>();
        Ok(DataFrame::new(columns)?)
    }

    fn typed_column(&self, name: &str) -> Column {
        let cells: Vec<&Value> = self
            .records
            .iter()
            .map(|r| r.get(name).unwrap_or(&Value::Null))
            .collect();
        let present = || cells.iter().filter(|v| !v.is_null());

        let all_int = present().all(|v| matches!(v, Value::Int(_)));
        let all_num = present().all(|v| matches!(v, Value::Number(_) | Value::Int(_)));
        let all_date = present().all(|v| matches!(v, Value::Date(_)));
        let all_bool = present().all(|v| matches!(v, Value::Bool(_)));
        let any = present().next().is_some();

        if any && all_int {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|v| match v {
                    Value::Int(n) => Some(*n),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        } else if any && all_num {
            let values: Vec<Option<f64>> = cells.iter().map(|v| v.as_f64()).collect();
            Column::new(name.into(), values)
        } else if any && all_date {
            let values: Vec<Option<NaiveDate>> = cells.iter().map(|v| v.as_date()).collect();
            Column::new(name.into(), values)
        } else if any && all_bool {
            let values: Vec<Option<bool>> = cells.iter().map(|v| v.as_bool()).collect();
            Column::new(name.into(), values)
        } else {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|v| if v.is_null() { None } else { Some(v.to_string()) })
                .collect();
            Column::new(name.into(), values)
        }
    }
}
