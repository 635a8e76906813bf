//! In-memory columnar table.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A row rendered for output: column name to JSON value, in column order.
pub type Record = Map<String, Value>;

/// Typed storage for one column. Missing cells are `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Timestamp(Vec<DateTime<Utc>>),
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Timestamp(v) => v.len(),
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Integer(_) | ColumnData::Float(_))
    }

    /// Gathers the cells at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Timestamp(v) => ColumnData::Timestamp(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Integer(v) => ColumnData::Integer(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Float(v) => ColumnData::Float(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => {
                ColumnData::Text(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }

    /// JSON value of one cell. Timestamps are epoch milliseconds.
    pub fn json_value(&self, row: usize) -> Value {
        match self {
            ColumnData::Timestamp(v) => Value::from(v[row].timestamp_millis()),
            ColumnData::Integer(v) => v[row].map_or(Value::Null, Value::from),
            ColumnData::Float(v) => v[row]
                .and_then(serde_json::Number::from_f64)
                .map_or(Value::Null, Value::Number),
            ColumnData::Text(v) => v[row].clone().map_or(Value::Null, Value::String),
        }
    }

    /// Rough heap footprint of the cells.
    fn approx_bytes(&self) -> usize {
        match self {
            ColumnData::Timestamp(v) => v.len() * size_of::<DateTime<Utc>>(),
            ColumnData::Integer(v) => v.len() * size_of::<Option<i64>>(),
            ColumnData::Float(v) => v.len() * size_of::<Option<f64>>(),
            ColumnData::Text(v) => {
                v.len() * size_of::<Option<String>>()
                    + v.iter().flatten().map(String::capacity).sum::<usize>()
            }
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Columns of equal length with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    pub fn try_new(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map_or(0, |c| c.data.len());

        for (i, col) in columns.iter().enumerate() {
            if col.data.len() != num_rows {
                bail!(
                    "column '{}' has {} rows, expected {}",
                    col.name,
                    col.data.len(),
                    num_rows
                );
            }
            if columns[..i].iter().any(|c| c.name == col.name) {
                bail!("duplicate column '{}'", col.name);
            }
        }

        Ok(Self { columns, num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// New table holding only the rows at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take(indices)))
                .collect(),
            num_rows: indices.len(),
        }
    }

    /// Drops the named column; a missing column is not an error.
    pub fn without_column(mut self, name: &str) -> Table {
        self.columns.retain(|c| c.name != name);
        self
    }

    pub fn record(&self, row: usize) -> Record {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.data.json_value(row)))
            .collect()
    }

    pub fn to_records(&self) -> Vec<Record> {
        (0..self.num_rows).map(|row| self.record(row)).collect()
    }

    pub fn approx_memory_bytes(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.name.capacity() + c.data.approx_bytes())
            .sum()
    }
}
