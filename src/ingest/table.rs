use crate::errors::{IngestError, IngestResult};
use crate::models::{Batch, FieldValue, Record};
use polars::prelude::*;

/// All records of an ingestion run, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenates batches in order, stopping at the first error.
    pub fn from_batches<I>(batches: I) -> IngestResult<Self>
    where
        I: IntoIterator<Item = IngestResult<Batch>>,
    {
        let mut table = Table::new();
        for batch in batches {
            table.push_batch(batch?);
        }
        Ok(table)
    }

    pub fn push_batch(&mut self, mut batch: Batch) {
        self.rows.append(&mut batch);
    }

    /// Appends every row of `other` after the rows of `self`.
    pub fn extend(&mut self, other: Table) {
        self.rows.extend(other.rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    /// Distinct field names in order of first appearance.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.to_string());
                }
            }
        }
        columns
    }

    /// Converts the table into a polars `DataFrame`.
    ///
    /// One column per distinct field, in first-appearance order; rows lacking
    /// a field get a null. Text columns become `String`; a column holding any
    /// repeated-tag list becomes `List(String)` with scalars wrapped in
    /// one-element lists. Uniformly typed columns keep their type (integers
    /// mixed with decimals widen to `Float64`); anything else is rendered as
    /// text.
    ///
    /// # Errors
    ///
    /// Returns `Table` if polars rejects the columns.
    pub fn to_dataframe(&self) -> IngestResult<DataFrame> {
        let columns = self
            .columns()
            .iter()
            .map(|name| self.column_series(name))
            .collect::<Vec<_>>();

        DataFrame::new(columns)
            .map_err(|e| IngestError::Table(format!("Failed to create DataFrame: {e}")))
    }

    fn column_series(&self, name: &str) -> Series {
        let values: Vec<Option<&FieldValue>> = self
            .rows
            .iter()
            .map(|row| row.get(name).filter(|v| !v.is_null()))
            .collect();

        let kind = values
            .iter()
            .flatten()
            .fold(ColumnKind::Empty, |kind, value| kind.merge(ColumnKind::of(value)));

        match kind {
            ColumnKind::Bool => {
                let data: Vec<Option<bool>> = values
                    .iter()
                    .map(|v| match v {
                        Some(FieldValue::Bool(b)) => Some(*b),
                        _ => None,
                    })
                    .collect();
                Series::new(name, data)
            }
            ColumnKind::Integer => {
                let data: Vec<Option<i64>> = values
                    .iter()
                    .map(|v| match v {
                        Some(FieldValue::Integer(i)) => Some(*i),
                        _ => None,
                    })
                    .collect();
                Series::new(name, data)
            }
            ColumnKind::Decimal => {
                let data: Vec<Option<f64>> = values
                    .iter()
                    .map(|v| match v {
                        Some(FieldValue::Decimal(d)) => Some(*d),
                        Some(FieldValue::Integer(i)) => Some(*i as f64),
                        _ => None,
                    })
                    .collect();
                Series::new(name, data)
            }
            ColumnKind::List => {
                let data: Vec<Option<Series>> = values
                    .iter()
                    .map(|v| match v {
                        Some(FieldValue::List(items)) => Some(Series::new("", items.as_slice())),
                        Some(FieldValue::Text(s)) => Some(Series::new("", &[s.as_str()])),
                        _ => None,
                    })
                    .collect();
                Series::new(name, data)
            }
            ColumnKind::Empty | ColumnKind::Text | ColumnKind::Mixed => {
                let data: Vec<Option<String>> =
                    values.iter().map(|v| v.map(ToString::to_string)).collect();
                Series::new(name, data)
            }
        }
    }
}

impl From<Vec<Record>> for Table {
    fn from(rows: Vec<Record>) -> Self {
        Self { rows }
    }
}

impl IntoIterator for Table {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Storage type chosen for one output column.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Empty,
    Text,
    List,
    Bool,
    Integer,
    Decimal,
    Mixed,
}

impl ColumnKind {
    fn of(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(_) => ColumnKind::Text,
            FieldValue::List(_) => ColumnKind::List,
            FieldValue::Bool(_) => ColumnKind::Bool,
            FieldValue::Integer(_) => ColumnKind::Integer,
            FieldValue::Decimal(_) => ColumnKind::Decimal,
            FieldValue::Null => ColumnKind::Empty,
        }
    }

    fn merge(self, other: ColumnKind) -> ColumnKind {
        use ColumnKind::*;
        match (self, other) {
            (Empty, k) | (k, Empty) => k,
            (a, b) if a == b => a,
            (Text, List) | (List, Text) => List,
            (Integer, Decimal) | (Decimal, Integer) => Decimal,
            _ => Mixed,
        }
    }
}
