//! Table types

use crate::parse::Scalar;
use crate::types::ScalarType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: ScalarType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// The materialized result of one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Scalar>>,
}

impl Table {
    /// Create a table; every row must have one value per column
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Scalar>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of a column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Value at a row and named column
    pub fn get(&self, row: usize, column: &str) -> Option<&Scalar> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// All values of a named column
    pub fn column_values(&self, column: &str) -> Option<Vec<&Scalar>> {
        let index = self.column_index(column)?;
        Some(self.rows.iter().map(|r| &r[index]).collect())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_json_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.name.clone(), value.to_json()))
                    .collect();
                Value::Object(record)
            })
            .collect()
    }

    /// Text grid with the header as the first row; nulls render empty
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let header = self.columns.iter().map(|c| c.name.clone()).collect();
        std::iter::once(header)
            .chain(self.rows.iter().map(|row| {
                row.iter()
                    .map(|value| value.as_param().unwrap_or_default())
                    .collect()
            }))
            .collect()
    }
}
