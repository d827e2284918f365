//! An in-memory table of named columns and ordered rows.
//!
//! Columns are stored in display order. Each cell is a [Value]: a number, a piece of text, or
//! the [Value::Missing] marker. Column types are not declared up front; a column is numeric
//! when the operation reading it says so (see [Dataset::numeric]).

use std::fmt::{Display, Formatter};

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::linear::Matrix;


#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}
impl Value {
    /// Interprets a raw cell, as read from a CSV file. Empty cells are [Value::Missing];
    /// anything that parses as a float is a number; everything else stays as text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(number) => Value::Number(number),
            Err(_) => Value::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            Value::Missing => Some(f64::NAN),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// `true` for [Value::Missing] and for a `NaN` number.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Number(number) => number.is_nan(),
            Value::Text(_) => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(number) => write!(f, "{number}"),
            Value::Text(text) => write!(f, "{text}"),
            Value::Missing => Ok(()),
        }
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Number(number)
    }
}

impl From<i32> for Value {
    fn from(number: i32) -> Self {
        Value::Number(number as f64)
    }
}

impl From<usize> for Value {
    fn from(number: usize) -> Self {
        Value::Number(number as f64)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("no column {name:?}, available columns: {available:?}")]
    MissingColumn { name: String, available: Vec<String> },

    #[error("duplicate column {0:?}")]
    DuplicateColumn(String),

    #[error("column {name:?} has {actual} rows, expected {expected}")]
    RowCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("non-numeric value {value:?} in column {name:?} at row {row}")]
    NotNumeric {
        name: String,
        row: usize,
        value: String,
    },

    #[error("row {row} is out of range for {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}
impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn numeric(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, values.into_iter().map(Value::Number).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads the column as floats. [Value::Missing] becomes `NaN`; text is an error.
    pub fn to_f64(&self) -> Result<Vec<f64>, DatasetError> {
        self.values
            .iter()
            .enumerate()
            .map(|(row, value)| {
                value.as_f64().ok_or_else(|| DatasetError::NotNumeric {
                    name: self.name.clone(),
                    row,
                    value: value.to_string(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    lookup: FxHashMap<String, usize>,
    rows: usize,
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.columns == other.columns
    }
}

impl Dataset {
    /// Assembles a dataset from columns, which must have distinct names and equal lengths.
    pub fn with_columns(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let rows = columns.first().map(Column::len).unwrap_or_default();
        let mut lookup = FxHashMap::with_capacity_and_hasher(columns.len(), Default::default());
        for (index, column) in columns.iter().enumerate() {
            if column.len() != rows {
                return Err(DatasetError::RowCountMismatch {
                    name: column.name.clone(),
                    expected: rows,
                    actual: column.len(),
                });
            }
            if lookup.insert(column.name.clone(), index).is_some() {
                return Err(DatasetError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self {
            columns,
            lookup,
            rows,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| column.name.clone())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&Column, DatasetError> {
        let index = self.column_index(name)?;
        Ok(&self.columns[index])
    }

    pub fn value(&self, row: usize, name: &str) -> Result<&Value, DatasetError> {
        let column = self.column(name)?;
        column.values.get(row).ok_or(DatasetError::RowOutOfRange {
            row,
            rows: self.rows,
        })
    }

    /// Reads a column as floats. See [Column::to_f64].
    pub fn numeric(&self, name: &str) -> Result<Vec<f64>, DatasetError> {
        self.column(name)?.to_f64()
    }

    /// Gathers the given columns into a `rows × columns.len()` matrix.
    pub fn feature_matrix(&self, columns: &[impl AsRef<str>]) -> Result<Matrix, DatasetError> {
        let mut matrix = Matrix::allocate(self.rows, columns.len());
        for (col, name) in columns.iter().enumerate() {
            let values = self.numeric(name.as_ref())?;
            for (row, value) in values.into_iter().enumerate() {
                matrix[(row, col)] = value;
            }
        }
        Ok(matrix)
    }

    /// Replaces the values of an existing column in place, or appends a new column.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), DatasetError> {
        if !self.columns.is_empty() && values.len() != self.rows {
            return Err(DatasetError::RowCountMismatch {
                name: name.to_string(),
                expected: self.rows,
                actual: values.len(),
            });
        }
        match self.lookup.get(name) {
            Some(&index) => self.columns[index].values = values,
            None => {
                self.rows = values.len();
                self.lookup.insert(name.to_string(), self.columns.len());
                self.columns.push(Column::new(name, values));
            }
        }
        Ok(())
    }

    pub fn set_numeric(
        &mut self,
        name: &str,
        values: impl IntoIterator<Item = f64>,
    ) -> Result<(), DatasetError> {
        self.set_column(name, values.into_iter().map(Value::Number).collect())
    }

    /// Keeps only the named columns, in the order given.
    pub fn project(&self, names: &[impl AsRef<str>]) -> Result<Dataset, DatasetError> {
        let columns = names
            .iter()
            .map(|name| self.column(name.as_ref()).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        let mut projected = Dataset::with_columns(columns)?;
        projected.rows = self.rows;
        Ok(projected)
    }

    /// Removes the named columns. Every name must exist.
    pub fn drop_columns(&self, names: &[impl AsRef<str>]) -> Result<Dataset, DatasetError> {
        for name in names {
            self.column_index(name.as_ref())?;
        }
        let columns = self
            .columns
            .iter()
            .filter(|column| !names.iter().any(|name| name.as_ref() == column.name))
            .cloned()
            .collect();
        let mut remaining = Dataset::with_columns(columns)?;
        remaining.rows = self.rows;
        Ok(remaining)
    }

    /// Builds a new dataset from the rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                Column::new(
                    column.name.clone(),
                    indices
                        .iter()
                        .map(|&row| column.values[row].clone())
                        .collect(),
                )
            })
            .collect();
        Dataset {
            columns,
            lookup: self.lookup.clone(),
            rows: indices.len(),
        }
    }

    /// Keeps the rows for which `predicate` holds, preserving their relative order.
    pub fn filter_rows(&self, mut predicate: impl FnMut(usize) -> bool) -> Dataset {
        let indices: Vec<_> = (0..self.rows).filter(|&row| predicate(row)).collect();
        self.select_rows(&indices)
    }

    /// Joins datasets side by side, aligning rows by position. A column name that appears more
    /// than once keeps its first occurrence. Shorter inputs are padded with [Value::Missing].
    pub fn hconcat(parts: Vec<Dataset>) -> Dataset {
        let rows = parts.iter().map(Dataset::rows).max().unwrap_or_default();
        let mut lookup = FxHashMap::default();
        let mut columns = vec![];
        for part in parts {
            for mut column in part.columns {
                if lookup.contains_key(&column.name) {
                    continue;
                }
                column.values.resize(rows, Value::Missing);
                lookup.insert(column.name.clone(), columns.len());
                columns.push(column);
            }
        }
        Dataset {
            columns,
            lookup,
            rows,
        }
    }

    fn column_index(&self, name: &str) -> Result<usize, DatasetError> {
        self.lookup
            .get(name)
            .copied()
            .ok_or_else(|| DatasetError::MissingColumn {
                name: name.to_string(),
                available: self.column_names(),
            })
    }
}

/// Builds a [Dataset] from column literals. Panics if the columns are inconsistent, so it is
/// meant for fixtures and tests.
#[macro_export]
macro_rules! dataset {
    ($($name:expr => [$($value:expr),* $(,)?]),* $(,)?) => {
        $crate::dataset::Dataset::with_columns(vec![
            $($crate::dataset::Column::new($name, vec![$($crate::dataset::Value::from($value)),*])),*
        ]).unwrap()
    };
}
