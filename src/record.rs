//! Resolution of a single record (row) by position or by name.

use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

use crate::dataset::{Dataset, DatasetError};

/// Identifier columns consulted when resolving a record by name, in order of preference.
pub const IDENTIFIER_COLUMNS: [&str; 2] = ["player", "team"];

/// Playing-time column used to choose between records sharing a name.
pub const MINUTES: &str = "minutes";

#[derive(Debug, Clone, PartialEq)]
pub enum RecordIndex {
    Position(usize),
    Name(String),
}

impl From<usize> for RecordIndex {
    fn from(position: usize) -> Self {
        RecordIndex::Position(position)
    }
}

impl From<&str> for RecordIndex {
    fn from(name: &str) -> Self {
        RecordIndex::Name(name.to_string())
    }
}

impl From<String> for RecordIndex {
    fn from(name: String) -> Self {
        RecordIndex::Name(name)
    }
}

/// Digits name a position; anything else is a name.
impl FromStr for RecordIndex {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse() {
            Ok(position) => RecordIndex::Position(position),
            Err(_) => RecordIndex::Name(s.to_string()),
        })
    }
}

impl Display for RecordIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordIndex::Position(position) => write!(f, "#{position}"),
            RecordIndex::Name(name) => write!(f, "{name:?}"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("row {position} is out of range for a dataset of {rows} rows")]
    OutOfRange { position: usize, rows: usize },

    #[error("no record named {name:?} in column {column:?}")]
    NotFound { name: String, column: String },

    #[error("no player or team column to resolve {0:?}")]
    NoIdentifierColumn(String),

    #[error("{0}")]
    Dataset(#[from] DatasetError),
}

/// Resolves `index` to the row position it names. See [get_record].
pub fn find_record(data: &Dataset, index: &RecordIndex) -> Result<usize, RecordError> {
    match index {
        RecordIndex::Position(position) => {
            if *position < data.rows() {
                Ok(*position)
            } else {
                Err(RecordError::OutOfRange {
                    position: *position,
                    rows: data.rows(),
                })
            }
        }
        RecordIndex::Name(name) => {
            let column = IDENTIFIER_COLUMNS
                .into_iter()
                .find(|&column| data.has_column(column))
                .ok_or_else(|| RecordError::NoIdentifierColumn(name.clone()))?;
            let matches: Vec<_> = data
                .column(column)?
                .values
                .iter()
                .enumerate()
                .filter(|(_, value)| value.as_str() == Some(name.as_str()))
                .map(|(row, _)| row)
                .collect();

            match matches.as_slice() {
                [] => Err(RecordError::NotFound {
                    name: name.clone(),
                    column: column.to_string(),
                }),
                [only] => Ok(*only),
                _ => {
                    let minutes = data.numeric(MINUTES)?;
                    let mut best = matches[0];
                    for &row in &matches[1..] {
                        if minutes[row] > minutes[best] {
                            best = row;
                        }
                    }
                    Ok(best)
                }
            }
        }
    }
}

/// Resolves `index` to exactly one record, returned as a single-row dataset.
///
/// A position selects that row directly. A name is matched against the `player` column if
/// present, otherwise the `team` column. When several rows share the name, the one with the
/// most `minutes` wins, the earliest row breaking ties.
pub fn get_record(data: &Dataset, index: &RecordIndex) -> Result<Dataset, RecordError> {
    let row = find_record(data, index)?;
    Ok(data.select_rows(&[row]))
}
