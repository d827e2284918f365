//! Threshold search and nearest-neighbour similarity search over records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::debug;

use crate::dataset::{Dataset, DatasetError};
use crate::linear::squared_distance;
use crate::record::{find_record, RecordError, RecordIndex};
use crate::scale::MinMaxScaler;


#[derive(Debug, Error, PartialEq)]
pub enum SearchError {
    #[error("{0}")]
    Dataset(#[from] DatasetError),

    #[error("{0}")]
    Record(#[from] RecordError),

    #[error("row {row} has no value for {column:?}")]
    MissingFeature { row: usize, column: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Operator {
    Gte,
    Eq,
    Lte,
}
impl Operator {
    pub fn test(&self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Gte => value >= threshold,
            Operator::Eq => value == threshold,
            Operator::Lte => value <= threshold,
        }
    }
}

/// Row filters by column threshold, one set per comparison, applied in [Operator] order.
/// Absent sets filter nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default)]
    pub gte: BTreeMap<String, f64>,
    #[serde(default)]
    pub eq: BTreeMap<String, f64>,
    #[serde(default)]
    pub lte: BTreeMap<String, f64>,
}
impl Criteria {
    pub fn with(mut self, operator: Operator, column: impl Into<String>, threshold: f64) -> Self {
        self.thresholds_mut(operator).insert(column.into(), threshold);
        self
    }

    pub fn thresholds(&self, operator: Operator) -> &BTreeMap<String, f64> {
        match operator {
            Operator::Gte => &self.gte,
            Operator::Eq => &self.eq,
            Operator::Lte => &self.lte,
        }
    }

    fn thresholds_mut(&mut self, operator: Operator) -> &mut BTreeMap<String, f64> {
        match operator {
            Operator::Gte => &mut self.gte,
            Operator::Eq => &mut self.eq,
            Operator::Lte => &mut self.lte,
        }
    }
}

/// Keeps the rows satisfying every criterion, applying the `gte`, `eq` and `lte` sets in turn.
/// Missing values never satisfy a criterion.
pub fn search(data: &Dataset, criteria: &Criteria) -> Result<Dataset, SearchError> {
    let mut found = data.clone();
    for operator in Operator::iter() {
        for (column, &threshold) in criteria.thresholds(operator) {
            let values = found.numeric(column)?;
            found = found.filter_rows(|row| operator.test(values[row], threshold));
        }
    }
    debug!("search matched {} of {} rows", found.rows(), data.rows());
    Ok(found)
}

/// Finds the `num` records nearest to the one at `index`, by Euclidean distance over the
/// selected columns after min-max scaling across all rows. The baseline itself is included.
/// Rows are returned unscaled, nearest first; equidistant rows keep their relative order.
/// Every row needs a value in every selected column.
pub fn search_similar(
    data: &Dataset,
    columns: &[impl AsRef<str>],
    index: &RecordIndex,
    num: usize,
) -> Result<Dataset, SearchError> {
    let baseline = find_record(data, index)?;
    let features = data.feature_matrix(columns)?;
    for (row, values) in features.iter_rows().enumerate() {
        if let Some(col) = values.iter().position(|value| value.is_nan()) {
            return Err(SearchError::MissingFeature {
                row,
                column: columns[col].as_ref().to_string(),
            });
        }
    }
    let (_, scaled) = MinMaxScaler::fit_transform(&features);
    let baseline = scaled.row_slice(baseline);

    let mut ranked: Vec<(usize, f64)> = scaled
        .iter_rows()
        .enumerate()
        .map(|(row, values)| (row, squared_distance(baseline, values)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.truncate(num);

    let rows: Vec<_> = ranked.into_iter().map(|(row, _)| row).collect();
    Ok(data.select_rows(&rows))
}
