//! Min-max scaling of feature columns into `[0, 1]`.

use crate::dataset::{Dataset, DatasetError};
use crate::linear::Matrix;

/// Per-column bounds observed when fitting. A column whose minimum and maximum coincide has no
/// scale; its values map to `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    mins: Vec<f64>,
    maxes: Vec<f64>,
}
impl MinMaxScaler {
    /// Fits bounds to the columns of `data`. `NaN` entries are ignored.
    pub fn fit(data: &Matrix) -> Self {
        let mut mins = vec![f64::INFINITY; data.cols()];
        let mut maxes = vec![f64::NEG_INFINITY; data.cols()];
        for row in data.iter_rows() {
            for (col, &value) in row.iter().enumerate() {
                if value.is_nan() {
                    continue;
                }
                mins[col] = mins[col].min(value);
                maxes[col] = maxes[col].max(value);
            }
        }
        Self { mins, maxes }
    }

    pub fn features(&self) -> usize {
        self.mins.len()
    }

    #[inline]
    pub fn scale(&self, col: usize, value: f64) -> f64 {
        let range = self.maxes[col] - self.mins[col];
        if range > 0.0 {
            (value - self.mins[col]) / range
        } else {
            0.0
        }
    }

    pub fn transform(&self, data: &Matrix) -> Matrix {
        debug_assert_eq!(self.features(), data.cols());
        let mut scaled = data.clone();
        for row in 0..scaled.rows() {
            for (col, value) in scaled.row_slice_mut(row).iter_mut().enumerate() {
                *value = self.scale(col, *value);
            }
        }
        scaled
    }

    pub fn fit_transform(data: &Matrix) -> (Self, Matrix) {
        let scaler = Self::fit(data);
        let scaled = scaler.transform(data);
        (scaler, scaled)
    }
}

/// Returns a copy of `data` with the given columns min-max scaled. Other columns are untouched.
pub fn min_max_scale(data: &Dataset, columns: &[impl AsRef<str>]) -> Result<Dataset, DatasetError> {
    let mut scaled = data.clone();
    min_max_scale_mut(&mut scaled, columns)?;
    Ok(scaled)
}

/// Min-max scales the given columns of `data` in place.
pub fn min_max_scale_mut(
    data: &mut Dataset,
    columns: &[impl AsRef<str>],
) -> Result<(), DatasetError> {
    let (_, scaled) = MinMaxScaler::fit_transform(&data.feature_matrix(columns)?);
    for (col, name) in columns.iter().enumerate() {
        data.set_numeric(name.as_ref(), scaled.col(col))?;
    }
    Ok(())
}
