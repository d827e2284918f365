//! Support for linear algebra.

use std::ops::{Index, IndexMut};

use ndarray::Array2;

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}
impl Matrix {
    /// A zero-filled `rows × cols` matrix.
    pub fn allocate(rows: usize, cols: usize) -> Self {
        assert!(rows.checked_mul(cols).is_some(), "a {rows}x{cols} matrix overflows usize");
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Builds a matrix from equal-length rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let cols = rows.first().map(Vec::len).unwrap_or_default();
        let mut matrix = Self::allocate(rows.len(), cols);
        for (row, values) in rows.iter().enumerate() {
            assert_eq!(cols, values.len(), "row {row} has {} columns, expected {cols}", values.len());
            matrix.row_slice_mut(row).copy_from_slice(values);
        }
        matrix
    }

    /// Copies an `ndarray` matrix, as returned by the fitted estimators.
    pub fn from_array(array: &Array2<f64>) -> Self {
        let mut matrix = Self::allocate(array.nrows(), array.ncols());
        for ((row, col), &value) in array.indexed_iter() {
            matrix[(row, col)] = value;
        }
        matrix
    }

    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.rows, self.cols), |cell| self[cell])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row_slice(&self, row: usize) -> &[f64] {
        let start = self.row_start(row);
        &self.data[start..start + self.cols]
    }

    pub fn row_slice_mut(&mut self, row: usize) -> &mut [f64] {
        let start = self.row_start(row);
        &mut self.data[start..start + self.cols]
    }

    /// A copy of one column.
    pub fn col(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|row| self[(row, col)]).collect()
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.rows).map(move |row| self.row_slice(row))
    }

    #[inline]
    fn row_start(&self, row: usize) -> usize {
        assert!(row < self.rows, "row {row} lies outside a {}x{} matrix", self.rows, self.cols);
        row * self.cols
    }

    /// Position of a cell in the row-major backing store.
    #[inline]
    fn cell(&self, row: usize, col: usize) -> usize {
        assert!(col < self.cols, "column {col} lies outside a {}x{} matrix", self.rows, self.cols);
        self.row_start(row) + col
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.data[self.cell(row, col)]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        let cell = self.cell(row, col);
        &mut self.data[cell]
    }
}

/// Squared Euclidean distance between two points.
#[inline]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(a, b)| (a - b).powi(2)).sum()
}
