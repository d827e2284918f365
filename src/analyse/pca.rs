//! Principal component analysis, fitted by `linfa_reduction`.

use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_reduction::Pca as LinfaPca;
use ndarray::Array2;

use crate::analyse::{AnalysisError, Reducer};
use crate::linear::Matrix;

/// A fitted PCA model. Projections are centred on the training means.
#[derive(Debug, Clone)]
pub struct Pca {
    model: LinfaPca<f64>,
    features: usize,
    out_dims: usize,
}
impl Pca {
    pub fn fit(data: &Matrix, out_dims: usize) -> Result<Self, AnalysisError> {
        if out_dims == 0 || out_dims > data.cols() {
            return Err(AnalysisError::InvalidDimensions {
                dims: out_dims,
                features: data.cols(),
            });
        }
        if data.rows() == 0 {
            return Err(AnalysisError::NoRows);
        }

        let model = LinfaPca::<f64>::params(out_dims)
            .fit(&DatasetBase::from(data.to_array()))
            .map_err(|err| AnalysisError::Fit(err.to_string()))?;
        Ok(Self {
            model,
            features: data.cols(),
            out_dims,
        })
    }

    pub fn out_dims(&self) -> usize {
        self.out_dims
    }

    pub fn explained_variance(&self) -> Vec<f64> {
        self.model.explained_variance().to_vec()
    }

    /// Share of the variance captured by each retained component.
    pub fn explained_variance_ratio(&self) -> Vec<f64> {
        self.model.explained_variance_ratio().to_vec()
    }
}

impl Reducer for Pca {
    fn features(&self) -> usize {
        self.features
    }

    fn transform(&self, data: &Matrix) -> Matrix {
        let projected: Array2<f64> = self.model.predict(&data.to_array());
        Matrix::from_array(&projected)
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use super::*;

    fn diagonal_line() -> Matrix {
        Matrix::from_rows(&[
            vec![1.0, 2.0],
            vec![2.0, 4.0],
            vec![3.0, 6.0],
            vec![4.0, 8.0],
        ])
    }

    #[test]
    fn single_component_captures_line() {
        let pca = Pca::fit(&diagonal_line(), 1).unwrap();
        assert_eq!(1, pca.out_dims());
        assert_eq!(2, pca.features());
        assert_float_absolute_eq!(1.0, pca.explained_variance_ratio()[0], 1e-9);
    }

    #[test]
    fn transform_centres_and_projects() {
        let data = diagonal_line();
        let pca = Pca::fit(&data, 1).unwrap();
        let projected = pca.transform(&data);
        assert_eq!((4, 1), (projected.rows(), projected.cols()));
        // the component's sign is arbitrary, so compare magnitudes along the line
        let expected = [1.5, 0.5, 0.5, 1.5].map(|t| t * 5f64.sqrt());
        for (row, expected) in expected.iter().enumerate() {
            assert_float_absolute_eq!(*expected, projected[(row, 0)].abs(), 1e-9);
        }
        assert_float_absolute_eq!(0.0, projected.col(0).iter().sum::<f64>(), 1e-9);
        assert!(projected[(0, 0)].signum() != projected[(3, 0)].signum());
    }

    #[test]
    fn ratios_sum_to_one_when_all_components_kept() {
        let data = Matrix::from_rows(&[
            vec![2.5, 2.4, 0.5],
            vec![0.5, 0.7, 1.5],
            vec![2.2, 2.9, 0.1],
            vec![1.9, 2.2, 0.9],
            vec![3.1, 3.0, 0.3],
            vec![2.3, 2.7, 1.1],
        ]);
        let pca = Pca::fit(&data, 3).unwrap();
        let ratios = pca.explained_variance_ratio();
        assert_float_absolute_eq!(1.0, ratios.iter().sum::<f64>(), 1e-9);
        assert!(ratios[0] >= ratios[1] && ratios[1] >= ratios[2]);
        assert_eq!(3, pca.explained_variance().len());
    }

    #[test]
    fn rejects_bad_dims() {
        let data = diagonal_line();
        assert_eq!(
            AnalysisError::InvalidDimensions { dims: 3, features: 2 },
            Pca::fit(&data, 3).unwrap_err()
        );
        assert!(Pca::fit(&data, 0).is_err());
    }
}
