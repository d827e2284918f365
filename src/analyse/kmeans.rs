//! k-means clustering, fitted by `linfa_clustering` with k-means++ seeding.

use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans as LinfaKMeans;
use linfa_nn::distance::L2Dist;
use ndarray::Array1;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use tracing::trace;

use crate::analyse::{AnalysisError, Classifier};
use crate::linear::{squared_distance, Matrix};

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansConfig {
    pub k: usize,
    /// Independent seedings; the fit with the lowest inertia is kept.
    pub restarts: usize,
    pub max_iterations: u64,
    /// Convergence threshold on the centroid shift between iterations.
    pub tolerance: f64,
    pub seed: u64,
}
impl KMeansConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            restarts: 10,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 0,
        }
    }
}

/// A fitted k-means model.
#[derive(Debug, Clone)]
pub struct KMeans {
    model: LinfaKMeans<f64, L2Dist>,
    centroids: Matrix,
}
impl KMeans {
    pub fn fit(data: &Matrix, config: &KMeansConfig) -> Result<Self, AnalysisError> {
        if config.k == 0 || config.k > data.rows() {
            return Err(AnalysisError::InvalidClusterCount {
                k: config.k,
                rows: data.rows(),
            });
        }

        let rng = Xoshiro256Plus::seed_from_u64(config.seed);
        let model = LinfaKMeans::<f64, L2Dist>::params_with_rng(config.k, rng)
            .n_runs(config.restarts.max(1))
            .max_n_iterations(config.max_iterations)
            .tolerance(config.tolerance)
            .fit(&DatasetBase::from(data.to_array()))
            .map_err(|err| AnalysisError::Fit(err.to_string()))?;
        trace!("k={} fitted with inertia {}", config.k, model.inertia());

        let centroids = Matrix::from_array(model.centroids());
        Ok(Self { model, centroids })
    }

    pub fn k(&self) -> usize {
        self.centroids.rows()
    }

    /// Cluster centres, one per row.
    pub fn centroids(&self) -> &Matrix {
        &self.centroids
    }

    /// Mean squared distance from each training point to its centroid.
    pub fn inertia(&self) -> f64 {
        self.model.inertia()
    }

    /// Index of the centroid nearest to `point`, with its squared distance.
    pub fn nearest(&self, point: &[f64]) -> (usize, f64) {
        let mut best = (0, f64::INFINITY);
        for (index, centroid) in self.centroids.iter_rows().enumerate() {
            let distance = squared_distance(centroid, point);
            if distance < best.1 {
                best = (index, distance);
            }
        }
        best
    }
}

impl Classifier for KMeans {
    fn features(&self) -> usize {
        self.centroids.cols()
    }

    fn predict(&self, data: &Matrix) -> Vec<usize> {
        let labels: Array1<usize> = self.model.predict(&data.to_array());
        labels.to_vec()
    }
}
