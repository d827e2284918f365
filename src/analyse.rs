//! Clustering, dimensionality reduction and style ratings over dataset feature columns.

use std::ops::RangeInclusive;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::CategoryMap;
use crate::dataset::{Dataset, DatasetError};
use crate::linear::Matrix;
use crate::scale::MinMaxScaler;

pub mod kmeans;
pub mod pca;

#[cfg(test)]
mod tests;

pub use kmeans::{KMeans, KMeansConfig};
pub use pca::Pca;

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("cannot form {k} clusters from {rows} rows")]
    InvalidClusterCount { k: usize, rows: usize },

    #[error("cannot reduce {features} features to {dims} dimensions")]
    InvalidDimensions { dims: usize, features: usize },

    #[error("no rows to fit")]
    NoRows,

    #[error("no elbow in the inertia curve, specify the number of clusters")]
    NoElbow,

    #[error("model was fitted on {expected} features, given {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("fitting failed: {0}")]
    Fit(String),

    #[error("{0}")]
    Dataset(#[from] DatasetError),
}

/// A fitted model that assigns each row of a feature matrix to a group.
pub trait Classifier {
    /// Number of feature columns the model was fitted on.
    fn features(&self) -> usize;

    fn predict(&self, data: &Matrix) -> Vec<usize>;
}

/// A fitted model that maps a feature matrix to fewer dimensions.
pub trait Reducer {
    fn features(&self) -> usize;

    fn transform(&self, data: &Matrix) -> Matrix;
}

fn check_features(expected: usize, actual: usize) -> Result<(), AnalysisError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AnalysisError::FeatureMismatch { expected, actual })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterCount {
    /// Choose by the elbow heuristic.
    Auto,
    Exactly(usize),
}

/// The classifier used by [cluster_records].
pub enum Clusterer<'a> {
    /// Fit k-means on the scaled data, choosing the cluster count automatically.
    Auto,
    Fitted(&'a dyn Classifier),
}

/// The reducer used by [reduce_dimensions].
pub enum Projection<'a> {
    /// Fit PCA on the scaled data to the given number of dimensions.
    Auto(usize),
    Fitted(&'a dyn Reducer),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElbowConfig {
    pub candidates: RangeInclusive<usize>,
    /// Divide each candidate's strength by its cluster count, favouring fewer clusters.
    pub relative: bool,
    pub seed: u64,
}
impl Default for ElbowConfig {
    fn default() -> Self {
        Self {
            candidates: 3..=29,
            relative: true,
            seed: 0,
        }
    }
}

/// Picks the cluster count at the sharpest bend of an inertia curve.
///
/// With `dx[i] = inertia[i-1] - inertia[i]` and `dx2[i] = dx[i-1] - dx[i]` (zero-padded at the
/// front), each candidate but the last scores `dx2[i+1] - dx[i+1]`; the last scores 0. Returns
/// the first candidate with the highest score (divided by `k` if `relative`), or `None` if no
/// score is positive.
pub fn elbow_k(candidates: &[usize], inertias: &[f64], relative: bool) -> Option<usize> {
    assert_eq!(candidates.len(), inertias.len(), "one inertia per candidate");
    let n = inertias.len();
    let mut dx = vec![0.0; n];
    for i in 1..n {
        dx[i] = inertias[i - 1] - inertias[i];
    }
    let mut dx2 = vec![0.0; n];
    for i in 2..n {
        dx2[i] = dx[i - 1] - dx[i];
    }
    let strength: Vec<f64> = (0..n)
        .map(|i| if i + 1 < n { dx2[i + 1] - dx[i + 1] } else { 0.0 })
        .collect();
    if !strength.iter().any(|&strength| strength > 0.0) {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (&k, &strength) in candidates.iter().zip(&strength) {
        let score = if relative { strength / k as f64 } else { strength };
        if best.map_or(true, |(_, best)| score > best) {
            best = Some((k, score));
        }
    }
    best.map(|(k, _)| k)
}

/// Runs the elbow heuristic over the candidate cluster counts. Candidates exceeding the number
/// of rows are skipped.
pub fn select_k(
    data: &Dataset,
    columns: &[impl AsRef<str>],
    config: &ElbowConfig,
) -> Result<Option<usize>, AnalysisError> {
    select_k_matrix(&data.feature_matrix(columns)?, config)
}

fn select_k_matrix(data: &Matrix, config: &ElbowConfig) -> Result<Option<usize>, AnalysisError> {
    let candidates: Vec<_> = config
        .candidates
        .clone()
        .filter(|&k| k > 0 && k <= data.rows())
        .collect();
    let inertias = candidates
        .iter()
        .map(|&k| {
            let config = KMeansConfig {
                seed: config.seed,
                ..KMeansConfig::new(k)
            };
            KMeans::fit(data, &config).map(|kmeans| kmeans.inertia())
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!("elbow inertias: {:?}", candidates.iter().zip(&inertias).collect::<Vec<_>>());
    let k = elbow_k(&candidates, &inertias, config.relative);
    info!("elbow test selected k={k:?}");
    Ok(k)
}

fn fit_kmeans_matrix(data: &Matrix, k: ClusterCount) -> Result<KMeans, AnalysisError> {
    let k = match k {
        ClusterCount::Exactly(k) => k,
        ClusterCount::Auto => {
            select_k_matrix(data, &ElbowConfig::default())?.ok_or(AnalysisError::NoElbow)?
        }
    };
    KMeans::fit(data, &KMeansConfig::new(k))
}

/// Fits k-means to the selected columns as given, without scaling.
pub fn fit_kmeans(
    data: &Dataset,
    columns: &[impl AsRef<str>],
    k: ClusterCount,
) -> Result<KMeans, AnalysisError> {
    fit_kmeans_matrix(&data.feature_matrix(columns)?, k)
}

/// Labels each row with a cluster, after min-max scaling the selected columns across this
/// dataset.
pub fn cluster_records(
    data: &Dataset,
    columns: &[impl AsRef<str>],
    clusterer: Clusterer,
) -> Result<Vec<usize>, AnalysisError> {
    let (_, scaled) = MinMaxScaler::fit_transform(&data.feature_matrix(columns)?);
    let labels = match clusterer {
        Clusterer::Fitted(classifier) => {
            check_features(classifier.features(), scaled.cols())?;
            classifier.predict(&scaled)
        }
        Clusterer::Auto => fit_kmeans_matrix(&scaled, ClusterCount::Auto)?.predict(&scaled),
    };
    Ok(labels)
}

/// Fits PCA to the selected columns as given, without scaling.
pub fn fit_pca(
    data: &Dataset,
    columns: &[impl AsRef<str>],
    out_dims: usize,
) -> Result<Pca, AnalysisError> {
    Pca::fit(&data.feature_matrix(columns)?, out_dims)
}

/// Projects each row to fewer dimensions, after min-max scaling the selected columns across
/// this dataset.
pub fn reduce_dimensions(
    data: &Dataset,
    columns: &[impl AsRef<str>],
    projection: Projection,
) -> Result<Matrix, AnalysisError> {
    let (_, scaled) = MinMaxScaler::fit_transform(&data.feature_matrix(columns)?);
    let reduced = match projection {
        Projection::Fitted(reducer) => {
            check_features(reducer.features(), scaled.cols())?;
            reducer.transform(&scaled)
        }
        Projection::Auto(out_dims) => Pca::fit(&scaled, out_dims)?.transform(&scaled),
    };
    Ok(reduced)
}

/// Scores every row from 0 to 100 in each category, writing `{category}_rating` columns to a
/// copy of `data`.
///
/// A category's columns are min-max scaled and projected onto their first principal
/// component, oriented so that the score rises with the sum of the scaled columns. The
/// projection is then rescaled to `[0, 100]`; a category with no spread scores 0 throughout.
pub fn estimate_style_ratings(
    data: &Dataset,
    categories: &CategoryMap,
) -> Result<Dataset, AnalysisError> {
    let mut rated = data.clone();
    for (category, columns) in categories.iter() {
        if columns.is_empty() {
            return Err(AnalysisError::InvalidDimensions {
                dims: 1,
                features: 0,
            });
        }
        let (_, scaled) = MinMaxScaler::fit_transform(&data.feature_matrix(columns)?);
        let totals: Vec<f64> = scaled.iter_rows().map(|row| row.iter().sum()).collect();
        let scores = if columns.len() == 1 || scaled.rows() < 2 {
            scaled.col(0)
        } else if totals.iter().all(|&total| total == 0.0) {
            totals
        } else {
            let projected = Pca::fit(&scaled, 1)?.transform(&scaled).col(0);
            let orientation: f64 = projected.iter().zip(&totals).map(|(score, total)| score * total).sum();
            let sign = if orientation < 0.0 { -1.0 } else { 1.0 };
            projected.into_iter().map(|score| sign * score).collect()
        };
        let (_, ratings) = MinMaxScaler::fit_transform(&column_matrix(&scores));
        rated.set_numeric(
            &format!("{category}_rating"),
            ratings.col(0).into_iter().map(|rating| rating * 100.0),
        )?;
    }
    Ok(rated)
}

fn column_matrix(values: &[f64]) -> Matrix {
    let mut matrix = Matrix::allocate(values.len(), 1);
    for (row, &value) in values.iter().enumerate() {
        matrix[(row, 0)] = value;
    }
    matrix
}
