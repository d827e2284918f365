use assert_float_eq::*;

use super::*;
use crate::dataset;
use crate::testing::{large_player_data, sample_player_data, sample_rating_config};

const FEATURES: [&str; 5] = ["goals", "assists", "shots", "tackles", "interceptions"];

#[test]
fn elbow_at_bend() {
    let candidates = [3, 4, 5, 6, 7, 8];
    let inertias = [100.0, 50.0, 10.0, 8.0, 6.0, 4.0];
    assert_eq!(Some(5), elbow_k(&candidates, &inertias, true));
    assert_eq!(Some(5), elbow_k(&candidates, &inertias, false));
}

#[test]
fn elbow_linear_has_none() {
    let candidates: Vec<_> = (3..=10).collect();
    let inertias: Vec<_> = candidates.iter().map(|&k| 100.0 - 10.0 * k as f64).collect();
    assert_eq!(None, elbow_k(&candidates, &inertias, true));
}

#[test]
fn elbow_relative_penalises_large_k() {
    // dx = [0, 10, 4, 5, 0], dx2 = [0, 0, 6, -1, 5]; strength = [-10, 2, -6, 5, 0]
    let candidates = [1, 2, 3, 20, 21];
    let inertias = [30.0, 20.0, 16.0, 11.0, 11.0];
    assert_eq!(Some(20), elbow_k(&candidates, &inertias, false));
    assert_eq!(Some(2), elbow_k(&candidates, &inertias, true));
}

#[test]
fn elbow_ties_take_first() {
    let candidates = [3, 4, 5, 6, 7];
    // dx = [0, 10, 0, 10, 0], dx2 = [0, 0, 10, -10, 10]; strength = [-10, 10, -20, 10, 0]
    let inertias = [40.0, 30.0, 30.0, 20.0, 20.0];
    assert_eq!(Some(4), elbow_k(&candidates, &inertias, false));
}

fn four_blobs() -> Dataset {
    dataset! {
        "x" => [0.0, 0.1, 0.0, 10.0, 10.1, 10.0, 0.0, 0.1, 0.0, 10.0, 10.1, 10.0],
        "y" => [0.0, 0.0, 0.1, 0.0, 0.0, 0.1, 10.0, 10.0, 10.1, 10.0, 10.0, 10.1],
    }
}

#[test]
fn select_k_on_blobs() {
    assert_eq!(Some(4), select_k(&four_blobs(), &["x", "y"], &ElbowConfig::default()).unwrap());
}

#[test]
fn select_k_skips_oversized_candidates() {
    let data = sample_player_data();
    let config = ElbowConfig {
        candidates: 3..=29,
        ..ElbowConfig::default()
    };
    let k = select_k(&data, &FEATURES, &config).unwrap();
    assert!(k.map_or(true, |k| (3..=8).contains(&k)));
}

#[test]
fn fit_kmeans_exact() {
    let kmeans = fit_kmeans(&sample_player_data(), &FEATURES, ClusterCount::Exactly(3)).unwrap();
    assert_eq!(3, kmeans.k());
    assert_eq!(5, kmeans.centroids().cols());
}

#[test]
fn fit_kmeans_too_many_clusters() {
    assert_eq!(
        AnalysisError::InvalidClusterCount { k: 9, rows: 8 },
        fit_kmeans(&sample_player_data(), &FEATURES, ClusterCount::Exactly(9)).unwrap_err()
    );
}

#[test]
fn fit_kmeans_auto_without_elbow() {
    let data = dataset! { "x" => [0, 1] };
    assert_eq!(
        AnalysisError::NoElbow,
        fit_kmeans(&data, &["x"], ClusterCount::Auto).unwrap_err()
    );
}

#[test]
fn fit_kmeans_auto() {
    let kmeans = fit_kmeans(&four_blobs(), &["x", "y"], ClusterCount::Auto).unwrap();
    assert_eq!(4, kmeans.k());
}

#[test]
fn cluster_records_with_fitted() {
    let data = sample_player_data();
    let (_, scaled) = MinMaxScaler::fit_transform(&data.feature_matrix(&FEATURES).unwrap());
    let kmeans = KMeans::fit(&scaled, &KMeansConfig::new(2)).unwrap();
    let labels = cluster_records(&data, &FEATURES, Clusterer::Fitted(&kmeans)).unwrap();
    assert_eq!(8, labels.len());
    assert!(labels.iter().all(|&label| label < 2));
    assert_eq!(kmeans.predict(&scaled), labels);
}

#[test]
fn cluster_records_auto() {
    let labels = cluster_records(&four_blobs(), &["x", "y"], Clusterer::Auto).unwrap();
    for blob in labels.chunks(3) {
        assert!(blob.iter().all(|&label| label == blob[0]), "{labels:?}");
    }
    let mut distinct = labels.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(4, distinct.len());
}

#[test]
fn cluster_records_larger_population() {
    let data = large_player_data(60);
    let kmeans = fit_kmeans(&data, &FEATURES, ClusterCount::Exactly(4)).unwrap();
    assert_eq!(4, kmeans.k());
    let labels = cluster_records(&data, &FEATURES, Clusterer::Fitted(&kmeans)).unwrap();
    assert_eq!(60, labels.len());
}

#[test]
fn reduce_with_auto_pca() {
    let data = sample_player_data();
    let reduced = reduce_dimensions(&data, &FEATURES, Projection::Auto(2)).unwrap();
    assert_eq!((8, 2), (reduced.rows(), reduced.cols()));
    for component in 0..2 {
        let mean: f64 = reduced.col(component).iter().sum::<f64>() / 8.0;
        assert_float_absolute_eq!(0.0, mean, 1e-9);
    }
}

#[test]
fn cluster_records_rejects_fewer_fitted_features() {
    let data = four_blobs();
    let kmeans = fit_kmeans(&data, &["x"], ClusterCount::Exactly(2)).unwrap();
    assert_eq!(
        AnalysisError::FeatureMismatch { expected: 1, actual: 2 },
        cluster_records(&data, &["x", "y"], Clusterer::Fitted(&kmeans)).unwrap_err()
    );
}

#[test]
fn reduce_rejects_more_fitted_features() {
    let data = sample_player_data();
    let pca = fit_pca(&data, &FEATURES, 2).unwrap();
    assert_eq!(
        AnalysisError::FeatureMismatch { expected: 5, actual: 2 },
        reduce_dimensions(&data, &["goals", "assists"], Projection::Fitted(&pca)).unwrap_err()
    );
}

#[test]
fn reduce_with_fitted() {
    let data = sample_player_data();
    let (_, scaled) = MinMaxScaler::fit_transform(&data.feature_matrix(&FEATURES).unwrap());
    let pca = Pca::fit(&scaled, 1).unwrap();
    let reduced = reduce_dimensions(&data, &FEATURES, Projection::Fitted(&pca)).unwrap();
    assert_eq!(pca.transform(&scaled), reduced);
}

#[test]
fn fit_pca_on_raw_columns() {
    let pca = fit_pca(&sample_player_data(), &FEATURES, 2).unwrap();
    assert_eq!(2, pca.out_dims());
    assert_eq!(5, pca.features());
    let ratios = pca.explained_variance_ratio();
    assert!(ratios[0] > ratios[1]);
}

#[test]
fn style_ratings_bounded_and_non_destructive() {
    let data = sample_player_data();
    let rated = estimate_style_ratings(&data, &sample_rating_config()).unwrap();
    assert!(!data.has_column("attack_rating"));
    assert_eq!(data.cols() + 2, rated.cols());
    for column in ["attack_rating", "defense_rating"] {
        let ratings = rated.numeric(column).unwrap();
        assert!(ratings.iter().all(|rating| (0.0..=100.0).contains(rating)), "{ratings:?}");
        assert_float_absolute_eq!(100.0, ratings.iter().copied().fold(f64::NEG_INFINITY, f64::max));
        assert_float_absolute_eq!(0.0, ratings.iter().copied().fold(f64::INFINITY, f64::min));
    }
    for column in data.column_names() {
        assert_eq!(data.column(&column).unwrap(), rated.column(&column).unwrap());
    }
}

#[test]
fn style_ratings_follow_output() {
    let data = sample_player_data();
    let rated = estimate_style_ratings(&data, &sample_rating_config()).unwrap();
    let attack = rated.numeric("attack_rating").unwrap();
    let defense = rated.numeric("defense_rating").unwrap();
    // Alice leads the attacking numbers, Diana the defensive ones
    assert_float_absolute_eq!(100.0, attack[0]);
    assert_float_absolute_eq!(100.0, defense[3]);
    // Frank, the keeper, trails in attack
    assert!(attack[5] < attack[1]);
}

#[test]
fn style_ratings_constant_category() {
    let data = dataset! {
        "a" => [3, 3, 3],
        "b" => [1, 1, 1],
    };
    let categories = CategoryMap::from_iter([("flat", vec!["a", "b"])]);
    let rated = estimate_style_ratings(&data, &categories).unwrap();
    assert_eq!(vec![0.0, 0.0, 0.0], rated.numeric("flat_rating").unwrap());
}
