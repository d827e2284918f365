//! Testing helpers and shared fixtures.

use assert_float_eq::*;
use tinyrand::{Rand, Seeded, StdRand};

use crate::config::CategoryMap;
use crate::dataset;
use crate::dataset::{Column, Dataset, Value};

pub fn assert_slice_f64_relative(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, &expected) in expected.iter().enumerate() {
        let actual = actual[index];
        if actual != expected {
            assert_float_relative_eq!(expected, actual, epsilon);
        }
    }
}

/// Asserts that a numeric column holds the expected values, to within a relative epsilon.
pub fn assert_column_f64(expected: &[f64], data: &Dataset, column: &str) {
    let actual = data.numeric(column).unwrap();
    assert_slice_f64_relative(expected, &actual, 1e-9);
}

pub fn text_column(data: &Dataset, column: &str) -> Vec<String> {
    data.column(column)
        .unwrap()
        .values
        .iter()
        .map(Value::to_string)
        .collect()
}

pub fn sample_player_data() -> Dataset {
    dataset! {
        "player" => ["Alice", "Bob", "Charlie", "Diana", "Eve", "Frank", "Grace", "Henry"],
        "team" => ["Team A", "Team A", "Team B", "Team B", "Team C", "Team C", "Team D", "Team D"],
        "position" => ["FW", "MF", "FW", "DF", "MF", "GK", "FW", "DF"],
        "minutes" => [1800, 1620, 900, 2700, 1350, 2520, 450, 1980],
        "goals" => [15, 5, 8, 2, 7, 0, 3, 1],
        "assists" => [6, 12, 4, 3, 9, 1, 2, 5],
        "shots" => [60, 25, 35, 10, 40, 2, 20, 8],
        "passes" => [400, 800, 300, 1200, 600, 150, 200, 900],
        "tackles" => [15, 45, 20, 120, 55, 10, 12, 95],
        "interceptions" => [8, 25, 12, 80, 30, 5, 6, 60],
    }
}

pub fn sample_match_data() -> Dataset {
    dataset! {
        "date" => ["2024-01-01", "2024-01-08", "2024-01-15", "2024-01-22", "2024-01-29"],
        "opponent" => ["Team B", "Team C", "Team D", "Team B", "Team C"],
        "team" => ["Team A", "Team A", "Team A", "Team A", "Team A"],
        "goals" => [2, 1, 3, 0, 2],
        "assists" => [1, 2, 2, 0, 1],
        "shots" => [12, 8, 15, 6, 10],
        "tackles" => [20, 14, 18, 25, 16],
    }
}

pub fn sample_team_match_data() -> Dataset {
    dataset! {
        "date" => ["2024-01-01", "2024-01-08", "2024-01-15", "2024-01-22", "2024-01-29"],
        "name" => ["Team A", "Team A", "Team A", "Team A", "Team A"],
        "possession" => [55, 48, 60, 42, 50],
    }
}

pub fn sample_rating_config() -> CategoryMap {
    CategoryMap::from_iter([
        ("attack", vec!["goals", "assists", "shots"]),
        ("defense", vec!["tackles", "interceptions"]),
    ])
}

/// A reproducible, pseudo-random population of players.
pub fn large_player_data(rows: usize) -> Dataset {
    const POSITIONS: [&str; 4] = ["FW", "MF", "DF", "GK"];
    let mut rand = StdRand::seed(42);
    let mut uniform = |low: u64, high: u64| (low + rand.next_u64() % (high - low)) as f64;

    let mut columns = vec![
        Column::new(
            "player",
            (0..rows).map(|i| Value::from(format!("Player_{i}"))).collect(),
        ),
        Column::new(
            "team",
            (0..rows)
                .map(|i| Value::from(format!("Team_{}", i % 10)))
                .collect(),
        ),
        Column::new(
            "position",
            (0..rows).map(|i| Value::from(POSITIONS[i % POSITIONS.len()])).collect(),
        ),
    ];
    for (name, low, high) in [
        ("minutes", 450, 3600),
        ("goals", 0, 25),
        ("assists", 0, 20),
        ("shots", 5, 100),
        ("passes", 100, 2000),
        ("tackles", 5, 150),
        ("interceptions", 5, 100),
    ] {
        columns.push(Column::numeric(name, (0..rows).map(|_| uniform(low, high)).collect::<Vec<_>>()));
    }
    Dataset::with_columns(columns).unwrap()
}
