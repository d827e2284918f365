//! Dataset-wide transforms applied between extraction and analysis.
//!
//! Every transform takes its input by reference and returns a new [Dataset].

use strum_macros::{Display, EnumString, IntoStaticStr};
use thiserror::Error;
use tracing::debug;

use crate::config::{CategoryMap, LookupError};
use crate::dataset::{Column, Dataset, DatasetError, Value};
use crate::linear::Matrix;


/// Column holding the date of a match, shared by player and team match logs.
pub const DATE: &str = "date";

/// Team column of a player match log, matched against [NAME] in a team match log.
pub const TEAM: &str = "team";

/// Name column of a team match log.
pub const NAME: &str = "name";

pub const POSSESSION: &str = "possession";

pub const MINUTES: &str = "minutes";

#[derive(Debug, Error, PartialEq)]
pub enum PreprocessError {
    #[error("no datasets to combine")]
    NothingToCombine,

    #[error("rolling window must be at least 1")]
    EmptyWindow,

    #[error("min_periods {min_periods} exceeds the window of {window}")]
    InvalidMinPeriods { min_periods: usize, window: usize },

    #[error("alpha {0} outside [0, 0.5]")]
    InvalidAlpha(f64),

    #[error("no possession for team {team:?} on {date:?}")]
    UnmatchedPossession { date: String, team: String },

    #[error("{matches} rows of possession for team {team:?} on {date:?}")]
    AmbiguousPossession {
        date: String,
        team: String,
        matches: usize,
    },

    #[error("{0}")]
    Lookup(#[from] LookupError),

    #[error("{0}")]
    Dataset(#[from] DatasetError),
}

/// Adds a constant `competition` column.
pub fn with_competition_column(data: &Dataset, competition: &str) -> Result<Dataset, DatasetError> {
    let mut data = data.clone();
    data.set_column("competition", vec![Value::from(competition); data.rows()])?;
    Ok(data)
}

/// Stacks datasets vertically, in the order given. With `retain_nans`, the result has the
/// union of all columns (in order of first appearance) and cells absent from an input are
/// [Value::Missing]; otherwise only the columns common to every input are kept, in the order of
/// the first input.
pub fn combine(datasets: &[Dataset], retain_nans: bool) -> Result<Dataset, PreprocessError> {
    let (first, rest) = datasets
        .split_first()
        .ok_or(PreprocessError::NothingToCombine)?;

    let names: Vec<String> = if retain_nans {
        let mut names = first.column_names();
        for data in rest {
            for name in data.column_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    } else {
        first
            .column_names()
            .into_iter()
            .filter(|name| rest.iter().all(|data| data.has_column(name)))
            .collect()
    };

    let rows = datasets.iter().map(Dataset::rows).sum();
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let mut values = Vec::with_capacity(rows);
        for data in datasets {
            match data.column(&name) {
                Ok(column) => values.extend(column.values.iter().cloned()),
                Err(_) => values.extend((0..data.rows()).map(|_| Value::Missing)),
            }
        }
        columns.push(Column::new(name, values));
    }
    debug!("combined {} datasets into {rows} rows", datasets.len());
    Ok(Dataset::with_columns(columns)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Reduction {
    Mean,
    Sum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RollingConfig {
    pub window: usize,
    /// Fewest non-missing values a window must hold to yield a result.
    pub min_periods: usize,
    pub reduction: Reduction,
    /// Remove rows that remain missing after back-filling.
    pub dropna: bool,
}
impl RollingConfig {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            min_periods: window,
            reduction: Reduction::Mean,
            dropna: true,
        }
    }

    pub fn with_min_periods(self, min_periods: usize) -> Self {
        Self { min_periods, ..self }
    }

    pub fn with_reduction(self, reduction: Reduction) -> Self {
        Self { reduction, ..self }
    }

    pub fn with_dropna(self, dropna: bool) -> Self {
        Self { dropna, ..self }
    }
}

/// Adds a trailing rolling mean or sum of each column, named `{column}_roll_{reduction}`.
///
/// Windows with fewer than `min_periods` non-missing values are undefined; each undefined entry
/// takes the next defined value below it. With `dropna`, rows still undefined in any new column
/// are removed.
pub fn rolling(
    data: &Dataset,
    columns: &[impl AsRef<str>],
    config: &RollingConfig,
) -> Result<Dataset, PreprocessError> {
    if config.window == 0 {
        return Err(PreprocessError::EmptyWindow);
    }
    if config.min_periods > config.window {
        return Err(PreprocessError::InvalidMinPeriods {
            min_periods: config.min_periods,
            window: config.window,
        });
    }
    let mut rolled = data.clone();
    let mut new_columns = Vec::with_capacity(columns.len());
    for column in columns {
        let column = column.as_ref();
        let values = data.numeric(column)?;
        let mut window_values = rolling_window(&values, config);
        backfill(&mut window_values);
        let name = format!("{column}_roll_{}", config.reduction);
        rolled.set_numeric(&name, window_values)?;
        new_columns.push(name);
    }

    if config.dropna {
        let undefined = new_columns
            .iter()
            .map(|name| rolled.numeric(name))
            .collect::<Result<Vec<_>, _>>()?;
        rolled = rolled.filter_rows(|row| undefined.iter().all(|values| !values[row].is_nan()));
    }
    Ok(rolled)
}

fn rolling_window(values: &[f64], config: &RollingConfig) -> Vec<f64> {
    (0..values.len())
        .map(|row| {
            let start = (row + 1).saturating_sub(config.window);
            let present: Vec<_> = values[start..=row]
                .iter()
                .copied()
                .filter(|value| !value.is_nan())
                .collect();
            if present.is_empty() || present.len() < config.min_periods {
                return f64::NAN;
            }
            let sum: f64 = present.iter().sum();
            match config.reduction {
                Reduction::Mean => sum / present.len() as f64,
                Reduction::Sum => sum,
            }
        })
        .collect()
}

fn backfill(values: &mut [f64]) {
    let mut next = f64::NAN;
    for value in values.iter_mut().rev() {
        if value.is_nan() {
            *value = next;
        } else {
            next = *value;
        }
    }
}

/// The `q`-quantile of the non-`NaN` values, linearly interpolated between closest ranks.
/// `NaN` if there are no such values.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<_> = values.iter().copied().filter(|value| !value.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

/// Clips each column into its own `[alpha, 1 - alpha]` quantile range.
pub fn clamp_by_percentiles(
    data: &Dataset,
    columns: &[impl AsRef<str>],
    alpha: f64,
) -> Result<Dataset, PreprocessError> {
    if !(0.0..=0.5).contains(&alpha) {
        return Err(PreprocessError::InvalidAlpha(alpha));
    }
    let mut clamped = data.clone();
    for column in columns {
        let column = column.as_ref();
        let values = data.numeric(column)?;
        let (low, high) = (quantile(&values, alpha), quantile(&values, 1.0 - alpha));
        debug!("clamping {column} to [{low}, {high}]");
        clamped.set_numeric(
            column,
            values.into_iter().map(|value| {
                if value.is_nan() {
                    value
                } else {
                    value.clamp(low, high)
                }
            }),
        )?;
    }
    Ok(clamped)
}

/// Rescales each column to a per-90-minute rate using the `minutes` column. Zero minutes are
/// not guarded against.
pub fn adjust_per_90(data: &Dataset, columns: &[impl AsRef<str>]) -> Result<Dataset, PreprocessError> {
    let minutes = data.numeric(MINUTES)?;
    let mut adjusted = data.clone();
    for column in columns {
        let column = column.as_ref();
        let values = data.numeric(column)?;
        adjusted.set_numeric(
            column,
            values
                .into_iter()
                .zip(&minutes)
                .map(|(value, minutes)| value / minutes * 90.0),
        )?;
    }
    Ok(adjusted)
}

/// Scales defensive statistics by how much of the ball the team had. Each row of `targets` is
/// multiplied by `2 / (1 + e^(-0.1 (p - 50)))`, where `p` is the corresponding possession
/// percentage; neutral possession leaves the row unchanged.
pub fn adjust_possession_def(targets: &Matrix, possessions: &[f64]) -> Matrix {
    debug_assert_eq!(targets.rows(), possessions.len());
    let mut adjusted = targets.clone();
    for (row, &possession) in possessions.iter().enumerate() {
        let factor = 2.0 / (1.0 + (-0.1 * (possession - 50.0)).exp());
        for value in adjusted.row_slice_mut(row) {
            *value *= factor;
        }
    }
    adjusted
}

/// Possession-adjusts the given columns of a player match log, writing the results to new
/// `padj_{column}` columns.
///
/// Each player row is matched to exactly one team row on `date`, with the player's `team`
/// equal to the team's `name`; zero or several matches are errors. `adjust` receives the
/// selected columns as a matrix along with the matched possession of each row.
pub fn adjust_possession(
    player_data: &Dataset,
    team_data: &Dataset,
    columns: &[impl AsRef<str>],
    adjust: impl Fn(&Matrix, &[f64]) -> Matrix,
) -> Result<Dataset, PreprocessError> {
    let player_dates = player_data.column(DATE)?;
    let player_teams = player_data.column(TEAM)?;
    let team_dates = team_data.column(DATE)?;
    let team_names = team_data.column(NAME)?;
    let team_possessions = team_data.numeric(POSSESSION)?;

    let possessions = (0..player_data.rows())
        .map(|row| {
            let (date, team) = (&player_dates.values[row], &player_teams.values[row]);
            let matches: Vec<_> = (0..team_data.rows())
                .filter(|&team_row| {
                    &team_dates.values[team_row] == date && &team_names.values[team_row] == team
                })
                .collect();
            match matches.as_slice() {
                [only] => Ok(team_possessions[*only]),
                [] => Err(PreprocessError::UnmatchedPossession {
                    date: date.to_string(),
                    team: team.to_string(),
                }),
                _ => Err(PreprocessError::AmbiguousPossession {
                    date: date.to_string(),
                    team: team.to_string(),
                    matches: matches.len(),
                }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let adjusted = adjust(&player_data.feature_matrix(columns)?, &possessions);
    let mut data = player_data.clone();
    for (col, column) in columns.iter().enumerate() {
        data.set_numeric(&format!("padj_{}", column.as_ref()), adjusted.col(col))?;
    }
    Ok(data)
}

/// Keeps (`retain`) or drops the columns belonging to the selected categories. Columns are
/// taken in category order, each once.
pub fn filter_categories(
    data: &Dataset,
    categories: &CategoryMap,
    selected: &[impl AsRef<str>],
    retain: bool,
) -> Result<Dataset, PreprocessError> {
    let columns = categories.resolve(selected)?;
    let filtered = if retain {
        data.project(&columns)?
    } else {
        data.drop_columns(&columns)?
    };
    Ok(filtered)
}
