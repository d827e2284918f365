//! Conversion of statistics tables into datasets.
//!
//! Each qualifying table row (one with a `th[scope=row]` header) yields a dataset row. Cells are
//! addressed by their `data-stat` attribute. Numeric statistics are parsed leniently: thousands
//! separators are dropped, and text that still fails to parse is kept as is.

use rustc_hash::FxHashMap;
use scraper::ElementRef;
use tracing::debug;

use crate::dataset::{Column, Dataset, Value};
use crate::scrape::{selector, ScrapeError};

/// Canonical name of the team column; tables spell it `team` or `squad`.
pub const TEAM: &str = "team";
const SQUAD: &str = "squad";

const AGGREGATE_TEXT: [&str; 6] = ["player", "nationality", "position", "team", "age", "birth_year"];

const MATCH_LOG_TEXT: [&str; 11] = [
    "date",
    "start_time",
    "comp",
    "round",
    "dayofweek",
    "venue",
    "result",
    "opponent",
    "match_report",
    "game_started",
    "position",
];

const SCHEDULE_TEXT: [&str; 12] = [
    "date",
    "referee",
    "score",
    "start_time",
    "round",
    "dayofweek",
    "venue",
    "result",
    "match_report",
    "game_started",
    "home_team",
    "away_team",
];

/// The kind of table being read, which fixes the textual statistics and the leading column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Season aggregates. Team tables lead with the team name.
    Aggregate { team: bool },
    /// Per-match logs of a player or team, led by the opponent.
    MatchLog,
    /// A competition's fixtures and results, led by the date.
    Schedule,
}
impl Source {
    fn textual(&self) -> &'static [&'static str] {
        match self {
            Source::Aggregate { .. } => &AGGREGATE_TEXT,
            Source::MatchLog => &MATCH_LOG_TEXT,
            Source::Schedule => &SCHEDULE_TEXT,
        }
    }

    fn leading(&self) -> Option<&'static str> {
        match self {
            Source::Aggregate { team: true } => Some(TEAM),
            Source::Aggregate { team: false } => None,
            Source::MatchLog => Some("opponent"),
            Source::Schedule => Some("date"),
        }
    }

    pub fn is_textual(&self, key: &str) -> bool {
        self.textual().contains(&key)
    }
}

fn canonical(key: &str) -> &str {
    if key == SQUAD {
        TEAM
    } else {
        key
    }
}

/// Cells of a row by `data-stat`. Data cells take precedence over header cells.
fn cells_by_stat<'a>(row: ElementRef<'a>, cells: &scraper::Selector) -> FxHashMap<&'a str, ElementRef<'a>> {
    let mut by_stat = FxHashMap::default();
    for cell in row.select(cells) {
        let Some(stat) = cell.value().attr("data-stat") else {
            continue;
        };
        if cell.value().name() == "td" {
            by_stat.insert(stat, cell);
        } else {
            by_stat.entry(stat).or_insert(cell);
        }
    }
    by_stat
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Interprets the text of a present cell.
pub fn parse_cell(text: &str, textual: bool) -> Value {
    if textual {
        return Value::Text(text.to_string());
    }
    if text.is_empty() {
        return Value::Number(0.0);
    }
    match text.replace(',', "").parse::<f64>() {
        Ok(number) => Value::Number(number),
        Err(_) => Value::Text(text.to_string()),
    }
}

fn absent(textual: bool) -> Value {
    if textual {
        Value::Text(String::new())
    } else {
        Value::Number(0.0)
    }
}

/// Extracts the requested statistics from a table body, in the order requested, preceded by the
/// source's leading column. `squad` is read into the canonical `team` column.
pub fn extract_table(
    table: ElementRef,
    keys: &[impl AsRef<str>],
    source: Source,
) -> Result<Dataset, ScrapeError> {
    let rows = selector("tr")?;
    let row_header = selector("th[scope=row]")?;
    let cells = selector("th, td")?;

    let mut names: Vec<&str> = source.leading().into_iter().collect();
    for key in keys {
        let name = canonical(key.as_ref());
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let mut columns: Vec<Vec<Value>> = vec![vec![]; names.len()];
    for row in table.select(&rows) {
        if row.select(&row_header).next().is_none() {
            continue;
        }
        let by_stat = cells_by_stat(row, &cells);
        for (name, values) in names.iter().zip(columns.iter_mut()) {
            let textual = source.is_textual(name);
            let cell = by_stat.get(name).or_else(|| {
                if *name == TEAM {
                    by_stat.get(SQUAD)
                } else {
                    None
                }
            });
            values.push(match cell {
                Some(&cell) => parse_cell(&cell_text(cell), textual),
                None => absent(textual),
            });
        }
    }

    let columns: Vec<_> = names
        .into_iter()
        .zip(columns)
        .map(|(name, values)| Column::new(name, values))
        .collect();
    let data = Dataset::with_columns(columns)?;
    debug!("extracted {} rows × {} columns ({source:?})", data.rows(), data.cols());
    Ok(data)
}
