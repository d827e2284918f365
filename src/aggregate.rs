//! Assembling wide datasets from several categorised statistics pages.
//!
//! One page is fetched per category, paced by a fixed delay between requests. The extracted
//! tables are joined side by side by row position, keeping the first occurrence of any column
//! that more than one category supplies.

use std::time::Duration;

use tracing::{debug, info};

use crate::config::{CategoryMap, Season, UrlFragments};
use crate::dataset::{Dataset, Value};
use crate::extract::{extract_table, Source};
use crate::scrape::{aggregate_table, match_log_table, schedule_table, Page, ScrapeError, Session};

pub const AGGREGATE_DELAY: Duration = Duration::from_secs(5);
pub const MATCH_LOG_DELAY: Duration = Duration::from_secs(7);

/// Column holding the player or team a match log belongs to.
pub const NAME: &str = "name";

/// Whose statistics to read from a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Framing {
    /// Team-level rather than player-level statistics.
    pub team: bool,
    /// For team statistics, those conceded by each team rather than produced by it.
    pub vs: bool,
}
impl Framing {
    pub fn players() -> Self {
        Self::default()
    }

    pub fn team(vs: bool) -> Self {
        Self { team: true, vs }
    }

    /// Output file basename for a dataset, suffixed `_for` or `_vs` for team statistics.
    pub fn basename(&self, dataset: &str) -> String {
        match (self.team, self.vs) {
            (false, _) => dataset.to_string(),
            (true, false) => format!("{dataset}_for"),
            (true, true) => format!("{dataset}_vs"),
        }
    }
}

/// Team match-log pages live under the squads section of the site.
pub fn is_team_page(fragments: &UrlFragments) -> bool {
    fragments.top.contains("squads")
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    Aggregate,
    MatchLog,
}

/// Extracts one category's table from a fetched page.
fn extract_category(
    page: &Page,
    category: &str,
    keys: &[String],
    framing: Framing,
    layout: Layout,
) -> Result<Dataset, ScrapeError> {
    let tables = page.tables_by_id()?;
    match layout {
        Layout::Aggregate => {
            let table = aggregate_table(&tables, category, framing.team, framing.vs)?;
            extract_table(*table, keys, Source::Aggregate { team: framing.team })
        }
        Layout::MatchLog => {
            let table = match_log_table(&tables, framing.team, framing.vs)?;
            extract_table(*table, keys, Source::MatchLog)
        }
    }
}

async fn download_categories(
    session: &mut Session,
    categories: &CategoryMap,
    fragments: &UrlFragments,
    framing: Framing,
    layout: Layout,
    delay: Duration,
) -> Result<Dataset, ScrapeError> {
    let mut parts = Vec::with_capacity(categories.len());
    for (index, (category, keys)) in categories.iter().enumerate() {
        if index > 0 {
            debug!("pausing {delay:?} before the next request");
            tokio::time::sleep(delay).await;
        }
        let page = session.fetch(&fragments.url(category)).await?;
        let part = extract_category(&page, category, keys, framing, layout)?;
        debug!("category {category}: {} rows × {} columns", part.rows(), part.cols());
        parts.push(part);
    }
    Ok(Dataset::hconcat(parts))
}

/// Season aggregates of every player or team in a competition, one page per category.
pub async fn download_aggregate(
    session: &mut Session,
    categories: &CategoryMap,
    fragments: &UrlFragments,
    framing: Framing,
    delay: Duration,
) -> Result<Dataset, ScrapeError> {
    let data = download_categories(session, categories, fragments, framing, Layout::Aggregate, delay).await?;
    info!("downloaded {} aggregate rows × {} columns", data.rows(), data.cols());
    Ok(data)
}

/// Per-match statistics of a single player or team. Every row is tagged with `name` in a
/// trailing [NAME] column.
pub async fn download_match_log(
    session: &mut Session,
    categories: &CategoryMap,
    fragments: &UrlFragments,
    name: &str,
    framing: Framing,
    delay: Duration,
) -> Result<Dataset, ScrapeError> {
    let mut data = download_categories(session, categories, fragments, framing, Layout::MatchLog, delay).await?;
    data.set_column(NAME, vec![Value::from(name); data.rows()])?;
    info!("downloaded {} matches for {name}", data.rows());
    Ok(data)
}

/// Fixtures, scorelines and expected goals for a competition season.
pub async fn download_schedule(
    session: &mut Session,
    keys: &[impl AsRef<str>],
    fragments: &UrlFragments,
    season: Season,
) -> Result<Dataset, ScrapeError> {
    let url = fragments.schedule_url(season)?;
    let page = session.fetch(&url).await?;
    let tables = page.tables_by_id()?;
    let data = extract_table(*schedule_table(&tables)?, keys, Source::Schedule)?;
    info!("downloaded {} fixtures for {}", data.rows(), season.resolve());
    Ok(data)
}
