//! Fetching statistics pages and locating their tables.

use std::collections::BTreeMap;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::LookupError;
use crate::dataset::DatasetError;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid selector {0:?}")]
    Selector(String),

    #[error("{0}")]
    Regex(#[from] regex::Error),

    #[error("{0}")]
    Lookup(#[from] LookupError),

    #[error("{0}")]
    Dataset(#[from] DatasetError),
}

pub(crate) fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|_| ScrapeError::Selector(css.to_string()))
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub user_agent: String,
    pub timeout: Duration,
}
impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("scoutbook/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
        }
    }
}

/// A scraping session. Open one before fetching and close it when done; nothing is shared
/// between sessions.
pub struct Session {
    client: reqwest::Client,
    fetches: usize,
}
impl Session {
    pub fn open(config: &SessionConfig) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        debug!("opened session with {config:?}");
        Ok(Self { client, fetches: 0 })
    }

    /// Fetches and parses a page. Tables hidden inside HTML comments are exposed.
    pub async fn fetch(&mut self, url: &str) -> Result<Page, ScrapeError> {
        info!("fetching {url}");
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        self.fetches += 1;
        Page::parse(&body)
    }

    pub fn fetches(&self) -> usize {
        self.fetches
    }

    pub fn close(self) {
        debug!("closed session after {} fetches", self.fetches);
    }
}

/// Removes comment delimiters so that commented-out markup is parsed as live content.
pub fn strip_comment_markers(html: &str) -> Result<String, regex::Error> {
    let markers = Regex::new("<!--|-->")?;
    Ok(markers.replace_all(html, "").into_owned())
}

pub struct Page {
    html: Html,
}
impl Page {
    pub fn parse(body: &str) -> Result<Self, ScrapeError> {
        Ok(Self {
            html: Html::parse_document(&strip_comment_markers(body)?),
        })
    }

    /// Every table body on the page, in document order.
    pub fn tables(&self) -> Result<Vec<ElementRef>, ScrapeError> {
        let tbody = selector("tbody")?;
        Ok(self.html.select(&tbody).collect())
    }

    /// Table bodies keyed by the `id` of their table. Tables without an id are left out.
    pub fn tables_by_id(&self) -> Result<BTreeMap<String, ElementRef>, ScrapeError> {
        let table = selector("table[id]")?;
        let tbody = selector("tbody")?;
        let mut tables = BTreeMap::new();
        for element in self.html.select(&table) {
            if let (Some(id), Some(body)) = (element.value().id(), element.select(&tbody).next()) {
                tables.entry(id.to_string()).or_insert(body);
            }
        }
        Ok(tables)
    }
}

/// Table-id spellings of categories whose URL segment differs.
fn table_category(category: &str) -> &str {
    match category {
        "stats" => "standard",
        "playingtime" => "playing_time",
        "keepers" => "keeper",
        "keepersadv" => "keeper_adv",
        other => other,
    }
}

fn framing(vs: bool) -> &'static str {
    if vs {
        "against"
    } else {
        "for"
    }
}

/// Locates the season-aggregate table for a category. Player tables are `stats_{category}`;
/// team tables are `stats_squads_{category}_{for|against}`. Alternative spellings are tried
/// next, then any table whose id contains the category.
pub fn aggregate_table<'a, T>(
    tables: &'a BTreeMap<String, T>,
    category: &str,
    team: bool,
    vs: bool,
) -> Result<&'a T, LookupError> {
    let mapped = table_category(category);
    let candidates = if team {
        let suffix = framing(vs);
        vec![
            format!("stats_squads_{mapped}_{suffix}"),
            format!("stats_{mapped}_squads_{suffix}"),
            format!("stats_squads_{category}_{suffix}"),
        ]
    } else {
        vec![
            format!("stats_{mapped}"),
            format!("stats_{category}"),
            category.to_string(),
        ]
    };
    if let Some(table) = candidates.iter().find_map(|id| tables.get(id)) {
        return Ok(table);
    }

    tables
        .iter()
        .find(|(id, _)| {
            if !id.contains(category) && !id.contains(mapped) {
                return false;
            }
            let squad = id.contains("squad");
            if team {
                squad && id.contains("against") == vs
            } else {
                !squad
            }
        })
        .map(|(_, table)| table)
        .ok_or_else(|| {
            LookupError::new(
                "table for category",
                category,
                tables.keys().map(String::as_str),
            )
        })
}

/// Locates a match-log table: `matchlogs_all` for players, `matchlogs_{for|against}` for
/// teams.
pub fn match_log_table<'a, T>(
    tables: &'a BTreeMap<String, T>,
    team: bool,
    vs: bool,
) -> Result<&'a T, LookupError> {
    let id = if team {
        format!("matchlogs_{}", framing(vs))
    } else {
        "matchlogs_all".to_string()
    };
    tables
        .get(&id)
        .ok_or_else(|| LookupError::new("match log table", id, tables.keys().map(String::as_str)))
}

/// Locates the fixtures table of a competition schedule page, the first with a `sched_` id.
pub fn schedule_table<T>(tables: &BTreeMap<String, T>) -> Result<&T, LookupError> {
    tables
        .iter()
        .find(|(id, _)| id.starts_with("sched_"))
        .map(|(_, table)| table)
        .ok_or_else(|| LookupError::new("schedule table", "sched_*", tables.keys().map(String::as_str)))
}
