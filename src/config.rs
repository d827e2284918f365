//! Configuration: statistic categories, URL fragments for data sources, and seasons.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::str::FromStr;

use chrono::{Datelike, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Placeholder substituted with the season string in URL fragments.
pub const SEASON_PLACEHOLDER: &str = "$season$";

#[derive(Debug, Error, PartialEq)]
#[error("no {kind} {key:?}, available: {available:?}")]
pub struct LookupError {
    pub kind: &'static str,
    pub key: String,
    pub available: Vec<String>,
}
impl LookupError {
    pub fn new<'a>(
        kind: &'static str,
        key: impl Into<String>,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut available: Vec<_> = available.into_iter().map(ToString::to_string).collect();
        available.sort();
        Self {
            kind,
            key: key.into(),
            available,
        }
    }
}

/// Looks up `key` in a map, failing with the list of valid keys.
pub fn lookup<'a, V>(
    kind: &'static str,
    map: &'a BTreeMap<String, V>,
    key: &str,
) -> Result<&'a V, LookupError> {
    map.get(key)
        .ok_or_else(|| LookupError::new(kind, key, map.keys().map(String::as_str)))
}

/// An ordered mapping from a category name to the statistic keys (column names) within it.
/// Order is preserved as written in the source JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryMap(Vec<(String, Vec<String>)>);
impl CategoryMap {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(category, keys)| (category.as_str(), keys.as_slice()))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(category, _)| category.as_str())
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, keys)| keys.as_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flattens the keys of the `selected` categories into one list, in category order, keeping
    /// the first appearance of any repeated key. Every selected category must exist.
    pub fn resolve(&self, selected: &[impl AsRef<str>]) -> Result<Vec<String>, LookupError> {
        for category in selected {
            if self.get(category.as_ref()).is_none() {
                return Err(LookupError::new("category", category.as_ref(), self.categories()));
            }
        }
        let mut keys: Vec<String> = vec![];
        for (category, category_keys) in self.iter() {
            if !selected.iter().any(|selected| selected.as_ref() == category) {
                continue;
            }
            for key in category_keys {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }
        Ok(keys)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Vec<V>)> for CategoryMap {
    fn from_iter<T: IntoIterator<Item = (K, Vec<V>)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(category, keys)| (category.into(), keys.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for CategoryMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_ordered(deserializer).map(CategoryMap)
    }
}

/// Reads a JSON object into its entries, in the order written.
pub fn deserialize_ordered<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct OrderedVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
            formatter.write_str("a map keyed by name")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(access.size_hint().unwrap_or_default());
            while let Some(entry) = access.next_entry::<String, V>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedVisitor(PhantomData))
}

/// The layout of `stats.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Season-aggregate statistics, keyed by dataset (e.g. `outfield`, `keeper`, `team`).
    pub aggregate: BTreeMap<String, CategoryMap>,

    /// Match-level statistics, keyed by `player`, `team` and `competition`.
    #[serde(rename = "match")]
    pub matches: BTreeMap<String, CategoryMap>,
}
impl StatsConfig {
    pub fn aggregate(&self, dataset: &str) -> Result<&CategoryMap, LookupError> {
        lookup("aggregate dataset", &self.aggregate, dataset)
    }

    pub fn matches(&self, dataset: &str) -> Result<&CategoryMap, LookupError> {
        lookup("match dataset", &self.matches, dataset)
    }
}

/// URL fragments for a competition or a team/player match log. Request URLs are formed by
/// concatenating `top`, a category and `end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlFragments {
    pub top: String,
    pub end: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub schedule_end: Option<String>,
}
impl UrlFragments {
    /// Substitutes the season placeholder in both fragments. A [Season::Current] resolves
    /// through the clock.
    pub fn with_season_placeholder(&self, season: Season) -> UrlFragments {
        let season = season.resolve().to_string();
        UrlFragments {
            top: self.top.replace(SEASON_PLACEHOLDER, &season),
            end: self.end.replace(SEASON_PLACEHOLDER, &season),
            ..self.clone()
        }
    }

    /// Points the fragments at a past season, following the competition page layout
    /// `{top}{season}/{category}/{season}-{end without its leading separator}`. The current
    /// season needs no change.
    pub fn for_season(&self, season: Season) -> UrlFragments {
        match season {
            Season::Current => self.clone(),
            Season::Ending(_) => {
                let season = season.to_string();
                let end = self.end.get(1..).unwrap_or_default();
                UrlFragments {
                    top: format!("{}{season}/", self.top),
                    end: format!("/{season}-{end}"),
                    ..self.clone()
                }
            }
        }
    }

    pub fn url(&self, category: &str) -> String {
        format!("{}{category}{}", self.top, self.end)
    }

    /// The fixtures-and-results page of a competition season.
    pub fn schedule_url(&self, season: Season) -> Result<String, LookupError> {
        let end = self
            .schedule_end
            .as_ref()
            .ok_or_else(|| LookupError::new("URL fragment", "schedule_end", ["top", "end"]))?;
        let season = season.resolve();
        Ok(format!("{}{season}/schedule/{season}{end}", self.top))
    }
}

/// A season, named by the calendar year in which it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Current,
    Ending(i32),
}
impl Season {
    /// Replaces [Season::Current] with a concrete season. Seasons roll over in August.
    pub fn resolve(self) -> Season {
        match self {
            Season::Current => {
                let today = Utc::now().date_naive();
                let year = if today.month() >= 8 {
                    today.year() + 1
                } else {
                    today.year()
                };
                Season::Ending(year)
            }
            ending => ending,
        }
    }
}

impl Display for Season {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Season::Current => write!(f, "current"),
            Season::Ending(year) => write!(f, "{}-{year}", year - 1),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid season {0:?}, expected 'current' or a year")]
pub struct SeasonParseError(String);

impl FromStr for Season {
    type Err = SeasonParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("current") {
            return Ok(Season::Current);
        }
        s.parse()
            .map(Season::Ending)
            .map_err(|_| SeasonParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_map_preserves_order() {
        let map: CategoryMap = serde_json::from_str(
            r#"{"stats": ["player", "goals"], "shooting": ["shots"], "passing": ["passes", "goals"]}"#,
        )
        .unwrap();
        assert_eq!(
            vec!["stats", "shooting", "passing"],
            map.categories().collect::<Vec<_>>()
        );
        assert_eq!(Some(&["shots".to_string()][..]), map.get("shooting"));
    }

    #[test]
    fn resolve_flattens_in_category_order_without_repeats() {
        let map = CategoryMap::from_iter([
            ("attack", vec!["goals", "assists"]),
            ("creation", vec!["assists", "key_passes"]),
            ("defense", vec!["tackles"]),
        ]);
        assert_eq!(
            vec!["goals", "assists", "key_passes"],
            map.resolve(&["creation", "attack"]).unwrap()
        );
    }

    #[test]
    fn resolve_unknown_category() {
        let map = CategoryMap::from_iter([("defense", vec!["tackles"]), ("attack", vec!["goals"])]);
        assert_eq!(
            LookupError {
                kind: "category",
                key: "keeping".into(),
                available: vec!["attack".into(), "defense".into()],
            },
            map.resolve(&["keeping"]).unwrap_err()
        );
    }

    #[test]
    fn lookup_names_alternatives() {
        let comps: BTreeMap<String, UrlFragments> = serde_json::from_str(
            r#"{"pl": {"top": "https://fbref.com/en/comps/9/", "end": "/Premier-League-Stats"},
                "laliga": {"top": "https://fbref.com/en/comps/12/", "end": "/La-Liga-Stats"}}"#,
        )
        .unwrap();
        let err = lookup("competition", &comps, "seriea").unwrap_err();
        assert_eq!(vec!["laliga", "pl"], err.available);
        assert_eq!(
            "no competition \"seriea\", available: [\"laliga\", \"pl\"]",
            err.to_string()
        );
    }

    #[test]
    fn season_string() {
        assert_eq!("2021-2022", Season::Ending(2022).to_string());
        assert_eq!(Ok(Season::Ending(2022)), "2022".parse());
        assert_eq!(Ok(Season::Current), "current".parse());
        assert!("next".parse::<Season>().is_err());
        assert!(matches!(Season::Current.resolve(), Season::Ending(_)));
    }

    #[test]
    fn season_placeholder() {
        let fragments = UrlFragments {
            top: "https://fbref.com/en/squads/19538871/$season$/matchlogs/all_comps/".into(),
            end: "/Manchester-United-Match-Logs-All-Competitions".into(),
            name: Some("Manchester United".into()),
            schedule_end: None,
        };
        let resolved = fragments.with_season_placeholder(Season::Ending(2026));
        assert_eq!(
            "https://fbref.com/en/squads/19538871/2025-2026/matchlogs/all_comps/",
            resolved.top
        );
        assert_eq!(fragments.end, resolved.end);
    }

    #[test]
    fn past_season_urls() {
        let fragments = UrlFragments {
            top: "https://fbref.com/en/comps/9/".into(),
            end: "/Premier-League-Stats".into(),
            name: None,
            schedule_end: Some("-Premier-League-Scores-and-Fixtures".into()),
        };
        assert_eq!(
            "https://fbref.com/en/comps/9/shooting/Premier-League-Stats",
            fragments.for_season(Season::Current).url("shooting")
        );
        assert_eq!(
            "https://fbref.com/en/comps/9/2021-2022/shooting/2021-2022-Premier-League-Stats",
            fragments.for_season(Season::Ending(2022)).url("shooting")
        );
        assert_eq!(
            "https://fbref.com/en/comps/9/2021-2022/schedule/2021-2022-Premier-League-Scores-and-Fixtures",
            fragments.schedule_url(Season::Ending(2022)).unwrap()
        );
    }

    #[test]
    fn stats_config_layout() {
        let config: StatsConfig = serde_json::from_str(
            r#"{
                "aggregate": {"outfield": {"stats": ["player", "goals"]}, "team": {"stats": ["goals"]}},
                "match": {"player": {"summary": ["date", "minutes"]}}
            }"#,
        )
        .unwrap();
        assert_eq!(1, config.aggregate("outfield").unwrap().len());
        let err = config.aggregate("keeper").unwrap_err();
        assert_eq!(vec!["outfield", "team"], err.available);
        assert!(config.matches("player").is_ok());
    }
}
