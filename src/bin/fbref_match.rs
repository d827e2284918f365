use std::collections::BTreeMap;
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info};

use scoutbook::aggregate::{download_match_log, is_team_page, Framing, MATCH_LOG_DELAY};
use scoutbook::config::{lookup, Season, StatsConfig, UrlFragments};
use scoutbook::csv::write_dated_csv;
use scoutbook::file::ReadJsonFile;
use scoutbook::scrape::{Session, SessionConfig};

/// Downloads the match logs of a single player or team.
#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// directory holding matches.json and stats.json
    #[clap(short = 'c', long, default_value = "config/fbref")]
    config: PathBuf,

    /// where to write the CSV to
    #[clap(short = 'o', long, default_value = "data/fbref/match")]
    out: PathBuf,

    /// player or team key in matches.json
    #[clap(short = 'd', long)]
    dataset: Option<String>,

    /// season substituted into the URL: 'current' or the year in which it ends
    #[clap(short = 's', long, default_value = "current")]
    season: Season,

    /// team statistics conceded rather than produced
    #[clap(long)]
    vs: bool,

    /// seconds to pause between requests
    #[clap(long, default_value_t = MATCH_LOG_DELAY.as_secs_f64())]
    delay: f64,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        self.dataset
            .as_ref()
            .ok_or(anyhow::anyhow!("dataset must be specified"))?;
        if self.delay < 0.0 {
            anyhow::bail!("delay cannot be negative");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");
    let dataset = args.dataset.unwrap_or_default();

    let matches = BTreeMap::<String, UrlFragments>::read_json_file(args.config.join("matches.json"))?;
    let stats = StatsConfig::read_json_file(args.config.join("stats.json"))?;
    let fragments = lookup("match dataset", &matches, &dataset)?.with_season_placeholder(args.season);
    let framing = if is_team_page(&fragments) {
        Framing::team(args.vs)
    } else {
        Framing::players()
    };
    let categories = stats.matches(if framing.team { "team" } else { "player" })?;
    let name = fragments.name.clone().unwrap_or_else(|| dataset.clone());

    let mut session = Session::open(&SessionConfig::default())?;
    let data = download_match_log(
        &mut session,
        categories,
        &fragments,
        &name,
        framing,
        Duration::from_secs_f64(args.delay),
    )
    .await;
    session.close();
    let data = data?;

    let path = write_dated_csv(&data, args.out.join(&dataset), &framing.basename("matches"))?;
    info!("wrote {} matches to {}", data.rows(), path.display());
    Ok(())
}
