use std::collections::BTreeMap;
use std::env;
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, info};

use scoutbook::aggregate::download_schedule;
use scoutbook::config::{lookup, LookupError, Season, StatsConfig, UrlFragments};
use scoutbook::csv::write_dated_csv;
use scoutbook::file::ReadJsonFile;
use scoutbook::scrape::{Session, SessionConfig};

const SCHEDULE: &str = "schedule";

/// Downloads the fixtures, scorelines and expected goals of one competition season.
#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// directory holding comps.json and stats.json
    #[clap(short = 'c', long, default_value = "config/fbref")]
    config: PathBuf,

    /// where to write the CSV to
    #[clap(short = 'o', long, default_value = "data/fbref")]
    out: PathBuf,

    /// competition key in comps.json
    #[clap(long, default_value = "pl")]
    competition: String,

    /// 'current' or the year in which the season ends
    #[clap(short = 's', long, default_value = "current")]
    season: Season,
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
    debug!("args: {args:?}");

    let comps = BTreeMap::<String, UrlFragments>::read_json_file(args.config.join("comps.json"))?;
    let stats = StatsConfig::read_json_file(args.config.join("stats.json"))?;
    let fragments = lookup("competition", &comps, &args.competition)?;
    let competition = stats.matches("competition")?;
    let keys = competition
        .get(SCHEDULE)
        .ok_or_else(|| LookupError::new("competition category", SCHEDULE, competition.categories()))?;

    let mut session = Session::open(&SessionConfig::default())?;
    let data = download_schedule(&mut session, keys, fragments, args.season).await;
    session.close();
    let data = data?;

    let out_dir = args
        .out
        .join(&args.competition)
        .join(args.season.resolve().to_string());
    let path = write_dated_csv(&data, out_dir, "matches")?;
    info!("wrote {} fixtures to {}", data.rows(), path.display());
    Ok(())
}
