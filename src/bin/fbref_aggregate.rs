use std::collections::BTreeMap;
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing::{debug, info};

use scoutbook::aggregate::{download_aggregate, Framing, AGGREGATE_DELAY};
use scoutbook::config::{lookup, Season, StatsConfig, UrlFragments};
use scoutbook::csv::write_dated_csv;
use scoutbook::file::ReadJsonFile;
use scoutbook::scrape::{Session, SessionConfig};

/// Downloads season aggregates for every player or team in a competition.
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

    /// aggregate dataset in stats.json: outfield, keeper or team
    #[clap(short = 't', long = "type", default_value = "outfield")]
    dataset: String,

    /// team statistics against each team rather than for it
    #[clap(long)]
    vs: bool,

    /// seconds to pause between requests
    #[clap(long, default_value_t = AGGREGATE_DELAY.as_secs_f64())]
    delay: f64,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
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

    let comps = BTreeMap::<String, UrlFragments>::read_json_file(args.config.join("comps.json"))?;
    let stats = StatsConfig::read_json_file(args.config.join("stats.json"))?;
    let fragments = lookup("competition", &comps, &args.competition)?.for_season(args.season);
    let categories = stats.aggregate(&args.dataset)?;
    let framing = if args.dataset == "team" {
        Framing::team(args.vs)
    } else {
        Framing::players()
    };

    let start_time = Instant::now();
    let mut session = Session::open(&SessionConfig::default())?;
    let data = download_aggregate(
        &mut session,
        categories,
        &fragments,
        framing,
        std::time::Duration::from_secs_f64(args.delay),
    )
    .await;
    session.close();
    let data = data?;
    info!(
        "downloaded {} rows in {:.1}s",
        data.rows(),
        start_time.elapsed().as_secs_f64()
    );

    let out_dir = args
        .out
        .join(&args.competition)
        .join(args.season.resolve().to_string());
    let path = write_dated_csv(&data, out_dir, &framing.basename(&args.dataset))?;
    info!("wrote {}", path.display());
    Ok(())
}
