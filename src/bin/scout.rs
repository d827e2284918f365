use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use scoutbook::analyse::{
    cluster_records, estimate_style_ratings, fit_kmeans, reduce_dimensions, ClusterCount,
    Clusterer, Projection,
};
use scoutbook::config::CategoryMap;
use scoutbook::csv::{read_csv, write_dated_csv};
use scoutbook::dataset::{Dataset, Value};
use scoutbook::file::{recurse_dir, ReadJsonFile};
use scoutbook::preprocess::{
    adjust_per_90, clamp_by_percentiles, combine, filter_categories, MINUTES,
};
use scoutbook::print::tabulate;
use scoutbook::record::RecordIndex;
use scoutbook::scale::min_max_scale;
use scoutbook::search::{search, search_similar, Criteria};
use scoutbook::vis::chart::{scatter, ScatterOptions};
use scoutbook::vis::radar::{RadarChart, RadarConfig};
use scoutbook::vis::{parse_palette, render_svg, DEFAULT_SIZE};

/// Explores a scraped dataset: threshold and similarity search, clustering, dimensionality
/// reduction, style ratings and charts.
#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// CSV file, or a directory searched recursively for CSV files
    #[clap(short = 'i', long)]
    input: PathBuf,

    /// when combining several files, keep columns that some files lack
    #[clap(long)]
    retain_nans: bool,

    /// drop records that played fewer minutes
    #[clap(long)]
    min_minutes: Option<f64>,

    /// columns converted to per-90-minute rates
    #[clap(long, value_delimiter = ',')]
    per_90: Vec<String>,

    /// columns clipped into their [alpha, 1 - alpha] quantile range
    #[clap(long, value_delimiter = ',')]
    clamp: Vec<String>,

    /// quantile used by --clamp
    #[clap(long, default_value = "0.05")]
    alpha: f64,

    /// column categories, for --keep and --drop
    #[clap(long, default_value = "config/categories.json")]
    categories: PathBuf,

    /// categories whose columns are kept, dropping all others
    #[clap(long, value_delimiter = ',')]
    keep: Vec<String>,

    /// categories whose columns are dropped
    #[clap(long, value_delimiter = ',')]
    drop: Vec<String>,

    /// directory for a dated CSV of the result
    #[clap(short = 'o', long)]
    out: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=0.5).contains(&self.alpha) {
            bail!("alpha must lie in [0, 0.5]");
        }
        if !self.keep.is_empty() && !self.drop.is_empty() {
            bail!("--keep and --drop cannot be combined");
        }
        match &self.command {
            Command::Similar { num, .. } if *num == 0 => {
                bail!("at least one similar record must be requested")
            }
            Command::Cluster { k: Some(k), .. } if *k == 0 => {
                bail!("at least one cluster must be requested")
            }
            Command::Reduce { dims, .. } if *dims == 0 => {
                bail!("at least one dimension must be requested")
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Subcommand, Clone)]
enum Command {
    /// Keeps the records satisfying a JSON criteria file
    Search {
        #[clap(short = 'c', long)]
        criteria: PathBuf,
    },

    /// Lists the records nearest to one record
    Similar {
        #[clap(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// row number or player/team name
        #[clap(short = 'r', long)]
        record: RecordIndex,

        #[clap(short = 'n', long, default_value = "10")]
        num: usize,
    },

    /// Labels every record with a cluster
    Cluster {
        #[clap(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// number of clusters; chosen by the elbow heuristic if omitted
        #[clap(short = 'k', long)]
        k: Option<usize>,
    },

    /// Projects the records onto their principal components
    Reduce {
        #[clap(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        #[clap(short = 'd', long, default_value = "2")]
        dims: usize,
    },

    /// Scores every record from 0 to 100 in each category of a rating config
    Ratings {
        #[clap(short = 'c', long)]
        config: PathBuf,
    },

    /// Draws a scatter chart of two columns to SVG
    Scatter {
        #[clap(short = 'x', long)]
        x: String,

        #[clap(short = 'y', long)]
        y: String,

        /// text column annotating each point
        #[clap(long)]
        label: Option<String>,

        /// text column to colour by
        #[clap(long)]
        colour: Option<String>,

        /// comma-separated #RRGGBB colours used with --colour
        #[clap(long, value_delimiter = ',')]
        palette: Vec<String>,

        #[clap(long)]
        means: bool,

        #[clap(long, default_value = "scatter.svg")]
        svg: PathBuf,
    },

    /// Draws a radar chart of one record, optionally against another, to SVG
    Radar {
        #[clap(short = 'c', long)]
        config: PathBuf,

        #[clap(short = 'r', long)]
        record: RecordIndex,

        #[clap(long)]
        compare: Option<RecordIndex>,

        #[clap(long, default_value = "radar.svg")]
        svg: PathBuf,
    },
}

fn load(args: &Args) -> anyhow::Result<Dataset> {
    let mut files = vec![];
    recurse_dir(args.input.clone(), &mut files, &mut |ext| ext == "csv")?;
    if files.is_empty() {
        bail!("no CSV files under {}", args.input.display());
    }
    let datasets = files
        .iter()
        .map(|file| {
            debug!("reading {}", file.display());
            read_csv(file)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut data = combine(&datasets, args.retain_nans)?;
    info!("loaded {} records from {} file(s)", data.rows(), files.len());

    if let Some(min_minutes) = args.min_minutes {
        let minutes = data.numeric(MINUTES)?;
        data = data.filter_rows(|row| minutes[row] >= min_minutes);
        info!("{} records played at least {min_minutes} minutes", data.rows());
    }
    if !args.per_90.is_empty() {
        data = adjust_per_90(&data, &args.per_90)?;
    }
    if !args.clamp.is_empty() {
        data = clamp_by_percentiles(&data, &args.clamp, args.alpha)?;
    }
    if !args.keep.is_empty() || !args.drop.is_empty() {
        let categories = CategoryMap::read_json_file(&args.categories)?;
        data = if args.keep.is_empty() {
            filter_categories(&data, &categories, &args.drop, false)?
        } else {
            filter_categories(&data, &categories, &args.keep, true)?
        };
        debug!("columns after filtering: {:?}", data.column_names());
    }
    Ok(data)
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

    let data = load(&args)?;
    let (result, basename) = match &args.command {
        Command::Search { criteria } => {
            let criteria = Criteria::read_json_file(criteria)?;
            (search(&data, &criteria)?, "search")
        }
        Command::Similar {
            columns,
            record,
            num,
        } => (search_similar(&data, columns, record, *num)?, "similar"),
        Command::Cluster { columns, k } => {
            let labels = match k {
                None => cluster_records(&data, columns, Clusterer::Auto)?,
                Some(k) => {
                    let kmeans = fit_kmeans(
                        &min_max_scale(&data, columns)?,
                        columns,
                        ClusterCount::Exactly(*k),
                    )?;
                    info!("fitted {k} clusters, inertia {:.3}", kmeans.inertia());
                    cluster_records(&data, columns, Clusterer::Fitted(&kmeans))?
                }
            };
            let mut clustered = data.clone();
            clustered.set_column(
                "cluster",
                labels.into_iter().map(|label| Value::Number(label as f64)).collect(),
            )?;
            (clustered, "clusters")
        }
        Command::Reduce { columns, dims } => {
            let reduced = reduce_dimensions(&data, columns, Projection::Auto(*dims))?;
            let mut projected = data.clone();
            for dim in 0..reduced.cols() {
                projected.set_numeric(&format!("pc{}", dim + 1), reduced.col(dim))?;
            }
            (projected, "reduced")
        }
        Command::Ratings { config } => {
            let categories = CategoryMap::read_json_file(config)?;
            (estimate_style_ratings(&data, &categories)?, "ratings")
        }
        Command::Scatter {
            x,
            y,
            label,
            colour,
            palette,
            means,
            svg,
        } => {
            let options = ScatterOptions {
                title: Some(format!("{y} vs {x}")),
                label: label.clone(),
                colour: colour.clone(),
                palette: parse_palette(palette)?,
                size: None,
                means: *means,
            };
            render_svg(svg, DEFAULT_SIZE, |area| scatter(area, &data, x, y, &options))?;
            return Ok(());
        }
        Command::Radar {
            config,
            record,
            compare,
            svg,
        } => {
            let config = RadarConfig::read_json_file(config)?;
            let chart = RadarChart::prepare(&data, &config, record, compare.as_ref())?;
            render_svg(svg, DEFAULT_SIZE, |area| chart.draw(area))?;
            return Ok(());
        }
    };

    info!("\n{}", Console::default().render(&tabulate(&result)));
    if let Some(out) = &args.out {
        let path = write_dated_csv(&result, out, basename)?;
        info!("wrote {} records to {}", result.rows(), path.display());
    }
    Ok(())
}
