pub mod aggregate;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod explorer;
pub mod filter;
pub mod io_utils;
pub mod record;
pub mod source;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, QueryArgs, SourceArgs},
    config::QueryConfig,
    dataset::MergedDataset,
    explorer::Explorer,
    io_utils::SourceFiles,
    record::{TripRecord, VehicleType},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("trip_explorer", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Summary(args) => handle_summary(&args),
        Commands::Explore(args) => handle_explore(&args),
        Commands::Stats(args) => handle_stats(&args),
    }
}

fn handle_summary(args: &cli::SummaryArgs) -> Result<()> {
    let dataset = load_dataset(&args.sources)?;
    let mut rows = dataset
        .count_by_type()
        .into_iter()
        .map(|(vehicle_type, count)| vec![vehicle_type.to_string(), count.to_string()])
        .collect::<Vec<_>>();
    rows.push(vec!["total".to_string(), dataset.len().to_string()]);
    table::print_table(&["type".to_string(), "trips".to_string()], &rows);

    match dataset.date_span() {
        Some((first, last)) => println!("Pickups from {first} to {last}"),
        None => println!("No trips loaded"),
    }
    for warning in dataset.warnings() {
        println!("note: {warning}");
    }
    Ok(())
}

fn handle_explore(args: &cli::ExploreArgs) -> Result<()> {
    let config = resolve_query(&args.query)?;
    let explorer = Explorer::new(load_dataset(&args.sources)?);
    let outcome = explorer
        .query(&config)
        .context("Filtering trips")?;

    println!(
        "{} trip(s) between {} and {} for the selected types",
        outcome.view.len(),
        outcome.criteria.start_date,
        outcome.criteria.end_date
    );
    if args.preview > 0 && !outcome.view.is_empty() {
        let rows = outcome
            .view
            .head(args.preview)
            .iter()
            .map(|record| preview_row(record))
            .collect::<Vec<_>>();
        table::print_table(&preview_headers(), &rows);
    }

    if let Some(path) = &args.points {
        let points = outcome.view.map_points(outcome.criteria.mode);
        io_utils::write_points(path, &points)
            .with_context(|| format!("Exporting map points to {path:?}"))?;
        info!("Wrote {} map point(s) to {:?}", points.len(), path);
    }

    if let Some(detailed) = &outcome.detailed {
        println!();
        table::print_table(&stats_headers(), &detailed.render_rows());
    }
    Ok(())
}

fn handle_stats(args: &cli::StatsArgs) -> Result<()> {
    let config = resolve_query(&args.query)?;
    let explorer = Explorer::new(load_dataset(&args.sources)?);
    let result = explorer
        .statistic(&config, args.statistic)
        .with_context(|| format!("Computing {}", args.statistic))?;
    if args.json {
        let json = serde_json::to_string_pretty(&result).context("Serializing statistic")?;
        println!("{json}");
    } else {
        table::print_table(&stats_headers(), &result.render_rows());
    }
    info!("Computed {} over {} group(s)", args.statistic, result.groups.len());
    Ok(())
}

fn load_dataset(args: &SourceArgs) -> Result<MergedDataset> {
    let defaults = SourceFiles::in_dir(&args.data_dir);
    let files = SourceFiles {
        yellow: args.yellow.clone().unwrap_or(defaults.yellow),
        green: args.green.clone().unwrap_or(defaults.green),
        vtc: args.vtc.clone().unwrap_or(defaults.vtc),
    };
    for vehicle_type in VehicleType::ALL {
        debug!("{vehicle_type} source: {:?}", files.path(vehicle_type));
    }
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let sources = files.read(args.delimiter, encoding)?;
    dataset::load(&sources).context("Loading trip sources")
}

/// Defaults, then the YAML query file, then individual flags.
fn resolve_query(args: &QueryArgs) -> Result<QueryConfig> {
    let mut config = match &args.query {
        Some(path) => {
            QueryConfig::load(path).with_context(|| format!("Loading query from {path:?}"))?
        }
        None => QueryConfig::default(),
    };
    if let Some(start_date) = args.start_date {
        config.start_date = start_date;
    }
    if let Some(end_date) = args.end_date {
        config.end_date = end_date;
    }
    if !args.vehicle_types.is_empty() {
        config.vehicle_types = args.vehicle_types.clone();
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if args.detailed_stats {
        config.show_detailed_stats = true;
    }
    if let Some(scope) = args.stats_scope {
        config.stats_scope = scope;
    }
    debug!("Resolved query: {config:?}");
    Ok(config)
}

fn preview_headers() -> Vec<String> {
    [
        "type",
        "pickup_time",
        "pickup_lat",
        "pickup_lon",
        "dropoff_lat",
        "dropoff_lon",
        "passengers",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect()
}

fn preview_row(record: &TripRecord) -> Vec<String> {
    let coordinate = |value: Option<f64>| value.map(|v| format!("{v:.5}")).unwrap_or_default();
    vec![
        record.vehicle_type.to_string(),
        record
            .pickup_time
            .format("%Y-%m-%d %H:%M:%S%.3f")
            .to_string(),
        coordinate(record.pickup_lat),
        coordinate(record.pickup_lon),
        coordinate(record.dropoff_lat),
        coordinate(record.dropoff_lon),
        record.passenger_count.to_string(),
    ]
}

fn stats_headers() -> Vec<String> {
    vec![
        "statistic".to_string(),
        "group".to_string(),
        "value".to_string(),
    ]
}
