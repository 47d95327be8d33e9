use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::{aggregate::Statistic, config::StatsScope, filter::Mode, record::VehicleType};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Explore yellow, green and ride-hail trips as one dataset",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load the three sources and report row counts per vehicle type
    Summary(SummaryArgs),
    /// Filter trips and preview them, optionally exporting map points and detailed statistics
    Explore(ExploreArgs),
    /// Compute a single aggregate statistic
    Stats(StatsArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Directory holding yellow_data.csv, green_data.csv and vtc_data.csv
    #[arg(short = 'd', long = "data-dir", default_value = "data_cleaned")]
    pub data_dir: PathBuf,
    /// Yellow taxi trips (overrides the data directory)
    #[arg(long)]
    pub yellow: Option<PathBuf>,
    /// Green taxi trips (overrides the data directory)
    #[arg(long)]
    pub green: Option<PathBuf>,
    /// Ride-hail trips (overrides the data directory)
    #[arg(long)]
    pub vtc: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// YAML file with query settings; flags below override it
    #[arg(short = 'q', long = "query")]
    pub query: Option<PathBuf>,
    /// First pickup date to include (inclusive)
    #[arg(long = "start-date", value_parser = parse_date)]
    pub start_date: Option<NaiveDate>,
    /// Last pickup date to include (inclusive)
    #[arg(long = "end-date", value_parser = parse_date)]
    pub end_date: Option<NaiveDate>,
    /// Comma-separated vehicle types to include
    #[arg(short = 't', long = "vehicle-types", value_enum, value_delimiter = ',')]
    pub vehicle_types: Vec<VehicleType>,
    /// Show pickup or drop-off locations
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,
    /// Compute the detailed statistics alongside the filtered view
    #[arg(long = "detailed-stats")]
    pub detailed_stats: bool,
    /// Whether fare, payment, tip and duration statistics follow the filter
    #[arg(long = "stats-scope", value_enum)]
    pub stats_scope: Option<StatsScope>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub sources: SourceArgs,
}

#[derive(Debug, Args)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub sources: SourceArgs,
    #[command(flatten)]
    pub query: QueryArgs,
    /// Number of filtered trips to preview
    #[arg(long, default_value_t = 5)]
    pub preview: usize,
    /// Write the map points of the filtered view to this CSV file
    #[arg(long)]
    pub points: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub sources: SourceArgs,
    #[command(flatten)]
    pub query: QueryArgs,
    /// Statistic to compute
    #[arg(short = 's', long, value_enum)]
    pub statistic: Statistic,
    /// Emit the result as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value.trim(), fmt).ok())
        .ok_or_else(|| format!("Failed to parse '{value}' as date (expected YYYY-MM-DD)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_date_supports_multiple_formats() {
        let expected = NaiveDate::from_ymd_opt(2015, 1, 18).unwrap();
        assert_eq!(parse_date("2015-01-18"), Ok(expected));
        assert_eq!(parse_date("2015/01/18"), Ok(expected));
        assert_eq!(parse_date("18/01/2015"), Ok(expected));
        assert!(parse_date("January 18").is_err());
    }

    #[test]
    fn parse_delimiter_accepts_names() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("ab").is_err());
    }

    #[test]
    fn vehicle_types_split_on_commas() {
        let cli = Cli::parse_from([
            "trip-explorer",
            "explore",
            "--vehicle-types",
            "yellow,vtc",
            "--mode",
            "drop-offs",
        ]);
        let Commands::Explore(args) = cli.command else {
            panic!("expected explore command");
        };
        assert_eq!(
            args.query.vehicle_types,
            vec![VehicleType::Yellow, VehicleType::Vtc]
        );
        assert_eq!(args.query.mode, Some(Mode::Dropoffs));
    }
}
