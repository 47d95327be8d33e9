//! Query configuration: built-in defaults, an optional YAML file, then CLI
//! overrides, in increasing precedence.
//!
//! ```yaml
//! start_date: 2015-01-01
//! end_date: 2015-01-18
//! vehicle_types: [yellow, green, vtc]
//! mode: pickups
//! show_detailed_stats: true
//! stats_scope: dataset
//! ```

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    filter::{FilterCriteria, Mode},
    record::VehicleType,
};

const DEFAULT_START_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2015, 1, 1) {
    Some(date) => date,
    None => panic!("invalid default start date"),
};
const DEFAULT_END_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2015, 1, 18) {
    Some(date) => date,
    None => panic!("invalid default end date"),
};

/// Which records the fare, payment, tip and duration statistics cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum StatsScope {
    /// Every loaded trip, regardless of the active date and type filter.
    #[default]
    Dataset,
    /// Only the trips in the current filtered view.
    Filter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub vehicle_types: Vec<VehicleType>,
    pub mode: Mode,
    pub show_detailed_stats: bool,
    pub stats_scope: StatsScope,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            start_date: DEFAULT_START_DATE,
            end_date: DEFAULT_END_DATE,
            vehicle_types: VehicleType::ALL.to_vec(),
            mode: Mode::Pickups,
            show_detailed_stats: false,
            stats_scope: StatsScope::Dataset,
        }
    }
}

impl QueryConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening query file {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).context("Parsing query YAML")
    }

    pub fn from_yaml(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).context("Parsing query YAML")
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria::new(
            self.start_date,
            self.end_date,
            self.vehicle_types.iter().copied(),
            self.mode,
        )
    }
}
