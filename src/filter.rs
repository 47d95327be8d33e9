use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    dataset,
    error::{Error, Result},
    record::{TripRecord, VehicleType},
};

/// Which end of the trip the map shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Pickups,
    #[serde(alias = "drop-offs")]
    #[value(alias = "drop-offs")]
    Dropoffs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Selection order is kept; it decides map layer order.
    pub vehicle_types: Vec<VehicleType>,
    pub mode: Mode,
}

impl FilterCriteria {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        vehicle_types: impl IntoIterator<Item = VehicleType>,
        mode: Mode,
    ) -> Self {
        let mut selected = Vec::new();
        for vehicle_type in vehicle_types {
            if !selected.contains(&vehicle_type) {
                selected.push(vehicle_type);
            }
        }
        Self {
            start_date,
            end_date,
            vehicle_types: selected,
            mode,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(Error::InvalidRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }

    /// Date window and vehicle selection, without the coordinate rule.
    fn admits(&self, record: &TripRecord) -> bool {
        let date = record.pickup_time.date_naive();
        date >= self.start_date
            && date <= self.end_date
            && self.vehicle_types.contains(&record.vehicle_type)
    }

    /// Records without coordinates for the selected end of the trip are
    /// dropped, whatever their vehicle type.
    fn has_coordinates(&self, record: &TripRecord) -> bool {
        match self.mode {
            Mode::Pickups => record.pickup_position().is_some(),
            Mode::Dropoffs => record.dropoff_position().is_some(),
        }
    }

    pub fn matches(&self, record: &TripRecord) -> bool {
        self.admits(record) && self.has_coordinates(record)
    }
}

/// Filters any record collection (the merged dataset or an earlier view).
/// Order is preserved and the input is never touched.
pub fn filter<'a, I>(records: I, criteria: &FilterCriteria) -> Result<FilteredView<'a>>
where
    I: IntoIterator<Item = &'a TripRecord>,
{
    criteria.validate()?;
    if criteria.vehicle_types.is_empty() {
        return Ok(FilteredView::default());
    }
    let rows = records
        .into_iter()
        .filter(|record| criteria.matches(record))
        .collect();
    Ok(FilteredView { rows })
}

/// Borrowed, order-preserving subset of a record collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredView<'a> {
    rows: Vec<&'a TripRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn from_rows(rows: Vec<&'a TripRecord>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[&'a TripRecord] {
        &self.rows
    }

    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, &'a TripRecord>> {
        self.rows.iter().copied()
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> &[&'a TripRecord] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn count_by_type(&self) -> Vec<(VehicleType, usize)> {
        dataset::count_by_type(self.iter())
    }

    /// One point per record that has coordinates for `mode`.
    pub fn map_points(&self, mode: Mode) -> Vec<MapPoint> {
        self.iter()
            .filter_map(|record| MapPoint::for_record(record, mode))
            .collect()
    }

    /// Points grouped per vehicle type in the given order. Every listed type
    /// gets a layer, even an empty one.
    pub fn layers(&self, mode: Mode, vehicle_types: &[VehicleType]) -> Vec<MapLayer> {
        vehicle_types
            .iter()
            .map(|vehicle_type| MapLayer {
                vehicle_type: *vehicle_type,
                points: self
                    .iter()
                    .filter(|record| record.vehicle_type == *vehicle_type)
                    .filter_map(|record| MapPoint::for_record(record, mode))
                    .collect(),
            })
            .collect()
    }
}

impl<'v, 'a> IntoIterator for &'v FilteredView<'a> {
    type Item = &'a TripRecord;
    type IntoIter = std::iter::Copied<std::slice::Iter<'v, &'a TripRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapPoint {
    pub vehicle_type: VehicleType,
    pub lat: f64,
    pub lon: f64,
}

impl MapPoint {
    fn for_record(record: &TripRecord, mode: Mode) -> Option<Self> {
        let (lat, lon) = match mode {
            Mode::Pickups => record.pickup_position()?,
            Mode::Dropoffs => record.dropoff_position()?,
        };
        Some(Self {
            vehicle_type: record.vehicle_type,
            lat,
            lon,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub vehicle_type: VehicleType,
    pub points: Vec<MapPoint>,
}
