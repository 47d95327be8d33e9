//! Merging normalized sources into one immutable collection.
//!
//! [`load`] runs each source's reader and concatenates the results in the
//! fixed order yellow, green, vtc. The resulting [`MergedDataset`] is shared
//! behind an `Arc` and exposes no mutating API; filters and aggregations
//! borrow from it.

use std::sync::Arc;

use chrono::NaiveDate;
use itertools::{Itertools, MinMaxResult};
use log::{debug, info};

use crate::{
    error::{MissingFieldWarning, Result},
    record::{TripRecord, VehicleType},
    source::{NormalizedSource, RawTable, reader_for},
};

/// Raw tables for the three trip sources.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub yellow: RawTable,
    pub green: RawTable,
    pub vtc: RawTable,
}

impl Sources {
    pub fn table(&self, vehicle_type: VehicleType) -> &RawTable {
        match vehicle_type {
            VehicleType::Yellow => &self.yellow,
            VehicleType::Green => &self.green,
            VehicleType::Vtc => &self.vtc,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MergedDataset {
    records: Arc<[TripRecord]>,
    warnings: Arc<[MissingFieldWarning]>,
}

impl MergedDataset {
    /// Wraps already-normalized records without any reordering.
    pub fn from_records(records: Vec<TripRecord>) -> Self {
        Self {
            records: records.into(),
            warnings: Vec::new().into(),
        }
    }

    pub fn records(&self) -> &[TripRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TripRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Optional columns that were defaulted during normalization.
    pub fn warnings(&self) -> &[MissingFieldWarning] {
        &self.warnings
    }

    /// Row counts per vehicle type, in canonical order, zero counts included.
    pub fn count_by_type(&self) -> Vec<(VehicleType, usize)> {
        count_by_type(self.records.iter())
    }

    /// Earliest and latest pickup calendar dates.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self
            .records
            .iter()
            .map(|record| record.pickup_time.date_naive())
            .minmax()
        {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(date) => Some((date, date)),
            MinMaxResult::MinMax(min, max) => Some((min, max)),
        }
    }
}

impl<'a> IntoIterator for &'a MergedDataset {
    type Item = &'a TripRecord;
    type IntoIter = std::slice::Iter<'a, TripRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

pub(crate) fn count_by_type<'a, I>(records: I) -> Vec<(VehicleType, usize)>
where
    I: IntoIterator<Item = &'a TripRecord>,
{
    let counts = records
        .into_iter()
        .counts_by(|record| record.vehicle_type);
    VehicleType::ALL
        .iter()
        .map(|vehicle_type| (*vehicle_type, counts.get(vehicle_type).copied().unwrap_or(0)))
        .collect()
}

/// Concatenates the three normalized sources as yellow, green, vtc. Sources
/// with zero rows are fine; the result length is always the sum of the
/// inputs.
pub fn merge(
    yellow: NormalizedSource,
    green: NormalizedSource,
    vtc: NormalizedSource,
) -> MergedDataset {
    let total = yellow.records.len() + green.records.len() + vtc.records.len();
    let mut records = Vec::with_capacity(total);
    let mut warnings = Vec::new();
    for (expected, source) in VehicleType::ALL.into_iter().zip([yellow, green, vtc]) {
        debug_assert_eq!(source.vehicle_type, expected);
        debug!(
            "Merging {} {} record(s)",
            source.records.len(),
            source.vehicle_type
        );
        records.extend(source.records);
        warnings.extend(source.warnings);
    }
    MergedDataset {
        records: records.into(),
        warnings: warnings.into(),
    }
}

/// Normalizes every source with its reader and merges the results. The
/// first source that fails normalization aborts the load.
pub fn load(sources: &Sources) -> Result<MergedDataset> {
    let normalize = |vehicle_type: VehicleType| -> Result<NormalizedSource> {
        let source = reader_for(vehicle_type).normalize(sources.table(vehicle_type))?;
        info!(
            "Normalized {} {} record(s)",
            source.records.len(),
            vehicle_type
        );
        Ok(source)
    };
    let yellow = normalize(VehicleType::Yellow)?;
    let green = normalize(VehicleType::Green)?;
    let vtc = normalize(VehicleType::Vtc)?;

    let dataset = merge(yellow, green, vtc);
    info!("Merged dataset holds {} trip(s)", dataset.len());
    Ok(dataset)
}
