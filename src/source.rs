//! Per-source readers that map raw rows onto [`TripRecord`].
//!
//! Each trip source ships its own column set: the metered-taxi exports carry
//! drop-off telemetry and fare details under differently cased names, while
//! the ride-hail export only has a pickup timestamp and position. Every
//! source is handled by one [`SourceReader`] implementation that declares
//! which canonical fields it supplies and under which column names. The
//! shared [`SourceReader::normalize`] then:
//!
//! - resolves declared fields against the table headers (case-insensitive,
//!   separators ignored, aliases honoured);
//! - fails with [`Error::Schema`] when `pickup_time` cannot be resolved;
//! - records a [`MissingFieldWarning`] for every other declared field the
//!   table lacks, defaulting it on every record;
//! - treats placeholder cells (`NA`, `null`, `nan`, ...) as null.
//!
//! Fields a reader does not declare are never read, which is how the
//! ride-hail records are guaranteed to have no drop-off data.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;

use crate::{
    error::{Error, MissingFieldWarning, Result},
    record::{PaymentType, TripRecord, VehicleType},
};

const PLACEHOLDER_TOKENS: &[&str] = &["na", "n/a", "null", "nan", "none", "#n/a"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
];

/// Header row plus string cells, exactly as read from a source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Builds a table from string slices; handy for tests and fixtures.
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    PickupLat,
    PickupLon,
    DropoffLat,
    DropoffLon,
    PickupTime,
    DropoffTime,
    PassengerCount,
    TripDistance,
    TotalFare,
    TipAmount,
    PaymentType,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::PickupLat => "pickup_lat",
            Field::PickupLon => "pickup_lon",
            Field::DropoffLat => "dropoff_lat",
            Field::DropoffLon => "dropoff_lon",
            Field::PickupTime => "pickup_time",
            Field::DropoffTime => "dropoff_time",
            Field::PassengerCount => "passenger_count",
            Field::TripDistance => "trip_distance",
            Field::TotalFare => "total_fare",
            Field::TipAmount => "tip_amount",
            Field::PaymentType => "payment_type",
        }
    }
}

/// A canonical field a reader supplies, with the extra column names it may
/// appear under in that source.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub aliases: &'static [&'static str],
}

const fn spec(field: Field, aliases: &'static [&'static str]) -> FieldSpec {
    FieldSpec { field, aliases }
}

#[derive(Debug, Clone)]
pub struct NormalizedSource {
    pub vehicle_type: VehicleType,
    pub records: Vec<TripRecord>,
    pub warnings: Vec<MissingFieldWarning>,
}

pub trait SourceReader {
    fn vehicle_type(&self) -> VehicleType;

    /// Canonical fields this source can supply. `pickup_time` must be one
    /// of them.
    fn fields(&self) -> &'static [FieldSpec];

    fn normalize(&self, table: &RawTable) -> Result<NormalizedSource> {
        let vehicle_type = self.vehicle_type();
        let columns = ColumnMap::resolve(self.fields(), &table.headers);

        let Some(pickup_index) = columns.index_of(Field::PickupTime) else {
            return Err(Error::Schema {
                vehicle_type,
                field: Field::PickupTime.name(),
                row: None,
            });
        };

        let warnings = columns
            .missing
            .iter()
            .map(|field| MissingFieldWarning {
                vehicle_type,
                field: field.name(),
            })
            .collect::<Vec<_>>();
        for warning in &warnings {
            warn!("{warning}");
        }

        let mut records = Vec::with_capacity(table.rows.len());
        for (row_idx, row) in table.rows.iter().enumerate() {
            let row_number = row_idx + 2;
            let cell = |index: usize| row.get(index).map(|s| s.as_str()).unwrap_or("");
            let invalid = |index: usize| Error::InvalidValue {
                vehicle_type,
                column: table.headers[index].clone(),
                row: row_number,
                value: cell(index).to_string(),
            };

            let raw_pickup = cell(pickup_index);
            if is_placeholder(raw_pickup) {
                return Err(Error::Schema {
                    vehicle_type,
                    field: Field::PickupTime.name(),
                    row: Some(row_number),
                });
            }
            let pickup_time = parse_timestamp(raw_pickup).ok_or_else(|| invalid(pickup_index))?;
            let mut record = TripRecord::new(vehicle_type, pickup_time);

            for &(field, index) in &columns.resolved {
                let raw = cell(index);
                if field == Field::PickupTime || is_placeholder(raw) {
                    continue;
                }
                match field {
                    Field::PickupTime => {}
                    Field::DropoffTime => {
                        record.dropoff_time =
                            Some(parse_timestamp(raw).ok_or_else(|| invalid(index))?);
                    }
                    Field::PassengerCount => {
                        record.passenger_count = parse_count(raw).ok_or_else(|| invalid(index))?;
                    }
                    Field::PaymentType => record.payment_type = Some(PaymentType::parse(raw)),
                    numeric => {
                        if let Some(slot) = float_slot(&mut record, numeric) {
                            *slot = Some(parse_float(raw).ok_or_else(|| invalid(index))?);
                        }
                    }
                }
            }
            records.push(record);
        }

        Ok(NormalizedSource {
            vehicle_type,
            records,
            warnings,
        })
    }
}

/// Yellow-cab export: full telemetry, lowercase column names.
#[derive(Debug, Clone, Copy, Default)]
pub struct YellowReader;

impl SourceReader for YellowReader {
    fn vehicle_type(&self) -> VehicleType {
        VehicleType::Yellow
    }

    fn fields(&self) -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            spec(Field::PickupLat, &["pickup_latitude"]),
            spec(Field::PickupLon, &["pickup_longitude"]),
            spec(Field::DropoffLat, &["dropoff_latitude"]),
            spec(Field::DropoffLon, &["dropoff_longitude"]),
            spec(
                Field::PickupTime,
                &["tpep_pickup_datetime", "pickup_datetime"],
            ),
            spec(
                Field::DropoffTime,
                &["tpep_dropoff_datetime", "dropoff_datetime"],
            ),
            spec(Field::PassengerCount, &[]),
            spec(Field::TripDistance, &[]),
            spec(Field::TotalFare, &["total_amount"]),
            spec(Field::TipAmount, &[]),
            spec(Field::PaymentType, &[]),
        ];
        FIELDS
    }
}

/// Green-cab export: same telemetry as yellow, capitalised column names.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreenReader;

impl SourceReader for GreenReader {
    fn vehicle_type(&self) -> VehicleType {
        VehicleType::Green
    }

    fn fields(&self) -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            spec(Field::PickupLat, &["Pickup_latitude"]),
            spec(Field::PickupLon, &["Pickup_longitude"]),
            spec(Field::DropoffLat, &["Dropoff_latitude"]),
            spec(Field::DropoffLon, &["Dropoff_longitude"]),
            spec(
                Field::PickupTime,
                &["lpep_pickup_datetime", "Lpep_pickup_datetime"],
            ),
            spec(
                Field::DropoffTime,
                &["Lpep_dropoff_datetime", "lpep_dropoff_datetime"],
            ),
            spec(Field::PassengerCount, &["Passenger_count"]),
            spec(Field::TripDistance, &["Trip_distance"]),
            spec(Field::TotalFare, &["Total_amount", "total_amount"]),
            spec(Field::TipAmount, &["Tip_amount"]),
            spec(Field::PaymentType, &["Payment_type"]),
        ];
        FIELDS
    }
}

/// Ride-hail export: pickup time and position only. Passenger count and
/// distance are read when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct VtcReader;

impl SourceReader for VtcReader {
    fn vehicle_type(&self) -> VehicleType {
        VehicleType::Vtc
    }

    fn fields(&self) -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            spec(Field::PickupLat, &["Lat"]),
            spec(Field::PickupLon, &["Lon"]),
            spec(Field::PickupTime, &["Date/Time", "pickup_datetime"]),
            spec(Field::PassengerCount, &[]),
            spec(Field::TripDistance, &["trip_miles"]),
        ];
        FIELDS
    }
}

/// The reader responsible for `vehicle_type`.
pub fn reader_for(vehicle_type: VehicleType) -> &'static dyn SourceReader {
    match vehicle_type {
        VehicleType::Yellow => &YellowReader,
        VehicleType::Green => &GreenReader,
        VehicleType::Vtc => &VtcReader,
    }
}

struct ColumnMap {
    resolved: Vec<(Field, usize)>,
    missing: Vec<Field>,
}

impl ColumnMap {
    fn resolve(fields: &[FieldSpec], headers: &[String]) -> Self {
        let normalized = headers
            .iter()
            .map(|h| normalize_header(h))
            .collect::<Vec<_>>();
        let mut resolved = Vec::with_capacity(fields.len());
        let mut missing = Vec::new();
        for field_spec in fields {
            let candidates = std::iter::once(field_spec.field.name())
                .chain(field_spec.aliases.iter().copied())
                .map(normalize_header)
                .collect::<Vec<_>>();
            match normalized
                .iter()
                .position(|header| candidates.contains(header))
            {
                Some(index) => resolved.push((field_spec.field, index)),
                None => missing.push(field_spec.field),
            }
        }
        Self { resolved, missing }
    }

    fn index_of(&self, field: Field) -> Option<usize> {
        self.resolved
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .map(|(_, index)| *index)
    }
}

fn float_slot(record: &mut TripRecord, field: Field) -> Option<&mut Option<f64>> {
    match field {
        Field::PickupLat => Some(&mut record.pickup_lat),
        Field::PickupLon => Some(&mut record.pickup_lon),
        Field::DropoffLat => Some(&mut record.dropoff_lat),
        Field::DropoffLon => Some(&mut record.dropoff_lon),
        Field::TripDistance => Some(&mut record.trip_distance),
        Field::TotalFare => Some(&mut record.total_fare),
        Field::TipAmount => Some(&mut record.tip_amount),
        _ => None,
    }
}

/// Lowercases and drops everything but ASCII letters and digits, so
/// `Passenger_count`, `passenger count` and `PASSENGERCOUNT` all match.
pub fn normalize_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || PLACEHOLDER_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
}

fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer counts; exports that widened the column to float (`"2.0"`) are
/// accepted as long as there is no fractional part.
fn parse_count(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        parse_float(trimmed)
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

/// Epoch milliseconds, or a textual date-time interpreted as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(millis) = trimmed.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    if let Some(millis) = parse_float(trimmed).filter(|v| v.fract() == 0.0) {
        return DateTime::from_timestamp_millis(millis as i64);
    }
    DATETIME_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(trimmed, fmt)
            .ok()
            .map(|naive| naive.and_utc())
    })
}
