//! Error taxonomy for the trip pipeline.
//!
//! Structural problems (a source without a pickup timestamp column, an
//! unparseable cell, an inverted date range) are hard errors. Optional columns
//! that a source does not carry are not errors: they surface as
//! [`MissingFieldWarning`]s and are resolved by defaulting.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::record::VehicleType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A required field is absent; the load for that source is aborted.
    #[error("{vehicle_type} source: required field '{field}' is missing{}", row_suffix(.row))]
    Schema {
        vehicle_type: VehicleType,
        field: &'static str,
        row: Option<usize>,
    },
    #[error("{vehicle_type} source: row {row} column '{column}' has invalid value '{value}'")]
    InvalidValue {
        vehicle_type: VehicleType,
        column: String,
        row: usize,
        value: String,
    },
    #[error("Start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|row| format!(" in row {row}")).unwrap_or_default()
}

/// An optional column the source does not provide. Every affected record
/// carries the field's default instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingFieldWarning {
    pub vehicle_type: VehicleType,
    pub field: &'static str,
}

impl fmt::Display for MissingFieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} source has no '{}' column; defaulting",
            self.vehicle_type, self.field
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_mentions_row_when_known() {
        let err = Error::Schema {
            vehicle_type: VehicleType::Green,
            field: "pickup_time",
            row: Some(4),
        };
        assert_eq!(
            err.to_string(),
            "green source: required field 'pickup_time' is missing in row 4"
        );

        let err = Error::Schema {
            vehicle_type: VehicleType::Vtc,
            field: "pickup_time",
            row: None,
        };
        assert_eq!(
            err.to_string(),
            "vtc source: required field 'pickup_time' is missing"
        );
    }
}
