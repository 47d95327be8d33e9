//! Canonical trip record shared by every stage after normalization.
//!
//! A [`TripRecord`] is produced once by a source reader and never modified
//! afterwards. Fields a source cannot supply are `None`, except
//! `passenger_count` which always holds a concrete integer.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum VehicleType {
    Yellow,
    Green,
    Vtc,
}

impl VehicleType {
    /// Canonical source order; merged datasets follow it.
    pub const ALL: [VehicleType; 3] = [VehicleType::Yellow, VehicleType::Green, VehicleType::Vtc];

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleType::Yellow => "yellow",
            VehicleType::Green => "green",
            VehicleType::Vtc => "vtc",
        }
    }

    /// Metered taxis report drop-off telemetry and fares; ride-hail does not.
    pub fn is_metered(self) -> bool {
        matches!(self, VehicleType::Yellow | VehicleType::Green)
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yellow" => Ok(VehicleType::Yellow),
            "green" => Ok(VehicleType::Green),
            "vtc" | "fhv" | "uber" => Ok(VehicleType::Vtc),
            other => Err(format!(
                "Unknown vehicle type '{other}' (expected yellow, green or vtc)"
            )),
        }
    }
}

/// Payment method, keyed by the TLC payment code where one exists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    CreditCard,
    Cash,
    NoCharge,
    Dispute,
    Unknown,
    Voided,
    Other(String),
}

impl PaymentType {
    /// Accepts either the numeric code (`"1"`, `"2.0"`) or a label
    /// (`"Credit card"`, `"CSH"`).
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(code) = trimmed.parse::<f64>()
            && code.fract() == 0.0
        {
            return match code as i64 {
                1 => PaymentType::CreditCard,
                2 => PaymentType::Cash,
                3 => PaymentType::NoCharge,
                4 => PaymentType::Dispute,
                5 => PaymentType::Unknown,
                6 => PaymentType::Voided,
                _ => PaymentType::Other(trimmed.to_string()),
            };
        }
        let lowered = trimmed.to_ascii_lowercase().replace(['_', '-'], " ");
        match lowered.as_str() {
            "credit card" | "credit" | "crd" | "card" => PaymentType::CreditCard,
            "cash" | "csh" => PaymentType::Cash,
            "no charge" | "noc" => PaymentType::NoCharge,
            "dispute" | "dis" => PaymentType::Dispute,
            "unknown" | "unk" => PaymentType::Unknown,
            "voided" | "voided trip" => PaymentType::Voided,
            _ => PaymentType::Other(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PaymentType::CreditCard => "credit card",
            PaymentType::Cash => "cash",
            PaymentType::NoCharge => "no charge",
            PaymentType::Dispute => "dispute",
            PaymentType::Unknown => "unknown",
            PaymentType::Voided => "voided",
            PaymentType::Other(label) => label,
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRecord {
    pub pickup_lat: Option<f64>,
    pub pickup_lon: Option<f64>,
    pub dropoff_lat: Option<f64>,
    pub dropoff_lon: Option<f64>,
    pub pickup_time: DateTime<Utc>,
    pub dropoff_time: Option<DateTime<Utc>>,
    pub vehicle_type: VehicleType,
    pub passenger_count: i64,
    pub trip_distance: Option<f64>,
    pub total_fare: Option<f64>,
    pub tip_amount: Option<f64>,
    pub payment_type: Option<PaymentType>,
}

impl TripRecord {
    /// A record carrying only the required fields; everything optional is
    /// at its default.
    pub fn new(vehicle_type: VehicleType, pickup_time: DateTime<Utc>) -> Self {
        Self {
            pickup_lat: None,
            pickup_lon: None,
            dropoff_lat: None,
            dropoff_lon: None,
            pickup_time,
            dropoff_time: None,
            vehicle_type,
            passenger_count: 0,
            trip_distance: None,
            total_fare: None,
            tip_amount: None,
            payment_type: None,
        }
    }

    pub fn pickup_position(&self) -> Option<(f64, f64)> {
        self.pickup_lat.zip(self.pickup_lon)
    }

    pub fn dropoff_position(&self) -> Option<(f64, f64)> {
        self.dropoff_lat.zip(self.dropoff_lon)
    }

    /// Minutes between pickup and drop-off, when both are known.
    pub fn duration_minutes(&self) -> Option<f64> {
        self.dropoff_time
            .map(|dropoff| (dropoff - self.pickup_time).num_milliseconds() as f64 / 60_000.0)
    }
}
