#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::{TempDir, tempdir};

use trip_explorer::record::{TripRecord, VehicleType};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    data_dir().join(name)
}

/// Directory holding the yellow/green/vtc fixture sources.
pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// A January 2015 trip at noon with pickup coordinates, plus drop-off
/// coordinates and time for metered taxis.
pub fn trip(vehicle_type: VehicleType, day: u32) -> TripRecord {
    let pickup = Utc
        .with_ymd_and_hms(2015, 1, day, 12, 0, 0)
        .single()
        .expect("valid pickup time");
    let mut record = TripRecord::new(vehicle_type, pickup);
    record.pickup_lat = Some(40.75);
    record.pickup_lon = Some(-73.98);
    if vehicle_type.is_metered() {
        record.dropoff_lat = Some(40.72);
        record.dropoff_lon = Some(-73.99);
        record.dropoff_time = Some(pickup + chrono::Duration::minutes(12));
    }
    record
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Copies the three fixture sources into the workspace so a test can
    /// replace one of them.
    pub fn with_fixture_sources(self) -> Self {
        for name in ["yellow_data.csv", "green_data.csv", "vtc_data.csv"] {
            std::fs::copy(fixture_path(name), self.path().join(name)).expect("copy fixture");
        }
        self
    }
}
