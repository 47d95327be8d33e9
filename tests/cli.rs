mod common;

use std::fs;

use assert_cmd::Command;
use predicates::{prelude::*, str::contains};

use common::{TestWorkspace, data_dir};

fn trip_explorer() -> Command {
    let mut command = Command::cargo_bin("trip-explorer").expect("binary exists");
    command.env("RUST_LOG", "off");
    command
}

fn data_dir_arg() -> String {
    data_dir().to_str().expect("utf-8 path").to_string()
}

#[test]
fn summary_reports_counts_per_type() {
    let output = trip_explorer()
        .args(["summary", "--data-dir", &data_dir_arg()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).expect("utf-8 output");

    assert!(stdout.contains("yellow      2"));
    assert!(stdout.contains("green       1"));
    assert!(stdout.contains("vtc         1"));
    assert!(stdout.contains("total       4"));
    assert!(stdout.contains("Pickups from 2015-01-05 to 2015-01-20"));
    assert!(stdout.contains("note: vtc source has no 'passenger_count' column; defaulting"));
}

#[test]
fn explore_uses_default_window() {
    trip_explorer()
        .args(["explore", "--data-dir", &data_dir_arg()])
        .assert()
        .success()
        .stdout(contains(
            "3 trip(s) between 2015-01-01 and 2015-01-18 for the selected types",
        ))
        .stdout(contains("2015-01-05 08:30:00.000"));
}

#[test]
fn explore_dropoffs_for_ride_hail_is_empty() {
    trip_explorer()
        .args([
            "explore",
            "--data-dir",
            &data_dir_arg(),
            "--mode",
            "dropoffs",
            "--vehicle-types",
            "vtc",
        ])
        .assert()
        .success()
        .stdout(contains("0 trip(s) between"));
}

#[test]
fn explore_rejects_inverted_dates() {
    trip_explorer()
        .args([
            "explore",
            "--data-dir",
            &data_dir_arg(),
            "--start-date",
            "2015-01-18",
            "--end-date",
            "2015-01-01",
        ])
        .assert()
        .failure()
        .stderr(contains("Start date 2015-01-18 is after end date 2015-01-01"));
}

#[test]
fn stats_tip_rate_as_json() {
    let output = trip_explorer()
        .args([
            "stats",
            "--data-dir",
            &data_dir_arg(),
            "--statistic",
            "tip-rate",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).expect("parse json");

    assert_eq!(value["statistic"], "tip-rate");
    assert_eq!(value["groups"][0]["group"], "all");
    let rate = value["groups"][0]["metric"].as_f64().expect("numeric rate");
    assert!((rate - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn stats_passenger_sum_follows_the_filter() {
    trip_explorer()
        .args([
            "stats",
            "--data-dir",
            &data_dir_arg(),
            "-s",
            "passenger-sum",
            "--vehicle-types",
            "green,vtc",
        ])
        .assert()
        .success()
        .stdout(contains("passengers  green      3"))
        .stdout(contains("passengers  vtc        0"));
}

#[test]
fn query_file_drives_explore_with_detailed_stats() {
    let workspace = TestWorkspace::new();
    let query = workspace.write(
        "query.yml",
        "start_date: 2015-01-01\nend_date: 2015-01-18\nmode: dropoffs\nshow_detailed_stats: true\n",
    );

    trip_explorer()
        .args([
            "explore",
            "--data-dir",
            &data_dir_arg(),
            "--query",
            query.to_str().expect("utf-8 path"),
        ])
        .assert()
        .success()
        .stdout(contains("2 trip(s) between"))
        .stdout(contains("revenue"))
        .stdout(contains("27.75"))
        .stdout(contains("tipped trips"));
}

#[test]
fn stats_scope_filter_restricts_revenue_to_the_view() {
    trip_explorer()
        .args([
            "stats",
            "--data-dir",
            &data_dir_arg(),
            "--statistic",
            "fare-sum",
            "--stats-scope",
            "filter",
        ])
        .assert()
        .success()
        .stdout(contains("9.50"))
        .stdout(contains("27.75").not());
}

#[test]
fn query_file_rejects_unknown_keys() {
    let workspace = TestWorkspace::new();
    let query = workspace.write("query.yml", "colour: yellow\n");

    trip_explorer()
        .args([
            "explore",
            "--data-dir",
            &data_dir_arg(),
            "-q",
            query.to_str().expect("utf-8 path"),
        ])
        .assert()
        .failure()
        .stderr(contains("Loading query from"));
}

#[test]
fn explore_exports_map_points() {
    let workspace = TestWorkspace::new();
    let points = workspace.path().join("points.csv");

    trip_explorer()
        .args([
            "explore",
            "--data-dir",
            &data_dir_arg(),
            "--preview",
            "0",
            "--points",
            points.to_str().expect("utf-8 path"),
        ])
        .assert()
        .success();

    let contents = fs::read_to_string(&points).expect("read points");
    let lines = contents.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "vehicle_type,lat,lon");
    assert_eq!(lines[1], "yellow,40.758,-73.9855");
    assert!(lines[3].starts_with("vtc,"));
}

#[test]
fn missing_pickup_column_fails_the_load() {
    let workspace = TestWorkspace::new().with_fixture_sources();
    workspace.write(
        "green_data.csv",
        "dropoff_time,Passenger_count\n1420892400000,3\n",
    );

    trip_explorer()
        .args([
            "summary",
            "--data-dir",
            workspace.path().to_str().expect("utf-8 path"),
        ])
        .assert()
        .failure()
        .stderr(contains("green source: required field 'pickup_time' is missing"));
}

#[test]
fn per_source_paths_override_the_data_directory() {
    let workspace = TestWorkspace::new();
    let vtc = workspace.write(
        "uber.csv",
        "Date/Time,Lat,Lon,Base\n1/7/2015 10:15:00,40.7,-73.9,B02512\n1/8/2015 11:00:00,40.71,-73.91,B02598\n",
    );

    trip_explorer()
        .args([
            "summary",
            "--data-dir",
            &data_dir_arg(),
            "--vtc",
            vtc.to_str().expect("utf-8 path"),
        ])
        .assert()
        .success()
        .stdout(contains("vtc         2"))
        .stdout(contains("total       5"));
}
