//! Integration tests for the `fabula` CLI binary.
//!
//! These drive the detect, import, validate and date subcommands through the
//! actual binary, including stdin piping, file output, config files and exit
//! codes.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn simple_calendar_path() -> String {
    fixture("simple_calendar.json")
}

fn fantasy_calendar_path() -> String {
    fixture("fantasy_calendar.json")
}

fn calendar_path() -> String {
    fixture("calendar.json")
}

fn fabula() -> Command {
    let mut cmd = Command::cargo_bin("fabula").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("FABULA_CALENDAR_ID")
        .env_remove("FABULA_SYNTHESIZED_PHASE_COUNT");
    cmd
}

/// Run `import` with extra args and parse the JSON it prints.
fn import_json(args: &[&str]) -> Value {
    let output = fabula().arg("import").args(args).output().unwrap();
    assert!(output.status.success(), "import failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("import prints JSON")
}

// ---------------------------------------------------------------------------
// Detect subcommand
// ---------------------------------------------------------------------------

#[test]
fn detect_simple_calendar() {
    fabula()
        .args(["detect", "-i", &simple_calendar_path()])
        .assert()
        .success()
        .stdout("simple-calendar\n");
}

#[test]
fn detect_fantasy_calendar_from_stdin() {
    let input = std::fs::read_to_string(fantasy_calendar_path()).unwrap();
    fabula()
        .arg("detect")
        .write_stdin(input)
        .assert()
        .success()
        .stdout("fantasy-calendar\n");
}

#[test]
fn detect_unrecognized_exits_nonzero() {
    fabula()
        .arg("detect")
        .write_stdin(r#"{"hello": "world"}"#)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unrecognized format"));
}

#[test]
fn detect_invalid_json() {
    fabula()
        .arg("detect")
        .write_stdin("not json at all")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn missing_input_file() {
    fabula()
        .args(["detect", "-i", "/nonexistent/export.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

// ---------------------------------------------------------------------------
// Import subcommand
// ---------------------------------------------------------------------------

#[test]
fn import_fantasy_calendar_to_stdout() {
    let outcome = import_json(&["-i", &fantasy_calendar_path()]);
    assert_eq!(outcome["format"], "fantasy-calendar");
    assert_eq!(outcome["suggestedId"], "realm-of-four-quarters");
    assert_eq!(outcome["calendar"]["name"], "Realm of Four Quarters");
    assert_eq!(outcome["calendar"]["months"].as_array().unwrap().len(), 4);
    assert_eq!(outcome["events"].as_array().unwrap().len(), 7);
    assert_eq!(outcome["undatable"][0]["name"], "Lost Legend");
    assert_eq!(outcome["provenance"]["sourceFormat"], "fantasy-calendar");
    assert!(outcome.get("calendar").and_then(|c| c.get("daysPerYear")).is_none());
}

#[test]
fn import_writes_output_file() {
    let output_path = "/tmp/fabula-test-import-output.json";
    let _ = std::fs::remove_file(output_path);

    fabula()
        .args(["import", "-i", &simple_calendar_path(), "-o", output_path])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = std::fs::read_to_string(output_path).expect("output file must exist");
    let outcome: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(outcome["format"], "simple-calendar");
    assert_eq!(outcome["calendar"]["name"], "Calendar of Harptos");

    let _ = std::fs::remove_file(output_path);
}

#[test]
fn import_selects_calendar_by_id() {
    let outcome = import_json(&["-i", &simple_calendar_path(), "--calendar-id", "tiny"]);
    assert_eq!(outcome["calendar"]["name"], "Tiny Calendar");
    assert_eq!(outcome["suggestedId"], "tiny-calendar");
}

#[test]
fn import_calendar_id_from_environment() {
    let output = fabula()
        .env("FABULA_CALENDAR_ID", "tiny")
        .args(["import", "-i", &simple_calendar_path()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let outcome: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["calendar"]["name"], "Tiny Calendar");
}

#[test]
fn import_unknown_calendar_id_fails() {
    fabula()
        .args(["import", "-i", &simple_calendar_path(), "--calendar-id", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("calendarId"));
}

#[test]
fn import_settings_from_config_file() {
    let outcome = import_json(&[
        "-i",
        &fantasy_calendar_path(),
        "--config",
        &fixture("settings.toml"),
    ]);
    assert_eq!(outcome["suggestedId"], "realm_of_four_quarters");
    assert_eq!(
        outcome["calendar"]["moons"][0]["phases"]
            .as_array()
            .unwrap()
            .len(),
        4
    );
}

#[test]
fn import_unrecognized_reports_shape() {
    fabula()
        .arg("import")
        .write_stdin(r#"{"foo": 1, "bar": 2}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unrecognized format"))
        .stderr(predicate::str::contains("foo"));
}

#[test]
fn import_missing_required_field() {
    fabula()
        .arg("import")
        .write_stdin(r#"{"static_data": {"year_data": {}}}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("timespans"));
}

// ---------------------------------------------------------------------------
// Validate subcommand
// ---------------------------------------------------------------------------

#[test]
fn validate_clean_calendar() {
    fabula()
        .args(["validate", "-i", &calendar_path()])
        .assert()
        .success()
        .stdout("ok\n");
}

#[test]
fn validate_broken_calendar_exits_nonzero() {
    fabula()
        .args(["validate", "-i", &fixture("broken_calendar.json")])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("error: month `Third`"))
        .stdout(predicate::str::contains("at least one weekday"));
}

#[test]
fn validate_warns_on_stale_year_length() {
    let input = std::fs::read_to_string(calendar_path())
        .unwrap()
        .replace(r#""daysPerYear": 90"#, r#""daysPerYear": 365"#);
    fabula()
        .arg("validate")
        .write_stdin(input)
        .assert()
        .success()
        .stdout("ok\n")
        .stderr(predicate::str::contains("365"));
}

#[test]
fn validate_rejects_non_calendar_json() {
    fabula()
        .arg("validate")
        .write_stdin(r#"{"name": "No months"}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load calendar"));
}

#[test]
fn imported_calendar_validates_through_cli() {
    let outcome = import_json(&["-i", &fantasy_calendar_path()]);
    let calendar = serde_json::to_string(&outcome["calendar"]).unwrap();
    fabula()
        .arg("validate")
        .write_stdin(calendar)
        .assert()
        .success()
        .stdout("ok\n");
}

// ---------------------------------------------------------------------------
// Date subcommand
// ---------------------------------------------------------------------------

#[test]
fn date_at_epoch() {
    fabula()
        .args(["date", "-i", &calendar_path(), "--year", "0", "--day-of-year", "0"])
        .assert()
        .success()
        .stdout(
            "date: 1 Dawnfall, 0 AT\n\
             weekday: Oneday\n\
             season: Bright\n\
             moon Pale: New\n\
             cycle: Year of the Heron\n",
        );
}

#[test]
fn date_after_leap_year() {
    // Year 0 is a leap year of 91 days, so day 40 of year 1 is 131 days in.
    fabula()
        .args(["date", "-i", &calendar_path(), "--year", "1", "--day-of-year", "40"])
        .assert()
        .success()
        .stdout(predicate::str::contains("date: 11 Highsun, 1 AT"))
        .stdout(predicate::str::contains("weekday: Threeday"))
        .stdout(predicate::str::contains("moon Pale: New"))
        .stdout(predicate::str::contains("cycle: Year of the Wolf"));
}

#[test]
fn date_second_season_and_full_moon() {
    fabula()
        .args(["date", "-i", &calendar_path(), "--year", "0", "--day-of-year", "65"])
        .assert()
        .success()
        .stdout(predicate::str::contains("season: Dim"))
        .stdout(predicate::str::contains("moon Pale: Full"));
}

#[test]
fn date_before_first_era() {
    fabula()
        .args(["date", "-i", &calendar_path(), "--year", "-1", "--day-of-year", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("date: 1 Dawnfall, -1\n"));
}

#[test]
fn date_negative_day_of_year_wraps() {
    fabula()
        .args(["date", "-i", &calendar_path(), "--year", "0", "--day-of-year", "-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("date: 30 Embertide, 0 AT\n"))
        .stdout(predicate::str::contains("season: Dim\n"));
}

#[test]
fn date_far_future_year() {
    fabula()
        .args([
            "date",
            "-i",
            &calendar_path(),
            "--year",
            "400000000000000000",
            "--day-of-year",
            "0",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("date: 1 Dawnfall, 400000000000000000 AT\n"))
        .stdout(predicate::str::contains("weekday: "));
}
