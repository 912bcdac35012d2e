//! Fantasy-Calendar export import, end to end against a fixture.

use fabula_engine::arithmetic::{
    cycle_labels, cycle_text, days_per_year, era_label, is_leap_year, season_at,
};
use fabula_engine::import::{detect_format, FantasyCalendarAdapter, ImportAdapter};
use fabula_engine::model::{CalendarDate, CycleBasis, EraFormat, LeapYearRule};
use fabula_engine::{
    import, import_str, validate, ImportError, ImportOptions, LeapPattern, Recurrence,
    SourceFormat,
};
use serde_json::{json, Value};

fn fixture() -> Value {
    let text = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/fantasy_calendar.json"
    ))
    .expect("fantasy_calendar.json fixture must exist");
    serde_json::from_str(&text).expect("fixture is valid JSON")
}

fn adapter() -> FantasyCalendarAdapter {
    FantasyCalendarAdapter::new(ImportOptions::default())
}

/// A minimal export with the given `year_data` overrides merged in.
fn minimal(year_data: Value) -> Value {
    let mut base = json!({
        "name": "Minimal",
        "static_data": {
            "year_data": {
                "global_week": ["One", "Two"],
                "timespans": [{ "name": "Only", "type": "month", "length": 20 }]
            }
        }
    });
    if let (Some(target), Value::Object(extra)) =
        (base.pointer_mut("/static_data/year_data"), year_data)
    {
        for (k, v) in extra {
            target[k] = v;
        }
    }
    base
}

// ---------------------------------------------------------------------------
// Detection and structural errors
// ---------------------------------------------------------------------------

#[test_log::test]
fn detects_export() {
    assert!(adapter().detect(&fixture()));
    assert_eq!(
        detect_format(&fixture(), &ImportOptions::default()),
        Some(SourceFormat::FantasyCalendar)
    );
}

#[test_log::test]
fn year_data_must_be_an_object() {
    assert!(!adapter().detect(&json!({ "static_data": { "year_data": [] } })));
    assert!(!adapter().detect(&json!({ "static_data": {} })));
}

#[test_log::test]
fn missing_timespans() {
    let err = adapter()
        .transform(&json!({ "static_data": { "year_data": {} } }))
        .unwrap_err();
    match err {
        ImportError::MissingField { field, .. } => assert_eq!(field, "timespans"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test_log::test]
fn timespans_of_wrong_type() {
    let err = adapter()
        .transform(&json!({ "static_data": { "year_data": { "timespans": "lots" } } }))
        .unwrap_err();
    assert!(matches!(err, ImportError::InvalidField { .. }));
}

#[test_log::test]
fn unrecognized_and_malformed_input() {
    let options = ImportOptions::default();
    assert!(matches!(
        import(&json!({}), &options),
        Err(ImportError::UnrecognizedFormat(_))
    ));
    assert!(matches!(
        import(&json!("calendar"), &options),
        Err(ImportError::UnrecognizedFormat(_))
    ));
    assert!(matches!(
        import_str("", &options),
        Err(ImportError::JsonParse(_))
    ));
}

// ---------------------------------------------------------------------------
// Calendar transform
// ---------------------------------------------------------------------------

#[test_log::test]
fn leap_day_extends_month_and_sets_gregorian_rule() {
    let cal = adapter().transform(&fixture()).unwrap().calendar;
    assert_eq!(days_per_year(&cal, false), 365);
    assert_eq!(days_per_year(&cal, true), 366);
    assert_eq!(cal.months[0].leap_days, Some(91));
    assert_eq!(cal.leap_year_rule, LeapYearRule::Gregorian { start: 0 });
    assert!(is_leap_year(&cal, 2000));
    assert!(!is_leap_year(&cal, 1900));

    assert_eq!(cal.festivals.len(), 1);
    assert_eq!(cal.festivals[0].name, "Leap Day");
    assert_eq!(cal.festivals[0].month, 1);
    assert_eq!(cal.festivals[0].day, 91);
    assert!(cal.festivals[0].leap_only);
}

#[test_log::test]
fn interval_leap_day_becomes_simple_rule() {
    let raw = minimal(json!({
        "leap_days": [{ "name": "Extra", "timespan": 0, "interval": "5", "offset": 2 }]
    }));
    let cal = adapter().transform(&raw).unwrap().calendar;
    assert_eq!(
        cal.leap_year_rule,
        LeapYearRule::Simple {
            interval: 5,
            start: 2
        }
    );
}

#[test_log::test]
fn compound_leap_day_becomes_custom_rule() {
    let raw = minimal(json!({
        "leap_days": [{ "name": "Extra", "timespan": 0, "interval": "!30,+5", "offset": 0 }]
    }));
    let cal = adapter().transform(&raw).unwrap().calendar;
    assert_eq!(
        cal.leap_year_rule,
        LeapYearRule::Custom {
            pattern: LeapPattern::parse("!30,+5").unwrap(),
            start: 0
        }
    );
}

#[test_log::test]
fn differing_leap_rules_are_collapsed() {
    let raw = minimal(json!({
        "leap_days": [
            { "name": "A", "timespan": 0, "interval": "4", "offset": 0 },
            { "name": "B", "timespan": 0, "interval": "6", "offset": 0 }
        ]
    }));
    let transformed = adapter().transform(&raw).unwrap();
    assert_eq!(transformed.calendar.months[0].leap_days, Some(22));
    assert!(transformed.warnings.iter().any(|w| w.contains("collapsed")));
}

#[test_log::test]
fn bad_leap_pattern_disables_leap_years() {
    let raw = minimal(json!({
        "leap_days": [{ "name": "A", "timespan": 0, "interval": "four", "offset": 0 }]
    }));
    let transformed = adapter().transform(&raw).unwrap();
    assert_eq!(transformed.calendar.leap_year_rule, LeapYearRule::None);
    assert!(transformed.warnings.iter().any(|w| w.contains("four")));
}

#[test_log::test]
fn periodic_seasons_laid_out_with_transitions() {
    let cal = adapter().transform(&fixture()).unwrap().calendar;
    let cold = season_at(&cal, 0).unwrap();
    assert_eq!(cold.name, "Cold");
    assert_eq!(cold.color, Some("#0000ff"));
    assert_eq!(season_at(&cal, 181).map(|s| s.name), Some("Cold"));
    assert_eq!(season_at(&cal, 182).map(|s| s.name), Some("Warm"));
    assert_eq!(season_at(&cal, 364).map(|s| s.name), Some("Warm"));
}

#[test_log::test]
fn dated_seasons_from_timespan_and_day() {
    let mut raw = minimal(json!({}));
    raw["static_data"]["seasons"] = json!({
        "global_settings": { "periodic_seasons": false },
        "data": [
            { "name": "Late", "timespan": 0, "day": 15 },
            { "name": "Early", "timespan": 0, "day": 1 }
        ]
    });
    let cal = adapter().transform(&raw).unwrap().calendar;
    assert_eq!(season_at(&cal, 0).map(|s| s.name), Some("Early"));
    assert_eq!(season_at(&cal, 13).map(|s| s.name), Some("Early"));
    assert_eq!(season_at(&cal, 14).map(|s| s.name), Some("Late"));
}

#[test_log::test]
fn eras_close_at_next_start() {
    let cal = adapter().transform(&fixture()).unwrap().calendar;
    assert_eq!(cal.eras.len(), 2);
    assert_eq!(cal.eras[0].name, "Dawn Era");
    assert_eq!(cal.eras[0].abbreviation, "DE");
    assert_eq!(cal.eras[0].end_year, Some(99));
    assert_eq!(cal.eras[1].end_year, None);
    assert_eq!(
        cal.eras[1].format,
        EraFormat::Template {
            template: "Year {year} of the {era}".to_string()
        }
    );
    assert_eq!(era_label(&cal, 50), "50 DE");
    assert_eq!(era_label(&cal, 150), "Year 150 of the Age of Reason");
}

#[test_log::test]
fn cycles_and_format() {
    let cal = adapter().transform(&fixture()).unwrap().calendar;
    assert_eq!(cal.cycle_format.as_deref(), Some("Year of the {1}"));
    assert_eq!(
        cycle_text(&cal, &CalendarDate::start_of_year(4)).as_deref(),
        Some("Year of the Ox")
    );
}

#[test_log::test]
fn month_count_cycle_uses_elapsed_months() {
    let mut export = fixture();
    export["static_data"]["cycles"]["data"] = json!([
        { "length": 3, "offset": 0, "type": "num_timespans", "names": ["A", "B", "C"] },
        { "length": 3, "offset": 0, "type": "timespan_index", "names": ["A", "B", "C"] }
    ]);
    let transformed = adapter().transform(&export).unwrap();
    let cal = &transformed.calendar;
    assert_eq!(cal.cycles[0].based_on, CycleBasis::MonthsElapsed);
    assert_eq!(cal.cycles[1].based_on, CycleBasis::Month);
    // Four months a year: Thaw of year 1 is five months after the epoch.
    assert_eq!(cycle_labels(cal, &CalendarDate::new(1, 1, 1)), vec!["C", "B"]);
}

#[test_log::test]
fn moons_get_synthesized_phases() {
    let transformed = adapter().transform(&fixture()).unwrap();
    let moon = &transformed.calendar.moons[0];
    assert_eq!(moon.name, "Luna");
    assert_eq!(moon.cycle_length, 29.5);
    assert_eq!(moon.phases.len(), 8);
    assert_eq!(moon.phases[4].name, "Full Moon");
    assert_eq!(moon.reference_date, CalendarDate::start_of_year(0));
    assert_eq!(transformed.warnings.len(), 1);
    assert!(transformed.warnings[0].contains("Luna"));
}

#[test_log::test]
fn phase_count_is_configurable() {
    let options = ImportOptions {
        synthesized_phase_count: 4,
        ..ImportOptions::default()
    };
    let cal = FantasyCalendarAdapter::new(options)
        .transform(&fixture())
        .unwrap()
        .calendar;
    assert_eq!(cal.moons[0].phases.len(), 4);
    assert_eq!(cal.moons[0].phases[2].name, "Full Moon");
}

#[test_log::test]
fn clock_weekdays_and_current_date() {
    let cal = adapter().transform(&fixture()).unwrap().calendar;
    assert_eq!(cal.time_units.hours_per_day, 20);
    assert_eq!(cal.time_units.minutes_per_hour, 50);
    assert_eq!(cal.weekdays.len(), 7);
    assert_eq!(cal.weekdays[0].name, "Monday");
    assert_eq!(cal.first_weekday, 0);
    assert_eq!(cal.current_date, Some(CalendarDate::new(150, 1, 10)));
}

#[test_log::test]
fn month_level_features_warn() {
    let raw = minimal(json!({
        "timespans": [
            { "name": "Rare", "type": "month", "length": 10, "interval": 3 },
            { "name": "Odd Week", "type": "month", "length": 10, "week": ["X", "Y"] },
            { "name": "Gap", "type": "intercalary", "length": 1 }
        ]
    }));
    let transformed = adapter().transform(&raw).unwrap();
    assert!(transformed.calendar.months[2].intercalary);
    assert!(transformed.warnings.iter().any(|w| w.contains("Rare")));
    assert!(transformed.warnings.iter().any(|w| w.contains("Odd Week")));
}

#[test_log::test]
fn imported_calendar_validates() {
    let cal = adapter().transform(&fixture()).unwrap().calendar;
    let violations = validate(&cal);
    assert!(violations.is_empty(), "{:?}", violations);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

fn outcome() -> fabula_engine::ImportOutcome {
    import(&fixture(), &ImportOptions::default()).unwrap()
}

fn event<'a>(
    outcome: &'a fabula_engine::ImportOutcome,
    name: &str,
) -> &'a fabula_engine::EventDraft {
    outcome
        .events
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| panic!("no event named {}", name))
}

#[test_log::test]
fn events_are_classified() {
    let outcome = outcome();
    assert_eq!(outcome.format, SourceFormat::FantasyCalendar);
    assert_eq!(outcome.suggested_id, "realm-of-four-quarters");
    assert_eq!(outcome.events.len(), 7);

    let new_year = event(&outcome, "New Year");
    assert_eq!(new_year.recurrence, Recurrence::Yearly);
    assert_eq!(new_year.start_date, CalendarDate::new(150, 0, 1));
    assert_eq!(new_year.category.as_deref(), Some("Holidays"));
    assert_eq!(new_year.color.as_deref(), Some("Red"));
    assert_eq!(new_year.content, "First day of the year.");

    let market = event(&outcome, "Market");
    assert_eq!(market.recurrence, Recurrence::Weekly { weekday: 0 });
    assert_eq!(market.start_date, CalendarDate::new(150, 1, 10));

    let rite = event(&outcome, "Full Moon Rite");
    assert_eq!(
        rite.recurrence,
        Recurrence::Moon {
            moon: 0,
            phase_start: 0.5,
            phase_end: 0.625
        }
    );
}

#[test_log::test]
fn or_of_dates_splits_into_labelled_drafts() {
    let outcome = outcome();
    let first = event(&outcome, "Twin Visits (1st)");
    let second = event(&outcome, "Twin Visits (2nd)");
    assert_eq!(first.recurrence, Recurrence::Never);
    assert_eq!(second.recurrence, Recurrence::Never);
    assert_eq!(first.start_date, CalendarDate::new(151, 1, 5));
    assert_eq!(second.start_date, CalendarDate::new(152, 2, 7));
}

#[test_log::test]
fn duration_sets_end_date() {
    let outcome = outcome();
    let fair = event(&outcome, "Harvest Fair");
    assert_eq!(fair.start_date, CalendarDate::new(150, 3, 10));
    assert_eq!(fair.end_date, Some(CalendarDate::new(150, 3, 12)));
    assert_eq!(fair.color.as_deref(), Some("Green"));
}

#[test_log::test]
fn mixed_alternatives_keep_first_with_warning() {
    let outcome = outcome();
    let storm = event(&outcome, "Storm Watch");
    assert_eq!(storm.recurrence, Recurrence::Seasonal { season: 0 });
    assert!(storm.warnings.iter().any(|w| w.contains("`||`")));
}

#[test_log::test]
fn undated_event_is_archived() {
    let outcome = outcome();
    assert_eq!(outcome.undatable.len(), 1);
    assert_eq!(outcome.undatable[0].name, "Lost Legend");
    assert_eq!(outcome.undatable[0].content, "Told only in whispers.");
    assert!(outcome.events.iter().all(|e| e.name != "Lost Legend"));
}

#[test_log::test]
fn top_level_events_are_read() {
    let mut raw = minimal(json!({}));
    raw["events"] = json!([
        { "name": "Tenth", "data": { "conditions": [["Day", "0", ["10"]]] } }
    ]);
    let outcome = import(&raw, &ImportOptions::default()).unwrap();
    assert_eq!(outcome.events.len(), 1);
    assert_eq!(outcome.events[0].recurrence, Recurrence::Monthly);
    assert_eq!(outcome.events[0].start_date, CalendarDate::new(0, 0, 10));
}

#[test_log::test]
fn import_is_idempotent_apart_from_timestamp() {
    let raw = fixture();
    let mut a = import(&raw, &ImportOptions::default()).unwrap();
    let b = import(&raw, &ImportOptions::default()).unwrap();
    a.provenance.imported_at = b.provenance.imported_at;
    assert_eq!(a, b);
    assert_eq!(b.provenance.source_format, SourceFormat::FantasyCalendar);
}
