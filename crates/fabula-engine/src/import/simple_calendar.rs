//! Simple Calendar export adapter.
//!
//! Shape (abridged):
//!
//! ```json
//! {
//!   "exportVersion": 2,
//!   "calendars": [{ "id": "...", "name": "...", "months": [...], "weekdays": [...],
//!                   "leapYear": {...}, "seasons": [...], "moons": [...], "year": {...} }],
//!   "notes": { "<calendar id>": [{ "name": "...", "flags": { "foundryvtt-simple-calendar":
//!              { "noteData": { "startDate": {...}, "repeats": 0 } } } }] }
//! }
//! ```
//!
//! Months and days are 0-indexed throughout the source. Leap days are numeric
//! per-month lengths (`numberOfLeapYearDays`).

use serde_json::Value;

use crate::arithmetic::{days_per_year, month_day_to_day_of_year, weekday_of};
use crate::error::{ImportError, Result};
use crate::event::{EventDraft, Recurrence, UndatableRecord};
use crate::model::{
    CalendarDate, CalendarModel, Cycle, CycleBasis, Era, EraFormat, LeapYearRule, Month, Moon,
    TimeUnits, Weekday,
};

use super::json::{
    array_field, bool_field, f64_field, i64_field, str_field, text_field, u32_field, usize_field,
};
use super::moons::{phases_from_lengths, synthesize_phases};
use super::seasons::{reconstruct, SeasonStart};
use super::{EventExtraction, ImportAdapter, ImportOptions, SourceFormat, Transformed, Warnings};

const FLAGS_KEY: &str = "foundryvtt-simple-calendar";

/// Year prefixes and postfixes apply to every year, so their era has no start.
const OPEN_START: i64 = i64::MIN;

#[derive(Debug, Clone, Default)]
pub struct SimpleCalendarAdapter {
    options: ImportOptions,
}

impl SimpleCalendarAdapter {
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }

    /// The calendar selected by `calendarId`, or the first one.
    fn select_calendar<'a>(&self, raw: &'a Value) -> Result<&'a Value> {
        let calendars = array_field(raw, "calendars")
            .ok_or_else(|| ImportError::missing("calendars", "Simple Calendar export"))?;

        match &self.options.calendar_id {
            Some(id) => calendars
                .iter()
                .find(|c| str_field(c, "id") == Some(id.as_str()))
                .ok_or_else(|| {
                    ImportError::invalid("calendarId", format!("no calendar with id `{}`", id))
                }),
            None => calendars
                .first()
                .ok_or_else(|| ImportError::missing("calendars[0]", "Simple Calendar export")),
        }
    }
}

impl ImportAdapter for SimpleCalendarAdapter {
    fn format(&self) -> SourceFormat {
        SourceFormat::SimpleCalendar
    }

    fn detect(&self, raw: &Value) -> bool {
        let Some(calendars) = array_field(raw, "calendars") else {
            return false;
        };
        raw.get("static_data").is_none()
            && (raw.get("exportVersion").is_some()
                || calendars.iter().all(|c| c.get("months").is_some()))
    }

    #[tracing::instrument(skip_all, fields(format = "simple-calendar"))]
    fn transform(&self, raw: &Value) -> Result<Transformed> {
        let source = self.select_calendar(raw)?;
        let mut warnings = Warnings::default();

        let months = array_field(source, "months")
            .ok_or_else(|| ImportError::missing("months", "Simple Calendar calendar"))?;

        let mut calendar = CalendarModel {
            name: text_field(source, "name").unwrap_or_else(|| "Imported Calendar".to_string()),
            months: convert_months(months, &mut warnings),
            ..CalendarModel::default()
        };

        calendar.weekdays = match array_field(source, "weekdays") {
            Some(weekdays) => convert_weekdays(weekdays),
            None => {
                warnings.push("calendar has no weekday list; imported without weekdays");
                Vec::new()
            }
        };

        let year = source.get("year").unwrap_or(&Value::Null);
        calendar.first_weekday = usize_field(year, "firstWeekday").unwrap_or(0);
        calendar.leap_year_rule = convert_leap_rule(source.get("leapYear"), &mut warnings);
        calendar.time_units = convert_time(source.get("time"));
        calendar.eras = convert_year_affixes(year, &calendar.name);
        calendar.cycles = convert_year_names(year, &mut warnings);

        if let Some(current) = source.get("currentDate") {
            calendar.current_date = source_date(current);
        }

        if let Some(seasons) = array_field(source, "seasons") {
            let starts = seasons
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let month = usize_field(s, "startingMonth").unwrap_or(0);
                    let day = u32_field(s, "startingDay").unwrap_or(0);
                    SeasonStart {
                        name: text_field(s, "name").unwrap_or_else(|| format!("Season {}", i + 1)),
                        color: text_field(s, "color"),
                        start: month_day_to_day_of_year(&calendar, month + 1, day + 1),
                    }
                })
                .collect();
            if seasons
                .iter()
                .any(|s| s.get("sunriseTime").is_some() || s.get("sunsetTime").is_some())
            {
                warnings.push("season sunrise and sunset times are not imported");
            }
            calendar.seasons = reconstruct(starts, days_per_year(&calendar, false), &mut warnings);
        }

        if let Some(moons) = array_field(source, "moons") {
            calendar.moons = moons
                .iter()
                .enumerate()
                .map(|(i, m)| self.convert_moon(i, m, &mut warnings))
                .collect();
        }

        tracing::debug!(
            months = calendar.months.len(),
            seasons = calendar.seasons.len(),
            moons = calendar.moons.len(),
            "transformed calendar"
        );

        Ok(Transformed {
            calendar,
            warnings: warnings.into_vec(),
        })
    }

    #[tracing::instrument(skip_all, fields(format = "simple-calendar"))]
    fn extract_events(&self, raw: &Value, calendar: &CalendarModel) -> EventExtraction {
        let mut warnings = Warnings::default();
        let mut extraction = EventExtraction::default();

        let Ok(source) = self.select_calendar(raw) else {
            return extraction;
        };
        let calendar_id = str_field(source, "id").unwrap_or_default();
        let categories = array_field(source, "noteCategories").cloned().unwrap_or_default();

        let notes = raw
            .get("notes")
            .and_then(|n| n.get(calendar_id))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for note in &notes {
            let name = text_field(note, "name").unwrap_or_else(|| "Untitled note".to_string());
            let content = note_content(note);
            let data = note
                .pointer(&format!("/flags/{}/noteData", FLAGS_KEY))
                .or_else(|| note.get("noteData"));

            let Some(start_date) = data.and_then(|d| d.get("startDate")).and_then(source_date) else {
                extraction.undatable.push(UndatableRecord {
                    name,
                    content,
                    reason: "note has no start date".to_string(),
                });
                continue;
            };
            let data = data.unwrap_or(&Value::Null);

            let mut draft_warnings = Warnings::default();
            if start_date.month >= calendar.months.len() {
                draft_warnings.push(format!(
                    "start month index {} does not exist in the calendar",
                    start_date.month
                ));
            }

            let end_date = data
                .get("endDate")
                .and_then(source_date)
                .filter(|end| *end != start_date);

            let recurrence = match i64_field(data, "repeats").unwrap_or(0) {
                0 => Recurrence::Never,
                1 => Recurrence::Weekly {
                    weekday: weekday_of(calendar, &start_date).unwrap_or(0),
                },
                2 => Recurrence::Monthly,
                3 => Recurrence::Yearly,
                other => {
                    draft_warnings.push(format!(
                        "unknown repeat mode {}; imported as a one-off note",
                        other
                    ));
                    Recurrence::Never
                }
            };

            let has_time = data.get("startDate").is_some_and(|d| {
                i64_field(d, "hour").unwrap_or(0) != 0 || i64_field(d, "minute").unwrap_or(0) != 0
            });
            if has_time && !bool_field(data, "allDay") {
                draft_warnings.push("time of day is not imported; note placed on its day");
            }

            let (category, color) = note_category(data, &categories, &mut draft_warnings);

            extraction.drafts.push(EventDraft {
                name,
                content,
                start_date,
                end_date,
                recurrence,
                category,
                color,
                warnings: draft_warnings.into_vec(),
            });
        }

        if !extraction.undatable.is_empty() {
            warnings.push(format!(
                "{} note(s) without a date were set aside for archival",
                extraction.undatable.len()
            ));
        }
        extraction.warnings = warnings.into_vec();
        extraction
    }
}

impl SimpleCalendarAdapter {
    fn convert_moon(&self, index: usize, moon: &Value, warnings: &mut Warnings) -> Moon {
        let name = text_field(moon, "name").unwrap_or_else(|| format!("Moon {}", index + 1));
        let cycle_length = f64_field(moon, "cycleLength").unwrap_or(0.0);

        let reference_date = match moon.get("firstNewMoon").and_then(source_date) {
            Some(date) => date,
            None => {
                warnings.push(format!(
                    "moon `{}` has no first new moon; reference date set to year 0",
                    name
                ));
                CalendarDate::start_of_year(0)
            }
        };
        if let Some(reset) = moon.pointer("/firstNewMoon/yearReset").and_then(Value::as_str) {
            if reset != "none" {
                warnings.push(format!(
                    "moon `{}` resets its cycle (`{}`); the reset is not imported",
                    name, reset
                ));
            }
        }

        let source_phases: Vec<(String, f64)> = array_field(moon, "phases")
            .map(|ps| {
                ps.iter()
                    .enumerate()
                    .map(|(i, p)| {
                        (
                            text_field(p, "name").unwrap_or_else(|| format!("Phase {}", i + 1)),
                            f64_field(p, "length").unwrap_or(0.0),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let phases = match phases_from_lengths(&source_phases) {
            Some(phases) => {
                let declared: f64 = source_phases.iter().map(|(_, l)| l.max(0.0)).sum();
                if cycle_length > 0.0 && (declared - cycle_length).abs() > 0.01 {
                    warnings.push(format!(
                        "moon `{}` phase lengths total {} days but the cycle is {}; phases scaled to fit",
                        name, declared, cycle_length
                    ));
                }
                if array_field(moon, "phases")
                    .is_some_and(|ps| ps.iter().any(|p| bool_field(p, "singleDay")))
                {
                    warnings.push(format!(
                        "moon `{}` has single-day phases; they are imported as fractional ranges",
                        name
                    ));
                }
                phases
            }
            None => {
                warnings.push(format!(
                    "moon `{}` has no usable phases; generated {} evenly spaced phases",
                    name, self.options.synthesized_phase_count
                ));
                synthesize_phases(self.options.synthesized_phase_count)
            }
        };

        Moon {
            name,
            cycle_length,
            cycle_day_adjust: f64_field(moon, "cycleDayAdjust").unwrap_or(0.0),
            reference_date,
            phases,
            color: text_field(moon, "color"),
        }
    }
}

fn convert_months(months: &[Value], warnings: &mut Warnings) -> Vec<Month> {
    let mut overrides = 0usize;
    let mut excluded = Vec::new();

    let converted = months
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let name = text_field(m, "name").unwrap_or_else(|| format!("Month {}", i + 1));
            let days = u32_field(m, "numberOfDays").unwrap_or(0);
            let leap_days = u32_field(m, "numberOfLeapYearDays").filter(|&l| l != days);
            let intercalary = bool_field(m, "intercalary");

            if m.get("startingWeekday").is_some_and(|v| !v.is_null()) {
                overrides += 1;
            }
            if intercalary && !bool_field(m, "intercalaryInclude") {
                excluded.push(name.clone());
            }

            Month {
                name,
                abbreviation: text_field(m, "abbreviation"),
                ordinal: i + 1,
                days,
                leap_days,
                intercalary,
            }
        })
        .collect();

    if overrides > 0 {
        warnings.push(format!(
            "custom per-month weekday overrides detected on {} month(s); feature not supported from this source",
            overrides
        ));
    }
    if !excluded.is_empty() {
        warnings.push(format!(
            "intercalary month(s) {} skip weekday counting in the source; weekdays now run through them",
            excluded.join(", ")
        ));
    }
    converted
}

fn convert_weekdays(weekdays: &[Value]) -> Vec<Weekday> {
    weekdays
        .iter()
        .enumerate()
        .map(|(i, w)| Weekday {
            name: text_field(w, "name").unwrap_or_else(|| format!("Day {}", i + 1)),
            abbreviation: text_field(w, "abbreviation"),
            ordinal: i + 1,
        })
        .collect()
}

fn convert_leap_rule(leap: Option<&Value>, warnings: &mut Warnings) -> LeapYearRule {
    let Some(leap) = leap else {
        return LeapYearRule::None;
    };
    match str_field(leap, "rule").unwrap_or("none") {
        "none" => LeapYearRule::None,
        "gregorian" => LeapYearRule::Gregorian { start: 0 },
        "custom" => match u32_field(leap, "customMod") {
            Some(interval) if interval > 0 => LeapYearRule::Simple { interval, start: 0 },
            _ => {
                warnings.push("custom leap rule has no usable interval; leap years disabled");
                LeapYearRule::None
            }
        },
        other => {
            warnings.push(format!("unknown leap rule `{}`; leap years disabled", other));
            LeapYearRule::None
        }
    }
}

fn convert_time(time: Option<&Value>) -> TimeUnits {
    let defaults = TimeUnits::default();
    let Some(time) = time else {
        return defaults;
    };
    let unit = |key: &str, default: u32| u32_field(time, key).filter(|&n| n > 0).unwrap_or(default);
    TimeUnits {
        hours_per_day: unit("hoursInDay", defaults.hours_per_day),
        minutes_per_hour: unit("minutesInHour", defaults.minutes_per_hour),
        seconds_per_minute: unit("secondsInMinute", defaults.seconds_per_minute),
    }
}

fn convert_year_affixes(year: &Value, calendar_name: &str) -> Vec<Era> {
    let prefix = str_field(year, "prefix").unwrap_or_default();
    let postfix = str_field(year, "postfix").unwrap_or_default();

    let format = match (prefix.trim().is_empty(), postfix.trim().is_empty()) {
        (true, true) => return Vec::new(),
        (false, true) => EraFormat::Prefix,
        (true, false) => EraFormat::Suffix,
        (false, false) => EraFormat::Template {
            template: format!("{}{{year}}{}", prefix, postfix),
        },
    };
    let abbreviation = match format {
        EraFormat::Prefix => prefix.trim().to_string(),
        _ => postfix.trim().to_string(),
    };

    vec![Era {
        name: calendar_name.to_string(),
        abbreviation,
        start_year: OPEN_START,
        end_year: None,
        format,
    }]
}

fn convert_year_names(year: &Value, warnings: &mut Warnings) -> Vec<Cycle> {
    let names: Vec<String> = array_field(year, "yearNames")
        .map(|ns| ns.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    if names.is_empty() {
        return Vec::new();
    }

    match str_field(year, "yearNamingRule").unwrap_or("default") {
        "repeat" => {}
        "random" => warnings.push("randomly assigned year names imported as a repeating cycle"),
        _ => warnings.push("year names that stop after the last entry imported as a repeating cycle"),
    }

    vec![Cycle {
        length: u32::try_from(names.len()).unwrap_or(u32::MAX),
        offset: i64_field(year, "yearNamesStart").unwrap_or(0),
        based_on: CycleBasis::Year,
        entries: names,
    }]
}

/// A 0-indexed `{year, month, day}` source date as a canonical date.
fn source_date(value: &Value) -> Option<CalendarDate> {
    let year = i64_field(value, "year")?;
    let month = usize_field(value, "month")?;
    let day = u32_field(value, "day")?;
    Some(CalendarDate::new(year, month, day + 1))
}

fn note_content(note: &Value) -> String {
    str_field(note, "content")
        .or_else(|| note.pointer("/text/content").and_then(Value::as_str))
        .or_else(|| note.pointer("/pages/0/text/content").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

fn note_category(
    data: &Value,
    categories: &[Value],
    warnings: &mut Warnings,
) -> (Option<String>, Option<String>) {
    let names: Vec<&str> = array_field(data, "categories")
        .map(|cs| {
            cs.iter()
                .filter_map(|c| c.as_str().or_else(|| str_field(c, "name")))
                .collect()
        })
        .unwrap_or_default();

    let Some(first) = names.first() else {
        return (None, None);
    };
    if names.len() > 1 {
        warnings.push(format!(
            "note has {} categories; only `{}` was kept",
            names.len(),
            first
        ));
    }
    let color = categories
        .iter()
        .find(|c| str_field(c, "name") == Some(*first) || str_field(c, "id") == Some(*first))
        .and_then(|c| text_field(c, "color"));
    let name = categories
        .iter()
        .find(|c| str_field(c, "id") == Some(*first))
        .and_then(|c| text_field(c, "name"))
        .unwrap_or_else(|| first.to_string());
    (Some(name), color)
}
