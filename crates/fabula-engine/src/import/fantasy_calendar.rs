//! Fantasy-Calendar export adapter.
//!
//! Everything structural lives under `static_data`; `dynamic_data` holds the
//! current date. Events sit either at the top level or under
//! `static_data.event_data`, each carrying a condition tree that
//! [`crate::recurrence`] classifies.
//!
//! Timespan indices are 0-based, days are 1-based.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::arithmetic::{add_days, days_per_year, month_day_to_day_of_year};
use crate::error::{ImportError, Result};
use crate::event::{EventDraft, Recurrence, UndatableRecord};
use crate::leap::LeapPattern;
use crate::model::{
    CalendarDate, CalendarModel, Cycle, CycleBasis, Era, EraFormat, Festival, LeapYearRule,
    Month, Moon, Seasons, TimeUnits, Weekday,
};
use crate::recurrence::{branch_label, classify, ClassifierContext, ConditionTree};

use super::era_template::{translate_cycle_template, translate_era_template};
use super::json::{
    array_field, as_i64, bool_field, f64_field, i64_field, id_text, str_field, text_field,
    u32_field, usize_field,
};
use super::moons::synthesize_phases;
use super::seasons::{reconstruct, SeasonStart};
use super::{EventExtraction, ImportAdapter, ImportOptions, SourceFormat, Transformed, Warnings};

#[derive(Debug, Clone, Default)]
pub struct FantasyCalendarAdapter {
    options: ImportOptions,
}

impl FantasyCalendarAdapter {
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }
}

impl ImportAdapter for FantasyCalendarAdapter {
    fn format(&self) -> SourceFormat {
        SourceFormat::FantasyCalendar
    }

    fn detect(&self, raw: &Value) -> bool {
        raw.pointer("/static_data/year_data")
            .is_some_and(Value::is_object)
    }

    #[tracing::instrument(skip_all, fields(format = "fantasy-calendar"))]
    fn transform(&self, raw: &Value) -> Result<Transformed> {
        let static_data = raw
            .get("static_data")
            .ok_or_else(|| ImportError::missing("static_data", "Fantasy-Calendar export"))?;
        let year_data = static_data
            .get("year_data")
            .filter(|v| v.is_object())
            .ok_or_else(|| ImportError::missing("year_data", "static_data"))?;
        let timespans = match year_data.get("timespans") {
            None => return Err(ImportError::missing("timespans", "static_data.year_data")),
            Some(Value::Array(ts)) => ts,
            Some(_) => return Err(ImportError::invalid("timespans", "expected an array")),
        };

        let mut warnings = Warnings::default();
        let mut calendar = CalendarModel {
            name: text_field(raw, "name").unwrap_or_else(|| "Imported Calendar".to_string()),
            months: convert_timespans(timespans, &mut warnings),
            ..CalendarModel::default()
        };

        calendar.weekdays = array_field(year_data, "global_week")
            .map(|days| convert_weekdays(days))
            .unwrap_or_default();
        if calendar.weekdays.is_empty() {
            warnings.push("calendar has no weekday list; imported without weekdays");
        }
        calendar.first_weekday = usize_field(year_data, "first_day")
            .and_then(|d| d.checked_sub(1))
            .unwrap_or(0);

        if let Some(leap_days) = array_field(year_data, "leap_days") {
            convert_leap_days(leap_days, &mut calendar, &mut warnings);
        }

        calendar.seasons = convert_seasons(static_data.get("seasons"), &calendar, &mut warnings);
        calendar.moons = array_field(static_data, "moons")
            .map(|moons| self.convert_moons(moons, &mut warnings))
            .unwrap_or_default();
        calendar.time_units = convert_clock(static_data.get("clock"));
        calendar.eras = array_field(static_data, "eras")
            .map(|eras| convert_eras(eras, &mut warnings))
            .unwrap_or_default();

        if let Some(cycles) = static_data.get("cycles") {
            calendar.cycles = array_field(cycles, "data")
                .map(|data| convert_cycles(data, &mut warnings))
                .unwrap_or_default();
            calendar.cycle_format = text_field(cycles, "format")
                .filter(|_| !calendar.cycles.is_empty())
                .map(|f| translate_cycle_template(&f, &mut warnings));
        }

        if let Some(dynamic) = raw.get("dynamic_data") {
            calendar.current_date = dated(dynamic);
        }

        tracing::debug!(
            months = calendar.months.len(),
            seasons = calendar.seasons.len(),
            moons = calendar.moons.len(),
            eras = calendar.eras.len(),
            "transformed calendar"
        );

        Ok(Transformed {
            calendar,
            warnings: warnings.into_vec(),
        })
    }

    #[tracing::instrument(skip_all, fields(format = "fantasy-calendar"))]
    fn extract_events(&self, raw: &Value, calendar: &CalendarModel) -> EventExtraction {
        let mut extraction = EventExtraction::default();
        let mut warnings = Warnings::default();

        let event_data = raw.pointer("/static_data/event_data");
        let events = array_field(raw, "events")
            .or_else(|| event_data.and_then(|d| array_field(d, "events")))
            .cloned()
            .unwrap_or_default();
        let categories = array_field(raw, "categories")
            .or_else(|| event_data.and_then(|d| array_field(d, "categories")))
            .cloned()
            .unwrap_or_default();

        let granularity: Vec<u32> = raw
            .pointer("/static_data/moons")
            .and_then(Value::as_array)
            .map(|moons| {
                moons
                    .iter()
                    .map(|m| u32_field(m, "granularity").unwrap_or(0))
                    .collect()
            })
            .unwrap_or_default();

        for event in &events {
            let name = text_field(event, "name").unwrap_or_else(|| "Untitled event".to_string());
            let content = str_field(event, "description").unwrap_or_default().to_string();
            let data = event.get("data").unwrap_or(&Value::Null);

            let event_date = data.get("date").and_then(date_triple);
            let tree = data
                .get("conditions")
                .map(ConditionTree::parse)
                .unwrap_or_default();
            let ctx = ClassifierContext {
                calendar,
                moon_granularity: &granularity,
                event_date,
            };
            let classifications = classify(&tree, &ctx);

            if let [only] = classifications.as_slice() {
                if only.recurrence == Recurrence::Never && only.start_date.is_none() {
                    extraction.undatable.push(UndatableRecord {
                        name,
                        content,
                        reason: "event has no date and no dated condition".to_string(),
                    });
                    continue;
                }
            }

            let (category, color) = event_category(event, &categories);
            let duration = bool_field(data, "has_duration")
                .then(|| i64_field(data, "duration"))
                .flatten()
                .filter(|&d| d > 1);
            let limited = bool_field(data, "limited_repeat");

            let total = classifications.len();
            for (index, classification) in classifications.into_iter().enumerate() {
                let mut draft_warnings = classification.warnings;
                if limited {
                    draft_warnings.push(
                        "limited repeat count is not supported; the event repeats indefinitely"
                            .to_string(),
                    );
                }
                let start_date = classification
                    .start_date
                    .or(event_date)
                    .unwrap_or(CalendarDate::start_of_year(0));
                let end_date = duration.map(|d| add_days(calendar, &start_date, d - 1));

                extraction.drafts.push(EventDraft {
                    name: branch_label(&name, index, total),
                    content: content.clone(),
                    start_date,
                    end_date,
                    recurrence: classification.recurrence,
                    category: category.clone(),
                    color: color.clone(),
                    warnings: draft_warnings,
                });
            }
        }

        if !extraction.undatable.is_empty() {
            warnings.push(format!(
                "{} event(s) without a date were set aside for archival",
                extraction.undatable.len()
            ));
        }
        extraction.warnings = warnings.into_vec();
        extraction
    }
}

impl FantasyCalendarAdapter {
    fn convert_moons(&self, moons: &[Value], warnings: &mut Warnings) -> Vec<Moon> {
        moons
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let name = text_field(m, "name").unwrap_or_else(|| format!("Moon {}", i + 1));
                if text_field(m, "custom_cycle").is_some() {
                    warnings.push(format!(
                        "moon `{}` uses a custom phase sequence; imported with its average cycle",
                        name
                    ));
                }
                warnings.push(format!(
                    "moon `{}` has no known new-moon date; reference date set to year 0",
                    name
                ));
                Moon {
                    cycle_length: f64_field(m, "cycle").unwrap_or(0.0),
                    // The source subtracts its shift from the elapsed day count.
                    cycle_day_adjust: -f64_field(m, "shift").unwrap_or(0.0),
                    reference_date: CalendarDate::start_of_year(0),
                    phases: synthesize_phases(self.options.synthesized_phase_count),
                    color: text_field(m, "color"),
                    name,
                }
            })
            .collect()
    }
}

fn convert_timespans(timespans: &[Value], warnings: &mut Warnings) -> Vec<Month> {
    timespans
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let name = text_field(t, "name").unwrap_or_else(|| format!("Month {}", i + 1));
            if u32_field(t, "interval").is_some_and(|n| n > 1) {
                warnings.push(format!(
                    "month `{}` only occurs every few years in the source; imported as occurring every year",
                    name
                ));
            }
            if array_field(t, "week").is_some_and(|w| !w.is_empty()) {
                warnings.push(format!(
                    "month `{}` defines its own week; custom per-month weekdays are not supported",
                    name
                ));
            }
            Month {
                ordinal: i + 1,
                days: u32_field(t, "length").unwrap_or(0),
                abbreviation: text_field(t, "abbreviation"),
                leap_days: None,
                intercalary: str_field(t, "type") == Some("intercalary"),
                name,
            }
        })
        .collect()
}

fn convert_weekdays(days: &[Value]) -> Vec<Weekday> {
    days.iter()
        .enumerate()
        .map(|(i, d)| Weekday {
            name: d
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Day {}", i + 1)),
            abbreviation: None,
            ordinal: i + 1,
        })
        .collect()
}

/// Fold leap days into month lengths, named festivals and one leap rule.
fn convert_leap_days(leap_days: &[Value], calendar: &mut CalendarModel, warnings: &mut Warnings) {
    let mut rules: BTreeSet<(String, i64)> = BTreeSet::new();

    for (i, leap) in leap_days.iter().enumerate() {
        let name = text_field(leap, "name").unwrap_or_else(|| format!("Leap Day {}", i + 1));
        let pattern = leap
            .get("interval")
            .and_then(id_text)
            .unwrap_or_else(|| "1".to_string());
        rules.insert((pattern.replace(' ', ""), i64_field(leap, "offset").unwrap_or(0)));

        let index = usize_field(leap, "timespan").unwrap_or(0);
        let Some(month) = calendar.months.get_mut(index) else {
            warnings.push(format!(
                "leap day `{}` targets month index {} which does not exist; dropped",
                name, index
            ));
            continue;
        };
        let leap_length = month.leap_days.unwrap_or(month.days) + 1;
        month.leap_days = Some(leap_length);

        let day = u32_field(leap, "day")
            .filter(|&d| d > 0)
            .unwrap_or(leap_length)
            .min(leap_length);
        calendar.festivals.push(Festival {
            name,
            month: month.ordinal,
            day,
            leap_only: true,
        });
    }

    let Some((pattern, start)) = rules.iter().next().cloned() else {
        return;
    };
    if rules.len() > 1 {
        warnings.push(format!(
            "{} distinct leap rules collapsed into `{}`; every leap day now follows it",
            rules.len(),
            pattern
        ));
    }

    calendar.leap_year_rule = match LeapPattern::parse(&pattern) {
        Ok(parsed) if parsed == LeapPattern::gregorian() => LeapYearRule::Gregorian { start },
        Ok(parsed) => match parsed.as_simple_interval() {
            Some(interval) => LeapYearRule::Simple { interval, start },
            None => LeapYearRule::Custom {
                pattern: parsed,
                start,
            },
        },
        Err(err) => {
            warnings.push(format!("{}; leap years disabled", err));
            LeapYearRule::None
        }
    };
}

fn convert_seasons(
    seasons: Option<&Value>,
    calendar: &CalendarModel,
    warnings: &mut Warnings,
) -> Seasons {
    let Some(data) = seasons.and_then(|s| array_field(s, "data")) else {
        return Seasons::default();
    };
    let settings = seasons
        .and_then(|s| s.get("global_settings"))
        .unwrap_or(&Value::Null);
    let periodic = bool_field(settings, "periodic_seasons");

    let mut cursor = i64_field(settings, "season_offset").unwrap_or(0);
    let starts = data
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let start = if periodic {
                let start = cursor;
                cursor += i64_field(s, "duration").unwrap_or(0)
                    + i64_field(s, "transition_length").unwrap_or(0);
                start
            } else {
                let month = usize_field(s, "timespan").unwrap_or(0);
                let day = u32_field(s, "day").unwrap_or(1);
                month_day_to_day_of_year(calendar, month + 1, day)
            };
            SeasonStart {
                name: text_field(s, "name").unwrap_or_else(|| format!("Season {}", i + 1)),
                color: season_color(s),
                start,
            }
        })
        .collect();

    if data.iter().any(|s| s.get("time").is_some()) {
        warnings.push("season sunrise and sunset times are not imported");
    }
    reconstruct(starts, days_per_year(calendar, false), warnings)
}

fn season_color(season: &Value) -> Option<String> {
    match season.get("color")? {
        Value::String(s) => Some(s.clone()).filter(|s| !s.is_empty()),
        Value::Array(colors) => colors.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn convert_clock(clock: Option<&Value>) -> TimeUnits {
    let defaults = TimeUnits::default();
    let Some(clock) = clock else {
        return defaults;
    };
    TimeUnits {
        hours_per_day: u32_field(clock, "hours")
            .filter(|&h| h > 0)
            .unwrap_or(defaults.hours_per_day),
        minutes_per_hour: u32_field(clock, "minutes")
            .filter(|&m| m > 0)
            .unwrap_or(defaults.minutes_per_hour),
        seconds_per_minute: defaults.seconds_per_minute,
    }
}

/// Eras run from their start year up to the year before the next era.
fn convert_eras(eras: &[Value], warnings: &mut Warnings) -> Vec<Era> {
    let mut starts: Vec<(i64, &Value)> = eras
        .iter()
        .map(|e| (e.pointer("/date/year").and_then(as_i64).unwrap_or(0), e))
        .collect();
    starts.sort_by_key(|(year, _)| *year);

    let ends: Vec<Option<i64>> = (0..starts.len())
        .map(|i| starts.get(i + 1).map(|(next, _)| next - 1))
        .collect();

    starts
        .iter()
        .zip(ends)
        .enumerate()
        .map(|(i, ((start_year, era), end_year))| {
            let name = text_field(era, "name").unwrap_or_else(|| format!("Era {}", i + 1));
            let custom = era
                .pointer("/settings/use_custom_format")
                .is_some_and(|v| v.as_bool() == Some(true));
            let format = match text_field(era, "formatting") {
                Some(template) if custom => EraFormat::Template {
                    template: translate_era_template(&template, &name, warnings),
                },
                _ => EraFormat::Suffix,
            };
            Era {
                abbreviation: initials(&name),
                start_year: *start_year,
                end_year: end_year.filter(|end| end >= start_year),
                format,
                name,
            }
        })
        .collect()
}

fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|w| w.chars().next())
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

fn convert_cycles(data: &[Value], warnings: &mut Warnings) -> Vec<Cycle> {
    data.iter()
        .filter_map(|c| {
            let entries: Vec<String> = array_field(c, "names")
                .map(|ns| ns.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default();
            if entries.is_empty() {
                warnings.push("cycle without names dropped");
                return None;
            }
            let based_on = match str_field(c, "type").unwrap_or("year") {
                "year" => CycleBasis::Year,
                "era_year" => CycleBasis::EraYear,
                "timespan_index" => CycleBasis::Month,
                "num_timespans" => CycleBasis::MonthsElapsed,
                "day" => CycleBasis::MonthDay,
                "year_day" => CycleBasis::YearDay,
                "epoch" => CycleBasis::Day,
                other => {
                    warnings.push(format!("cycle type `{}` unknown; counted by year", other));
                    CycleBasis::Year
                }
            };
            Some(Cycle {
                length: u32::try_from(entries.len()).unwrap_or(u32::MAX),
                offset: i64_field(c, "offset").unwrap_or(0),
                based_on,
                entries,
            })
        })
        .collect()
}

/// `{year, timespan, day}` as a canonical date.
fn dated(value: &Value) -> Option<CalendarDate> {
    Some(CalendarDate::new(
        i64_field(value, "year")?,
        usize_field(value, "timespan").unwrap_or(0),
        u32_field(value, "day").unwrap_or(1).max(1),
    ))
}

/// An event's `[year, timespan, day]` triple.
fn date_triple(value: &Value) -> Option<CalendarDate> {
    let parts = value.as_array()?;
    let year = parts.first().and_then(as_i64)?;
    let month = parts.get(1).and_then(as_i64).and_then(|m| usize::try_from(m).ok())?;
    let day = parts.get(2).and_then(as_i64).and_then(|d| u32::try_from(d).ok())?;
    Some(CalendarDate::new(year, month, day.max(1)))
}

fn event_category(event: &Value, categories: &[Value]) -> (Option<String>, Option<String>) {
    let own_color = event
        .pointer("/settings/color")
        .and_then(Value::as_str)
        .map(str::to_string);

    let category = event
        .get("event_category_id")
        .and_then(id_text)
        .and_then(|id| {
            categories
                .iter()
                .find(|c| c.get("id").and_then(id_text).as_deref() == Some(id.as_str()))
        });
    let Some(category) = category else {
        return (None, own_color);
    };

    let color = own_color.or_else(|| {
        category
            .pointer("/event_settings/color")
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    (text_field(category, "name"), color)
}
