//! Canonical calendar data structures.
//!
//! These types carry no logic beyond small accessors. Conversions live in
//! [`crate::arithmetic`], consistency checks in [`crate::validate`].
//!
//! Index conventions:
//!
//! - `Month::ordinal`, `Weekday::ordinal` and `Festival::month` are 1-based.
//! - [`CalendarDate::month`] is a 0-based index into `CalendarModel::months`,
//!   [`CalendarDate::day`] is 1-based.
//! - Day-of-year values are 0-based.

use serde::{Deserialize, Serialize};

use crate::leap::LeapPattern;

/// A concrete date in a [`CalendarModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: i64,
    /// 0-based month index.
    pub month: usize,
    /// 1-based day of month.
    pub day: u32,
}

impl CalendarDate {
    pub fn new(year: i64, month: usize, day: u32) -> Self {
        Self { year, month, day }
    }

    /// First day of the first month of `year`.
    pub fn start_of_year(year: i64) -> Self {
        Self::new(year, 0, 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Month {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    /// 1-based position in the year.
    pub ordinal: usize,
    pub days: u32,
    /// Length in leap years, when it differs from `days`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leap_days: Option<u32>,
    #[serde(default)]
    pub intercalary: bool,
}

impl Month {
    /// Number of days this month has in a leap or common year.
    pub fn length(&self, leap: bool) -> u32 {
        match (leap, self.leap_days) {
            (true, Some(days)) => days,
            _ => self.days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weekday {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    pub ordinal: usize,
}

/// Policy deciding which years are leap years.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LeapYearRule {
    #[default]
    None,
    /// Every `interval` years counted from `start`.
    Simple { interval: u32, start: i64 },
    /// Divisible by 4, except by 100 unless by 400, counted from `start`.
    Gregorian { start: i64 },
    Custom { pattern: LeapPattern, start: i64 },
}

/// Where a dated season begins or ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeasonBoundary {
    /// 0-based day of year.
    DayOfYear(u32),
    /// 1-based month ordinal and 1-based day.
    MonthDay { month: usize, day: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatedSeason {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub start: SeasonBoundary,
    /// Inclusive. May precede `start`, in which case the season wraps the year end.
    pub end: SeasonBoundary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicSeason {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Seasons {
    Dated { seasons: Vec<DatedSeason> },
    /// Laid end-to-end from `offset`, wrapping modulo the year length.
    Periodic { offset: i64, seasons: Vec<PeriodicSeason> },
}

impl Default for Seasons {
    fn default() -> Self {
        Seasons::Dated {
            seasons: Vec::new(),
        }
    }
}

impl Seasons {
    pub fn len(&self) -> usize {
        match self {
            Seasons::Dated { seasons } => seasons.len(),
            Seasons::Periodic { seasons, .. } => seasons.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        match self {
            Seasons::Dated { seasons } => seasons.get(index).map(|s| s.name.as_str()),
            Seasons::Periodic { seasons, .. } => seasons.get(index).map(|s| s.name.as_str()),
        }
    }

    pub fn color(&self, index: usize) -> Option<&str> {
        match self {
            Seasons::Dated { seasons } => seasons.get(index).and_then(|s| s.color.as_deref()),
            Seasons::Periodic { seasons, .. } => {
                seasons.get(index).and_then(|s| s.color.as_deref())
            }
        }
    }
}

/// A season resolved for a particular day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonRef<'a> {
    pub index: usize,
    pub name: &'a str,
    pub color: Option<&'a str>,
}

/// How an era renders a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "camelCase")]
pub enum EraFormat {
    /// `"{abbreviation} {year}"`
    Prefix,
    /// `"{year} {abbreviation}"`
    Suffix,
    /// Free-form text with `{year}`, `{abbreviation}`, `{era}` and `{yearInEra}`.
    Template { template: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Era {
    pub name: String,
    pub abbreviation: String,
    pub start_year: i64,
    /// Open-ended when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_year: Option<i64>,
    pub format: EraFormat,
}

impl Era {
    pub fn contains(&self, year: i64) -> bool {
        year >= self.start_year && self.end_year.is_none_or(|end| year <= end)
    }
}

/// Half-open fractional interval `[start, end)` of a moon's cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoonPhase {
    pub name: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moon {
    pub name: String,
    /// Days per full cycle.
    pub cycle_length: f64,
    /// Signed shift, in days, applied to the elapsed count.
    #[serde(default)]
    pub cycle_day_adjust: f64,
    /// A date at which the cycle position is 0.
    pub reference_date: CalendarDate,
    pub phases: Vec<MoonPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// The date component a [`Cycle`] counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleBasis {
    #[default]
    Year,
    EraYear,
    Month,
    /// Months elapsed since the epoch.
    MonthsElapsed,
    MonthDay,
    /// Days elapsed since the epoch.
    Day,
    YearDay,
}

/// A repeating sequence of names, e.g. a zodiac of years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub length: u32,
    #[serde(default)]
    pub offset: i64,
    pub based_on: CycleBasis,
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeUnits {
    pub hours_per_day: u32,
    pub minutes_per_hour: u32,
    pub seconds_per_minute: u32,
}

impl Default for TimeUnits {
    fn default() -> Self {
        Self {
            hours_per_day: 24,
            minutes_per_hour: 60,
            seconds_per_minute: 60,
        }
    }
}

impl TimeUnits {
    pub fn seconds_per_day(&self) -> u64 {
        u64::from(self.hours_per_day)
            * u64::from(self.minutes_per_hour)
            * u64::from(self.seconds_per_minute)
    }
}

/// A named day, such as a leap-day festival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Festival {
    pub name: String,
    /// 1-based month ordinal.
    pub month: usize,
    pub day: u32,
    /// Only observed in leap years.
    #[serde(default)]
    pub leap_only: bool,
}

/// The canonical calendar.
///
/// `daysPerYear` is intentionally absent: it is always derived from `months`
/// via [`crate::arithmetic::days_per_year`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarModel {
    pub name: String,
    pub months: Vec<Month>,
    pub weekdays: Vec<Weekday>,
    /// Weekday index of the first day of year 0.
    #[serde(default)]
    pub first_weekday: usize,
    #[serde(default)]
    pub leap_year_rule: LeapYearRule,
    #[serde(default)]
    pub seasons: Seasons,
    #[serde(default)]
    pub eras: Vec<Era>,
    #[serde(default)]
    pub moons: Vec<Moon>,
    #[serde(default)]
    pub cycles: Vec<Cycle>,
    /// Template with `{1}`..`{n}` placeholders for the cycle entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_format: Option<String>,
    #[serde(default)]
    pub time_units: TimeUnits,
    #[serde(default)]
    pub festivals: Vec<Festival>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_date: Option<CalendarDate>,
}

impl CalendarModel {
    /// Look up a month by its 1-based ordinal.
    pub fn month_by_ordinal(&self, ordinal: usize) -> Option<&Month> {
        ordinal.checked_sub(1).and_then(|i| self.months.get(i))
    }

    /// Resolve a weekday by name (case-insensitive) or by 0-based index.
    pub fn weekday_index(&self, name_or_index: &str) -> Option<usize> {
        let needle = name_or_index.trim();
        self.weekdays
            .iter()
            .position(|w| {
                w.name.eq_ignore_ascii_case(needle)
                    || w
                        .abbreviation
                        .as_deref()
                        .is_some_and(|a| a.eq_ignore_ascii_case(needle))
            })
            .or_else(|| {
                needle
                    .parse::<usize>()
                    .ok()
                    .filter(|&i| i < self.weekdays.len())
            })
    }
}
