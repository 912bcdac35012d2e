//! Consistency checks for a [`CalendarModel`].
//!
//! [`validate`] never fails; it returns every violation it finds so a caller can
//! decide whether to block or proceed. Arithmetic over a model without
//! `Error`-severity violations is guaranteed not to divide by zero.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arithmetic::{days_per_year, resolve_boundary};
use crate::model::{CalendarModel, LeapYearRule, Seasons};

/// Tolerance when checking that moon phases tile `[0, 1)`.
pub const PHASE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Warning,
    Error,
}

/// One broken constraint, naming the entity it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub entity: String,
    pub constraint: String,
    pub severity: Severity,
}

impl Violation {
    fn error(entity: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            constraint: constraint.into(),
            severity: Severity::Error,
        }
    }

    fn warning(entity: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            constraint: constraint.into(),
            severity: Severity::Warning,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}: {}", level, self.entity, self.constraint)
    }
}

/// Whether any violation blocks arithmetic over the model.
pub fn has_errors(violations: &[Violation]) -> bool {
    violations.iter().any(|v| v.severity == Severity::Error)
}

/// Check every structural invariant of `model`.
pub fn validate(model: &CalendarModel) -> Vec<Violation> {
    let mut out = Vec::new();
    check_months(model, &mut out);
    check_weekdays(model, &mut out);
    check_leap_rule(model, &mut out);
    check_seasons(model, &mut out);
    check_eras(model, &mut out);
    check_moons(model, &mut out);
    check_cycles(model, &mut out);
    check_misc(model, &mut out);
    out
}

fn check_months(model: &CalendarModel, out: &mut Vec<Violation>) {
    if model.months.is_empty() {
        out.push(Violation::error("calendar", "must define at least one month"));
        return;
    }
    for (i, month) in model.months.iter().enumerate() {
        if month.ordinal != i + 1 {
            out.push(Violation::error(
                format!("month `{}`", month.name),
                format!("ordinal {} should be {}", month.ordinal, i + 1),
            ));
        }
    }
    if days_per_year(model, false) == 0 {
        out.push(Violation::error("calendar", "common year has no days"));
    } else if !matches!(model.leap_year_rule, LeapYearRule::None) && days_per_year(model, true) == 0 {
        out.push(Violation::error("calendar", "leap year has no days"));
    }
}

fn check_weekdays(model: &CalendarModel, out: &mut Vec<Violation>) {
    if model.weekdays.is_empty() {
        out.push(Violation::error("calendar", "must define at least one weekday"));
        return;
    }
    for (i, weekday) in model.weekdays.iter().enumerate() {
        if weekday.ordinal != i + 1 {
            out.push(Violation::error(
                format!("weekday `{}`", weekday.name),
                format!("ordinal {} should be {}", weekday.ordinal, i + 1),
            ));
        }
    }
    if model.first_weekday >= model.weekdays.len() {
        out.push(Violation::error(
            "calendar",
            format!(
                "first weekday index {} is out of range for {} weekdays",
                model.first_weekday,
                model.weekdays.len()
            ),
        ));
    }
}

fn check_leap_rule(model: &CalendarModel, out: &mut Vec<Violation>) {
    match &model.leap_year_rule {
        LeapYearRule::None => return,
        LeapYearRule::Simple { interval: 0, .. } => {
            out.push(Violation::error("leap rule", "interval must be greater than zero"));
        }
        LeapYearRule::Custom { pattern, .. } if !pattern.has_inclusive_term() => {
            out.push(Violation::error(
                "leap rule",
                format!("pattern `{}` never produces a leap year", pattern),
            ));
        }
        _ => {}
    }
    if model.months.iter().all(|m| m.leap_days.is_none()) {
        out.push(Violation::warning(
            "leap rule",
            "no month defines leap days, so leap years are identical to common years",
        ));
    }
}

fn check_seasons(model: &CalendarModel, out: &mut Vec<Violation>) {
    let total = i64::from(days_per_year(model, false));
    match &model.seasons {
        Seasons::Dated { seasons } => {
            let mut ranges = Vec::with_capacity(seasons.len());
            for season in seasons {
                let start = resolve_boundary(model, &season.start);
                let end = resolve_boundary(model, &season.end);
                let entity = format!("season `{}`", season.name);
                if !(0..total).contains(&start) || !(0..total).contains(&end) {
                    out.push(Violation::error(
                        entity,
                        format!("range {}..={} is outside the {}-day year", start, end, total),
                    ));
                    ranges.push(None);
                } else {
                    ranges.push(Some((start, end)));
                }
            }

            // Gaps are legal; overlaps are not.
            let mut overlaps = BTreeSet::new();
            for day in 0..total {
                let covering: Vec<usize> = ranges
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| matches!(r, Some(range) if range_contains(*range, day)))
                    .map(|(i, _)| i)
                    .collect();
                for (n, &a) in covering.iter().enumerate() {
                    for &b in &covering[n + 1..] {
                        overlaps.insert((a, b));
                    }
                }
            }
            for (a, b) in overlaps {
                out.push(Violation::error(
                    format!("season `{}`", seasons[a].name),
                    format!("overlaps season `{}`", seasons[b].name),
                ));
            }
        }
        Seasons::Periodic { seasons, .. } => {
            for season in seasons {
                if season.duration == 0 {
                    out.push(Violation::error(
                        format!("season `{}`", season.name),
                        "duration must be greater than zero",
                    ));
                }
            }
            let sum: i64 = seasons.iter().map(|s| i64::from(s.duration)).sum();
            if sum > total {
                out.push(Violation::error(
                    "seasons",
                    format!(
                        "periodic durations sum to {} days, overlapping within the {}-day year",
                        sum, total
                    ),
                ));
            }
        }
    }
}

fn check_eras(model: &CalendarModel, out: &mut Vec<Violation>) {
    for era in &model.eras {
        if let Some(end) = era.end_year {
            if era.start_year > end {
                out.push(Violation::error(
                    format!("era `{}`", era.name),
                    format!("start year {} is after end year {}", era.start_year, end),
                ));
            }
        }
    }
    for (i, a) in model.eras.iter().enumerate() {
        for b in &model.eras[i + 1..] {
            let a_end = a.end_year.unwrap_or(i64::MAX);
            let b_end = b.end_year.unwrap_or(i64::MAX);
            if a.start_year <= b_end && b.start_year <= a_end {
                out.push(Violation::warning(
                    format!("era `{}`", a.name),
                    format!("overlaps era `{}`; the later era wins", b.name),
                ));
            }
        }
    }
}

fn check_moons(model: &CalendarModel, out: &mut Vec<Violation>) {
    for moon in &model.moons {
        let entity = format!("moon `{}`", moon.name);
        if !moon.cycle_length.is_finite() || moon.cycle_length <= 0.0 {
            out.push(Violation::error(
                entity.clone(),
                "cycle length must be a positive number of days",
            ));
        }
        if moon.phases.is_empty() {
            out.push(Violation::error(entity, "must define at least one phase"));
            continue;
        }

        let mut phases: Vec<(f64, f64)> = moon.phases.iter().map(|p| (p.start, p.end)).collect();
        phases.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut cursor = 0.0;
        for (start, end) in phases {
            if end.is_nan() || end <= start {
                out.push(Violation::error(
                    entity.clone(),
                    format!("phase [{}, {}) is empty", start, end),
                ));
            }
            if (start - cursor).abs() > PHASE_TOLERANCE {
                let problem = if start > cursor { "gap" } else { "overlap" };
                out.push(Violation::error(
                    entity.clone(),
                    format!("phases leave a {} at {}", problem, cursor.min(start)),
                ));
            }
            cursor = end;
        }
        if (cursor - 1.0).abs() > PHASE_TOLERANCE {
            out.push(Violation::error(
                entity,
                format!("phases end at {} instead of 1", cursor),
            ));
        }
    }
}

fn check_cycles(model: &CalendarModel, out: &mut Vec<Violation>) {
    for (i, cycle) in model.cycles.iter().enumerate() {
        let entity = format!("cycle {}", i + 1);
        if cycle.length == 0 {
            out.push(Violation::error(entity, "length must be greater than zero"));
        } else if cycle.entries.len() != cycle.length as usize {
            out.push(Violation::error(
                entity,
                format!(
                    "has {} entries but a length of {}",
                    cycle.entries.len(),
                    cycle.length
                ),
            ));
        }
    }
}

fn check_misc(model: &CalendarModel, out: &mut Vec<Violation>) {
    let t = &model.time_units;
    if t.hours_per_day == 0 || t.minutes_per_hour == 0 || t.seconds_per_minute == 0 {
        out.push(Violation::error("time units", "every unit must be greater than zero"));
    }

    for festival in &model.festivals {
        let fits = model
            .month_by_ordinal(festival.month)
            .is_some_and(|m| festival.day >= 1 && festival.day <= m.length(festival.leap_only));
        if !fits {
            out.push(Violation::error(
                format!("festival `{}`", festival.name),
                format!("day {} of month {} does not exist", festival.day, festival.month),
            ));
        }
    }

    if let Some(date) = &model.current_date {
        let fits = model
            .months
            .get(date.month)
            .is_some_and(|m| date.day >= 1 && date.day <= m.length(true));
        if !fits {
            out.push(Violation::warning(
                "current date",
                format!("month {} day {} does not exist", date.month, date.day),
            ));
        }
    }
}

fn range_contains((start, end): (i64, i64), day: i64) -> bool {
    if end >= start {
        day >= start && day <= end
    } else {
        day >= start || day <= end
    }
}
