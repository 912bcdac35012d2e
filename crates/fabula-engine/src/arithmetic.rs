//! Date arithmetic over a [`CalendarModel`].
//!
//! Every function here is total: given a model that passed
//! [`crate::validate::validate`] none of them panic or divide by zero, and even
//! on an unvalidated model they fall back to a sensible value instead.
//!
//! Month arguments to [`day_of_year_to_month_day`] and
//! [`month_day_to_day_of_year`] are 1-based ordinals; [`CalendarDate`] months are
//! 0-based indices. Day-of-year is always 0-based.

use crate::model::{
    CalendarDate, CalendarModel, CycleBasis, Era, EraFormat, LeapYearRule, Moon, MoonPhase,
    SeasonBoundary, SeasonRef, Seasons,
};

/// Custom leap patterns repeating over more years than this are summed year by year.
const MAX_LEAP_PERIOD: u64 = 10_000;

/// Days in a year: the sum of month lengths, using leap lengths when `leap`.
pub fn days_per_year(model: &CalendarModel, leap: bool) -> u32 {
    model.months.iter().map(|m| m.length(leap)).sum()
}

/// Days in the given year, taking the leap rule into account.
pub fn year_length(model: &CalendarModel, year: i64) -> u32 {
    days_per_year(model, is_leap_year(model, year))
}

/// Whether `year` is a leap year under the model's rule.
pub fn is_leap_year(model: &CalendarModel, year: i64) -> bool {
    match &model.leap_year_rule {
        LeapYearRule::None => false,
        LeapYearRule::Simple { interval, start } => {
            *interval > 0 && year.saturating_sub(*start).rem_euclid(i64::from(*interval)) == 0
        }
        LeapYearRule::Gregorian { start } => {
            let y = year.saturating_sub(*start);
            (y.rem_euclid(4) == 0 && y.rem_euclid(100) != 0) || y.rem_euclid(400) == 0
        }
        LeapYearRule::Custom { pattern, start } => pattern.is_leap(year, *start),
    }
}

/// Convert a 0-based day of year into a 1-based `(month, day)` pair.
///
/// `day_of_year` is wrapped into `[0, daysPerYear)` with a floor modulo, so
/// negative and over-range values land on the matching day of the common year.
pub fn day_of_year_to_month_day(model: &CalendarModel, day_of_year: i64) -> (usize, u32) {
    let total = i64::from(days_per_year(model, false));
    if total == 0 {
        return last_day(model, false);
    }
    let (index, day) = locate(model, false, day_of_year.rem_euclid(total));
    (index + 1, day)
}

/// Convert a 1-based `(month, day)` pair into a 0-based day of year.
///
/// Exact inverse of [`day_of_year_to_month_day`] over the common year.
pub fn month_day_to_day_of_year(model: &CalendarModel, month: usize, day: u32) -> i64 {
    let preceding: i64 = model
        .months
        .iter()
        .take(month.saturating_sub(1))
        .map(|m| i64::from(m.days))
        .sum();
    preceding + i64::from(day) - 1
}

/// Leap-aware 0-based day of year of a concrete date.
pub fn day_of_year_in(model: &CalendarModel, date: &CalendarDate) -> i64 {
    let leap = is_leap_year(model, date.year);
    let preceding: i64 = model
        .months
        .iter()
        .take(date.month)
        .map(|m| i64::from(m.length(leap)))
        .sum();
    preceding + i64::from(date.day) - 1
}

/// Signed number of days from `from` to `to`.
pub fn days_between(model: &CalendarModel, from: &CalendarDate, to: &CalendarDate) -> i64 {
    let years = if from.year <= to.year {
        sum_year_lengths(model, from.year, to.year)
    } else {
        -sum_year_lengths(model, to.year, from.year)
    };
    years
        .saturating_sub(day_of_year_in(model, from))
        .saturating_add(day_of_year_in(model, to))
}

/// The date `days` days after (or before, when negative) `date`.
pub fn add_days(model: &CalendarModel, date: &CalendarDate, days: i64) -> CalendarDate {
    if model.months.is_empty() || days_per_year(model, false) == 0 {
        return *date;
    }

    let mut year = date.year;
    let mut offset = day_of_year_in(model, date).saturating_add(days);

    // Consecutive empty years walked over; past one full leap period every
    // year is empty and there is nowhere to land.
    let mut empty_run = 0u64;
    while offset < 0 {
        let Some(previous) = year.checked_sub(1) else {
            return *date;
        };
        year = previous;
        let len = year_length(model, year);
        if len == 0 {
            empty_run += 1;
            if empty_run > MAX_LEAP_PERIOD {
                return *date;
            }
        } else {
            empty_run = 0;
        }
        offset += i64::from(len);
    }
    empty_run = 0;
    loop {
        let len = i64::from(year_length(model, year));
        if len > 0 && offset < len {
            break;
        }
        if len == 0 {
            empty_run += 1;
            if empty_run > MAX_LEAP_PERIOD {
                return *date;
            }
        } else {
            empty_run = 0;
        }
        let Some(next) = year.checked_add(1) else {
            break;
        };
        offset -= len;
        year = next;
    }

    let (month, day) = locate(model, is_leap_year(model, year), offset);
    CalendarDate::new(year, month, day)
}

/// 0-based weekday index of `date`, or `None` when the model has no weekdays.
pub fn weekday_of(model: &CalendarModel, date: &CalendarDate) -> Option<usize> {
    let count = i64::try_from(model.weekdays.len()).ok().filter(|&n| n > 0)?;
    let elapsed = days_between(model, &CalendarDate::start_of_year(0), date);
    let first = i64::try_from(model.first_weekday).unwrap_or(0);
    usize::try_from(elapsed.saturating_add(first).rem_euclid(count)).ok()
}

/// Resolve a season boundary to a 0-based day of year.
pub fn resolve_boundary(model: &CalendarModel, boundary: &SeasonBoundary) -> i64 {
    match *boundary {
        SeasonBoundary::DayOfYear(day) => i64::from(day),
        SeasonBoundary::MonthDay { month, day } => month_day_to_day_of_year(model, month, day),
    }
}

/// Inclusive `[start, end]` day-of-year range of the dated season at `index`.
pub fn dated_season_range(model: &CalendarModel, index: usize) -> Option<(i64, i64)> {
    match &model.seasons {
        Seasons::Dated { seasons } => seasons
            .get(index)
            .map(|s| (resolve_boundary(model, &s.start), resolve_boundary(model, &s.end))),
        Seasons::Periodic { .. } => None,
    }
}

/// The season containing `day_of_year`, if any.
///
/// Dated ranges whose end precedes their start wrap across the year boundary.
pub fn season_at(model: &CalendarModel, day_of_year: i64) -> Option<SeasonRef<'_>> {
    let total = i64::from(days_per_year(model, false));
    if total == 0 {
        return None;
    }
    let day = day_of_year.rem_euclid(total);

    let index = match &model.seasons {
        Seasons::Dated { seasons } => (0..seasons.len()).find(|&i| {
            dated_season_range(model, i).is_some_and(|(start, end)| {
                if end >= start {
                    day >= start && day <= end
                } else {
                    day >= start || day <= end
                }
            })
        }),
        Seasons::Periodic { offset, seasons } => {
            let position = (day - offset).rem_euclid(total);
            let mut cursor = 0i64;
            seasons.iter().position(|s| {
                let start = cursor;
                cursor += i64::from(s.duration);
                position >= start && position < cursor
            })
        }
    }?;

    Some(SeasonRef {
        index,
        name: model.seasons.name(index)?,
        color: model.seasons.color(index),
    })
}

/// The era in effect for `year`. Later eras win when ranges overlap.
pub fn era_for(model: &CalendarModel, year: i64) -> Option<&Era> {
    model.eras.iter().rev().find(|e| e.contains(year))
}

/// Render `year` using the era in effect, or the bare number outside any era.
pub fn era_label(model: &CalendarModel, year: i64) -> String {
    let Some(era) = era_for(model, year) else {
        return year.to_string();
    };
    let year_in_era = year.saturating_sub(era.start_year).saturating_add(1);

    match &era.format {
        EraFormat::Prefix => format!("{} {}", era.abbreviation, year),
        EraFormat::Suffix => format!("{} {}", year, era.abbreviation),
        EraFormat::Template { template } => fill_placeholders(template, |name| match name {
            "year" => Some(year.to_string()),
            "abbreviation" => Some(era.abbreviation.clone()),
            "era" => Some(era.name.clone()),
            "yearInEra" => Some(year_in_era.to_string()),
            _ => None,
        }),
    }
}

/// Fractional position `[0, 1)` of `moon` in its cycle on `date`.
pub fn moon_position(model: &CalendarModel, moon: &Moon, date: &CalendarDate) -> Option<f64> {
    if moon.cycle_length.is_nan() || moon.cycle_length <= 0.0 {
        return None;
    }
    let elapsed = days_between(model, &moon.reference_date, date) as f64 + moon.cycle_day_adjust;
    let position = elapsed.rem_euclid(moon.cycle_length) / moon.cycle_length;
    // rem_euclid can round up to the divisor for tiny negative inputs.
    Some(if position >= 1.0 { 0.0 } else { position })
}

/// The phase `moon` is in on `date`.
pub fn moon_phase<'m>(
    model: &CalendarModel,
    moon: &'m Moon,
    date: &CalendarDate,
) -> Option<&'m MoonPhase> {
    let position = moon_position(model, moon, date)?;
    moon.phases
        .iter()
        .find(|p| position >= p.start && position < p.end)
        .or_else(|| moon.phases.last())
}

/// The current entry of every cycle on `date`, in cycle order.
pub fn cycle_labels<'m>(model: &'m CalendarModel, date: &CalendarDate) -> Vec<&'m str> {
    model
        .cycles
        .iter()
        .filter_map(|cycle| {
            if cycle.length == 0 {
                return None;
            }
            let value = match cycle.based_on {
                CycleBasis::Year => date.year,
                CycleBasis::EraYear => era_for(model, date.year)
                    .map(|e| date.year.saturating_sub(e.start_year).saturating_add(1))
                    .unwrap_or(date.year),
                CycleBasis::Month => i64::try_from(date.month).unwrap_or(0),
                CycleBasis::MonthsElapsed => {
                    let per_year = i64::try_from(model.months.len()).unwrap_or(i64::MAX);
                    date.year
                        .saturating_mul(per_year)
                        .saturating_add(i64::try_from(date.month).unwrap_or(0))
                }
                CycleBasis::MonthDay => i64::from(date.day),
                CycleBasis::Day => days_between(model, &CalendarDate::start_of_year(0), date),
                CycleBasis::YearDay => day_of_year_in(model, date),
            };
            let index = value
                .saturating_sub(cycle.offset)
                .rem_euclid(i64::from(cycle.length));
            usize::try_from(index)
                .ok()
                .and_then(|i| cycle.entries.get(i))
                .map(String::as_str)
        })
        .collect()
}

/// Fill the model's cycle format (`{1}`..`{n}`) for `date`.
pub fn cycle_text(model: &CalendarModel, date: &CalendarDate) -> Option<String> {
    let format = model.cycle_format.as_deref()?;
    let labels = cycle_labels(model, date);
    Some(fill_placeholders(format, |name| {
        name.parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| labels.get(i))
            .map(|s| s.to_string())
    }))
}

/// Compare a year length stored by a source against the derived value.
///
/// Returns a warning when they disagree; the derived value always wins.
pub fn reconcile_days_per_year(model: &CalendarModel, stored: u32) -> Option<String> {
    let computed = days_per_year(model, false);
    (stored != computed).then(|| {
        format!(
            "stored year length of {} days does not match the {} days derived from months; using the derived value",
            stored, computed
        )
    })
}

/// Replace every `{name}` for which `lookup` returns a value. Unknown
/// placeholders are left untouched.
pub(crate) fn fill_placeholders(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(['}', '{']) {
            Some(close) if after.as_bytes()[close] == b'}' => {
                let name = &after[..close];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Walk months (leap-aware) to find the 0-based month index and 1-based day of
/// an in-range day-of-year.
fn locate(model: &CalendarModel, leap: bool, day_of_year: i64) -> (usize, u32) {
    let mut remaining = day_of_year;
    for (index, month) in model.months.iter().enumerate() {
        let len = i64::from(month.length(leap));
        if remaining < len {
            return (index, u32::try_from(remaining + 1).unwrap_or(1));
        }
        remaining -= len;
    }
    let (ordinal, day) = last_day(model, leap);
    (ordinal.saturating_sub(1), day)
}

/// 1-based `(month, day)` of the final day of the year.
fn last_day(model: &CalendarModel, leap: bool) -> (usize, u32) {
    match model.months.last() {
        Some(m) => (model.months.len(), m.length(leap).max(1)),
        None => (1, 1),
    }
}

/// Number of years after which the leap pattern repeats.
fn leap_period(model: &CalendarModel) -> u64 {
    match &model.leap_year_rule {
        LeapYearRule::None => 1,
        LeapYearRule::Simple { interval, .. } => u64::from((*interval).max(1)),
        LeapYearRule::Gregorian { .. } => 400,
        LeapYearRule::Custom { pattern, .. } => pattern
            .terms()
            .iter()
            .try_fold(1u64, |acc, t| {
                let l = lcm(acc, u64::from(t.modulus));
                (l <= MAX_LEAP_PERIOD).then_some(l)
            })
            .unwrap_or(u64::MAX),
    }
}

/// Sum of year lengths for years in `[from, to)`, saturating at `i64::MAX`.
fn sum_year_lengths(model: &CalendarModel, from: i64, to: i64) -> i64 {
    if to <= from {
        return 0;
    }
    let sum_range = |a: i64, b: i64| -> i128 { (a..b).map(|y| i128::from(year_length(model, y))).sum() };
    let span = i128::from(to) - i128::from(from);
    let period = leap_period(model);

    let total = match i64::try_from(period) {
        Ok(years) if period <= MAX_LEAP_PERIOD && span >= i128::from(years) => {
            let full = span / i128::from(years);
            let per_period = sum_range(from, from + years);
            let tail = i64::try_from(i128::from(from) + full * i128::from(years)).unwrap_or(to);
            full * per_period + sum_range(tail, to)
        }
        _ => sum_range(from, to),
    };
    i64::try_from(total).unwrap_or(i64::MAX)
}

fn lcm(a: u64, b: u64) -> u64 {
    fn gcd(mut a: u64, mut b: u64) -> u64 {
        while b != 0 {
            (a, b) = (b, a % b);
        }
        a
    }
    if a == 0 || b == 0 {
        return 0;
    }
    a / gcd(a, b) * b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_unknown_left_verbatim() {
        let out = fill_placeholders("{a}-{b}-{", |n| (n == "a").then(|| "1".to_string()));
        assert_eq!(out, "1-{b}-{");
    }

    #[test]
    fn placeholders_nested_brace() {
        let out = fill_placeholders("{{a}}", |n| (n == "a").then(|| "x".to_string()));
        assert_eq!(out, "{x}");
    }

    #[test]
    fn lcm_basics() {
        assert_eq!(lcm(4, 6), 12);
        assert_eq!(lcm(1, 400), 400);
    }
}
