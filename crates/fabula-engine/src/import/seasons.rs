//! Season reconstruction shared by every adapter.
//!
//! Sources give either explicit start dates or durations laid out from an
//! offset. Both reduce to a list of start days; each season then ends the day
//! before the next one starts, and the last wraps around to the first.

use crate::model::{DatedSeason, SeasonBoundary, Seasons};

use super::Warnings;

#[derive(Debug, Clone)]
pub(crate) struct SeasonStart {
    pub name: String,
    pub color: Option<String>,
    /// Start day of year; may be out of range, it is wrapped.
    pub start: i64,
}

/// Build dated seasons that cover the whole `total`-day year without overlap.
pub(crate) fn reconstruct(starts: Vec<SeasonStart>, total: u32, warnings: &mut Warnings) -> Seasons {
    if starts.is_empty() {
        return Seasons::default();
    }
    if total == 0 {
        warnings.push(format!(
            "{} season(s) dropped because the calendar has no days",
            starts.len()
        ));
        return Seasons::default();
    }

    let total = i64::from(total);
    let mut starts: Vec<SeasonStart> = starts
        .into_iter()
        .map(|s| SeasonStart {
            start: s.start.rem_euclid(total),
            ..s
        })
        .collect();
    starts.sort_by_key(|s| s.start);

    let mut unique: Vec<SeasonStart> = Vec::with_capacity(starts.len());
    for season in starts {
        match unique.last() {
            Some(prev) if prev.start == season.start => warnings.push(format!(
                "season `{}` starts on the same day as `{}` and was dropped",
                season.name, prev.name
            )),
            _ => unique.push(season),
        }
    }

    let count = unique.len();
    let seasons = (0..count)
        .map(|i| {
            let next = unique[(i + 1) % count].start;
            let end = (next - 1).rem_euclid(total);
            DatedSeason {
                name: unique[i].name.clone(),
                color: unique[i].color.clone(),
                start: SeasonBoundary::DayOfYear(day(unique[i].start)),
                end: SeasonBoundary::DayOfYear(day(end)),
            }
        })
        .collect();

    Seasons::Dated { seasons }
}

fn day(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}
