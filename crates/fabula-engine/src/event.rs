//! Canonical event drafts produced by import.

use serde::{Deserialize, Serialize};

use crate::model::CalendarDate;

/// How often, and under which condition, an event recurs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Recurrence {
    /// Happens once, on the start date.
    #[default]
    Never,
    Yearly,
    Monthly,
    /// Every week on the given 0-based weekday index.
    Weekly { weekday: usize },
    /// Every year during the given 0-based season index.
    Seasonal { season: usize },
    /// The `week`th week of each month, optionally on one weekday.
    #[serde(rename_all = "camelCase")]
    WeekOfMonth {
        week: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weekday: Option<usize>,
    },
    /// Whenever `moon` is within `[phaseStart, phaseEnd)` of its cycle.
    #[serde(rename_all = "camelCase")]
    Moon {
        moon: usize,
        phase_start: f64,
        phase_end: f64,
    },
    /// On any given day with `probability` in `[0, 1]`, reproducible via `seed`.
    Random { probability: f64, seed: u64 },
}

impl Recurrence {
    /// Short name of the category, as used in logs and warnings.
    pub fn category(&self) -> &'static str {
        match self {
            Recurrence::Never => "never",
            Recurrence::Yearly => "yearly",
            Recurrence::Monthly => "monthly",
            Recurrence::Weekly { .. } => "weekly",
            Recurrence::Seasonal { .. } => "seasonal",
            Recurrence::WeekOfMonth { .. } => "weekOfMonth",
            Recurrence::Moon { .. } => "moon",
            Recurrence::Random { .. } => "random",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub name: String,
    pub content: String,
    pub start_date: CalendarDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<CalendarDate>,
    pub recurrence: Recurrence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Lossy conversions that affected this draft.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// A source event with no resolvable date, kept for free-form archival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndatableRecord {
    pub name: String,
    pub content: String,
    /// Why the event could not be placed on the calendar.
    pub reason: String,
}
