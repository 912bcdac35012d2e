//! Loading calendars that are already in canonical form.
//!
//! Stored calendars may carry a `daysPerYear` value written by older tools.
//! It is never trusted: the year length is always derived from `months`, and a
//! disagreement is reported as a warning.

use serde_json::Value;

use crate::arithmetic::reconcile_days_per_year;
use crate::error::{ImportError, Result};
use crate::import::json::u32_field;
use crate::model::CalendarModel;

/// Parse canonical calendar JSON.
///
/// # Errors
/// Returns [`ImportError::JsonParse`] when the text is not JSON or does not
/// match the [`CalendarModel`] shape.
pub fn load_canonical(json: &str) -> Result<(CalendarModel, Vec<String>)> {
    let mut raw: Value = serde_json::from_str(json)?;
    if !raw.is_object() {
        return Err(ImportError::invalid("calendar", "expected a JSON object"));
    }

    let stored = u32_field(&raw, "daysPerYear");
    if let Value::Object(map) = &mut raw {
        map.remove("daysPerYear");
    }

    let model: CalendarModel = serde_json::from_value(raw)?;
    let warnings = stored
        .and_then(|days| reconcile_days_per_year(&model, days))
        .into_iter()
        .inspect(|w| tracing::warn!(message = %w, "stored year length ignored"))
        .collect();
    Ok((model, warnings))
}
