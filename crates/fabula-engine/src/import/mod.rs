//! Import normalization for third-party calendar exports.
//!
//! Each supported format is one [`ImportAdapter`]. [`import`] tries them in a
//! fixed order and runs the first that recognizes the input:
//!
//! 1. [`ImportAdapter::detect`] sniffs the top-level shape
//! 2. [`ImportAdapter::transform`] builds a fresh [`CalendarModel`]
//! 3. [`ImportAdapter::extract_events`] turns source events into [`EventDraft`]s
//!
//! Structural problems abort with an [`ImportError`]. Everything lossy is
//! recovered locally and reported as a warning string.

mod era_template;
mod fantasy_calendar;
pub(crate) mod json;
mod moons;
mod seasons;
mod simple_calendar;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ImportError, Result};
use crate::event::{EventDraft, UndatableRecord};
use crate::ident::suggested_id;
use crate::model::CalendarModel;

pub use fantasy_calendar::FantasyCalendarAdapter;
pub use simple_calendar::SimpleCalendarAdapter;

/// The export formats fabula can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    SimpleCalendar,
    FantasyCalendar,
}

impl SourceFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::SimpleCalendar => "simple-calendar",
            SourceFormat::FantasyCalendar => "fantasy-calendar",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables for an import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportOptions {
    /// Which calendar of a multi-calendar export to import. Defaults to the first.
    pub calendar_id: Option<String>,
    pub suggested_id_max_len: usize,
    pub suggested_id_separator: char,
    /// Phases generated for moons whose source has no discrete phases.
    pub synthesized_phase_count: u32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            calendar_id: None,
            suggested_id_max_len: 48,
            suggested_id_separator: '-',
            synthesized_phase_count: 8,
        }
    }
}

/// A calendar built by [`ImportAdapter::transform`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub calendar: CalendarModel,
    pub warnings: Vec<String>,
}

/// Events pulled out of a source by [`ImportAdapter::extract_events`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventExtraction {
    pub drafts: Vec<EventDraft>,
    /// Events with no resolvable date, destined for free-form archival.
    pub undatable: Vec<UndatableRecord>,
    pub warnings: Vec<String>,
}

/// One source format.
///
/// Adapters hold no state between calls: transforming the same input twice
/// yields structurally identical output.
pub trait ImportAdapter {
    fn format(&self) -> SourceFormat;

    /// Cheap structural sniff of the top-level shape. No semantic validation.
    fn detect(&self, raw: &Value) -> bool;

    /// Build a canonical calendar from the source.
    ///
    /// # Errors
    /// Returns [`ImportError::MissingField`] or [`ImportError::InvalidField`]
    /// when a required part of the source is absent or malformed.
    fn transform(&self, raw: &Value) -> Result<Transformed>;

    /// Convert the source's events against an already-transformed calendar.
    fn extract_events(&self, raw: &Value, calendar: &CalendarModel) -> EventExtraction;
}

/// Wall-clock facts about an import, kept apart from the deterministic output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub source_format: SourceFormat,
    pub imported_at: DateTime<Utc>,
}

/// Everything an import hands to storage and editing collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub format: SourceFormat,
    pub calendar: CalendarModel,
    /// Advisory identifier derived from the calendar name; not guaranteed unique.
    pub suggested_id: String,
    pub events: Vec<EventDraft>,
    pub undatable: Vec<UndatableRecord>,
    pub warnings: Vec<String>,
    pub provenance: Provenance,
}

/// All adapters, in the order [`import`] tries them.
pub fn adapters(options: &ImportOptions) -> Vec<Box<dyn ImportAdapter>> {
    vec![
        Box::new(SimpleCalendarAdapter::new(options.clone())),
        Box::new(FantasyCalendarAdapter::new(options.clone())),
    ]
}

/// The first format whose adapter recognizes `raw`.
pub fn detect_format(raw: &Value, options: &ImportOptions) -> Option<SourceFormat> {
    adapters(options)
        .into_iter()
        .find(|a| a.detect(raw))
        .map(|a| a.format())
}

/// Detect, transform and extract in one go.
///
/// # Errors
/// Returns [`ImportError::UnrecognizedFormat`] when no adapter accepts the
/// input, or the structural error of the adapter that did.
#[tracing::instrument(skip_all)]
pub fn import(raw: &Value, options: &ImportOptions) -> Result<ImportOutcome> {
    let adapter = adapters(options)
        .into_iter()
        .find(|a| a.detect(raw))
        .ok_or_else(|| ImportError::UnrecognizedFormat(describe_shape(raw)))?;
    let format = adapter.format();
    tracing::debug!(%format, "detected source format");

    let Transformed {
        calendar,
        mut warnings,
    } = adapter.transform(raw)?;
    let extraction = adapter.extract_events(raw, &calendar);
    warnings.extend(extraction.warnings);

    tracing::debug!(
        events = extraction.drafts.len(),
        undatable = extraction.undatable.len(),
        warnings = warnings.len(),
        "import finished"
    );

    Ok(ImportOutcome {
        format,
        suggested_id: suggested_id(
            &calendar.name,
            options.suggested_id_max_len,
            options.suggested_id_separator,
        ),
        calendar,
        events: extraction.drafts,
        undatable: extraction.undatable,
        warnings,
        provenance: Provenance {
            source_format: format,
            imported_at: Utc::now(),
        },
    })
}

/// Parse a JSON string and [`import`] it.
///
/// # Errors
/// Returns [`ImportError::JsonParse`] for malformed JSON, otherwise as [`import`].
pub fn import_str(json: &str, options: &ImportOptions) -> Result<ImportOutcome> {
    let raw: Value = serde_json::from_str(json)?;
    import(&raw, options)
}

fn describe_shape(raw: &Value) -> String {
    match raw {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().take(6).map(String::as_str).collect();
            format!("object with keys [{}] matches no known export", keys.join(", "))
        }
        Value::Array(_) => "top-level array matches no known export".to_string(),
        _ => "input is not a JSON object".to_string(),
    }
}

/// Collects lossy-conversion warnings, mirroring each to the log.
#[derive(Debug, Default)]
pub(crate) struct Warnings(Vec<String>);

impl Warnings {
    pub(crate) fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "lossy conversion");
        self.0.push(message);
    }

    pub(crate) fn into_vec(self) -> Vec<String> {
        self.0
    }
}
