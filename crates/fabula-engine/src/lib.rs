//! # fabula-engine
//!
//! Arithmetic over user-defined fictional calendars, plus import
//! normalization from third-party calendar exports.
//!
//! A [`CalendarModel`] describes months, weekdays, leap rules, seasons, eras,
//! moons and naming cycles. Every date computation in this crate is a pure
//! function of that model; nothing reads the host clock except the
//! [`import::Provenance`] timestamp attached to an import.
//!
//! ## Modules
//!
//! - [`model`]: the canonical calendar types
//! - [`arithmetic`]: year lengths, day-of-year conversion, seasons, eras, moons
//! - [`leap`]: custom leap patterns such as `"400,!100,4"`
//! - [`validate`]: structural checks with graded severity
//! - [`recurrence`]: condition trees and the recurrence classifier
//! - [`import`]: format detection and the per-format adapters
//! - [`canonical`]: loading canonical calendar JSON
//! - [`event`]: event drafts and undatable records
//! - [`error`]: Error types

pub mod arithmetic;
pub mod canonical;
pub mod error;
pub mod event;
pub mod ident;
pub mod import;
pub mod leap;
pub mod model;
pub mod recurrence;
pub mod validate;

pub use arithmetic::{
    add_days, day_of_year_to_month_day, days_between, days_per_year, era_label, is_leap_year,
    moon_phase, month_day_to_day_of_year, season_at, weekday_of,
};
pub use canonical::load_canonical;
pub use error::{ImportError, LeapPatternError};
pub use event::{EventDraft, Recurrence, UndatableRecord};
pub use ident::suggested_id;
pub use import::{detect_format, import, import_str, ImportOptions, ImportOutcome, SourceFormat};
pub use leap::LeapPattern;
pub use model::{CalendarDate, CalendarModel};
pub use validate::{validate, Severity, Violation};
