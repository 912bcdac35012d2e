//! Error types for fabula-engine operations.
//!
//! Only structural problems surface here. Lossy conversions are reported as
//! warning strings on the operation's result instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    /// No adapter recognized the top-level shape of the input.
    #[error("Unrecognized format: {0}")]
    UnrecognizedFormat(String),

    /// A field the adapter cannot do without is entirely absent.
    #[error("Missing required field `{field}` in {context}")]
    MissingField { field: String, context: String },

    /// A required field is present but has the wrong shape.
    #[error("Invalid field `{field}`: {message}")]
    InvalidField { field: String, message: String },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl ImportError {
    pub(crate) fn missing(field: &str, context: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
            context: context.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Error produced when a custom leap pattern string cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid leap pattern `{pattern}`: {reason}")]
pub struct LeapPatternError {
    pub pattern: String,
    pub reason: String,
}

pub type Result<T> = std::result::Result<T, ImportError>;
