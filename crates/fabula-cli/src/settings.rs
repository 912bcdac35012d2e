use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use fabula_engine::ImportOptions;
use serde::Deserialize;

/// Options read from the optional config file and `FABULA_*` variables.
///
/// Keys are flat and snake_case (`calendar_id`, `FABULA_CALENDAR_ID`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: String,
    pub calendar_id: Option<String>,
    pub suggested_id_max_len: usize,
    pub suggested_id_separator: char,
    pub synthesized_phase_count: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let import = ImportOptions::default();
        Self {
            log_level: "warn".to_string(),
            calendar_id: import.calendar_id,
            suggested_id_max_len: import.suggested_id_max_len,
            suggested_id_separator: import.suggested_id_separator,
            synthesized_phase_count: import.synthesized_phase_count,
        }
    }
}

impl Settings {
    /// ## Errors
    /// Returns an error if the config file cannot be read or a value has the
    /// wrong type.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder
            .add_source(Environment::with_prefix("FABULA").try_parsing(true))
            .build()
            .and_then(Config::try_deserialize)
            .context("Failed to load settings")
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            calendar_id: self.calendar_id.clone(),
            suggested_id_max_len: self.suggested_id_max_len,
            suggested_id_separator: self.suggested_id_separator,
            synthesized_phase_count: self.synthesized_phase_count,
        }
    }
}
