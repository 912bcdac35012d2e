//! `fabula` CLI: import, validate and query fictional calendars.
//!
//! ## Usage
//!
//! ```sh
//! # Which export format is this?
//! fabula detect -i export.json
//!
//! # Convert an export into a canonical calendar with event drafts
//! fabula import -i export.json -o outcome.json
//!
//! # Pick one calendar out of a multi-calendar Simple Calendar export
//! fabula import -i export.json --calendar-id abc123
//!
//! # Check a canonical calendar for structural problems
//! fabula validate -i calendar.json
//!
//! # Month, season, era and moon phases for day 100 of year 1492
//! fabula date -i calendar.json --year 1492 --day-of-year 100
//! ```
//!
//! Settings may also come from a config file (`--config`) and `FABULA_*`
//! environment variables. Logs go to stderr, filtered by `RUST_LOG`.

mod settings;

use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fabula_engine::arithmetic::{cycle_text, era_label, moon_phase, season_at, weekday_of};
use fabula_engine::model::CalendarDate;
use fabula_engine::validate::has_errors;
use fabula_engine::{day_of_year_to_month_day, CalendarModel};
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "fabula",
    version,
    about = "Import and inspect fictional calendars"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML, JSON or YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the detected export format
    Detect {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Convert an export into a canonical calendar and event drafts
    Import {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Calendar to import from a multi-calendar export
        #[arg(long)]
        calendar_id: Option<String>,
    },
    /// Check a canonical calendar for structural problems
    Validate {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Describe one date of a canonical calendar
    Date {
        /// Canonical calendar file
        #[arg(short, long)]
        input: String,
        #[arg(long, allow_hyphen_values = true)]
        year: i64,
        /// 0-based day of the year; out-of-range values wrap
        #[arg(long, allow_hyphen_values = true)]
        day_of_year: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("warn"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Detect { input } => {
            let raw = read_json(input.as_deref())?;
            match fabula_engine::detect_format(&raw, &settings.import_options()) {
                Some(format) => println!("{}", format),
                None => {
                    eprintln!("unrecognized format");
                    process::exit(1);
                }
            }
        }
        Commands::Import {
            input,
            output,
            calendar_id,
        } => {
            let raw = read_json(input.as_deref())?;
            let mut options = settings.import_options();
            if calendar_id.is_some() {
                options.calendar_id = calendar_id;
            }
            let outcome = fabula_engine::import(&raw, &options).context("Import failed")?;
            tracing::debug!(warnings = outcome.warnings.len(), "import complete");
            let pretty = serde_json::to_string_pretty(&outcome)?;
            write_output(output.as_deref(), &pretty)?;
        }
        Commands::Validate { input } => {
            let calendar = read_calendar(input.as_deref())?;
            let violations = fabula_engine::validate(&calendar);
            for violation in &violations {
                println!("{}", violation);
            }
            if violations.is_empty() {
                println!("ok");
            }
            if has_errors(&violations) {
                process::exit(1);
            }
        }
        Commands::Date {
            input,
            year,
            day_of_year,
        } => {
            let calendar = read_calendar(Some(&input))?;
            print!("{}", describe_date(&calendar, year, day_of_year));
        }
    }

    Ok(())
}

fn describe_date(calendar: &CalendarModel, year: i64, day_of_year: i64) -> String {
    let (month, day) = day_of_year_to_month_day(calendar, day_of_year);
    let date = CalendarDate::new(year, month.saturating_sub(1), day);
    let mut out = String::new();

    let month_name = calendar
        .month_by_ordinal(month)
        .map(|m| m.name.as_str())
        .unwrap_or("?");
    out.push_str(&format!("date: {} {}, {}\n", day, month_name, era_label(calendar, year)));

    if let Some(weekday) = weekday_of(calendar, &date).and_then(|i| calendar.weekdays.get(i)) {
        out.push_str(&format!("weekday: {}\n", weekday.name));
    }
    match season_at(calendar, day_of_year) {
        Some(season) => out.push_str(&format!("season: {}\n", season.name)),
        None => out.push_str("season: none\n"),
    }
    for moon in &calendar.moons {
        let phase = moon_phase(calendar, moon, &date)
            .map(|p| p.name.as_str())
            .unwrap_or("unknown");
        out.push_str(&format!("moon {}: {}\n", moon.name, phase));
    }
    if let Some(text) = cycle_text(calendar, &date) {
        out.push_str(&format!("cycle: {}\n", text));
    }
    out
}

fn read_calendar(path: Option<&str>) -> Result<CalendarModel> {
    let json = read_input(path)?;
    let (calendar, warnings) =
        fabula_engine::load_canonical(&json).context("Failed to load calendar")?;
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(calendar)
}

fn read_json(path: Option<&str>) -> Result<serde_json::Value> {
    let text = read_input(path)?;
    serde_json::from_str(&text).context("Input is not valid JSON")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
