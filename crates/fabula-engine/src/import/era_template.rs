//! Rewriting source template placeholders into the canonical vocabulary.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::Warnings;

/// `{{name}}` or `{{{name}}}`, with optional inner whitespace.
static MUSTACHE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\{?\s*([A-Za-z0-9_]+)\s*\}?\}\}").expect("placeholder pattern is valid")
});

/// Translate a mustache-style era format (`{{year}}`, `{{era_name}}`, ...)
/// into canonical `{year}`, `{abbreviation}`, `{era}`, `{yearInEra}`.
///
/// Unknown placeholders are left exactly as written and reported.
pub(crate) fn translate_era_template(source: &str, era: &str, warnings: &mut Warnings) -> String {
    let mut unknown = Vec::new();
    let out = MUSTACHE.replace_all(source, |caps: &Captures<'_>| {
        let canonical = match &caps[1] {
            "year" | "abs_year" => "{year}",
            "era_year" => "{yearInEra}",
            "era_name" | "name" => "{era}",
            "abbreviation" | "era_abbreviation" => "{abbreviation}",
            other => {
                unknown.push(other.to_string());
                return caps[0].to_string();
            }
        };
        canonical.to_string()
    });
    for name in unknown {
        warnings.push(format!(
            "era `{}` uses unknown placeholder `{}`; kept verbatim",
            era, name
        ));
    }
    out.into_owned()
}

/// Translate a cycle format (`{{1}}`, `{{2}}`) into canonical `{1}`, `{2}`.
pub(crate) fn translate_cycle_template(source: &str, warnings: &mut Warnings) -> String {
    let mut unknown = Vec::new();
    let out = MUSTACHE.replace_all(source, |caps: &Captures<'_>| {
        let name = &caps[1];
        if name.chars().all(|c| c.is_ascii_digit()) {
            format!("{{{}}}", name)
        } else {
            unknown.push(name.to_string());
            caps[0].to_string()
        }
    });
    for name in unknown {
        warnings.push(format!(
            "cycle format uses unknown placeholder `{}`; kept verbatim",
            name
        ));
    }
    out.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_placeholders_translate() {
        let mut w = Warnings::default();
        let out = translate_era_template("Year {{year}} of the {{ era_name }} ({{era_year}})", "Age", &mut w);
        assert_eq!(out, "Year {year} of the {era} ({yearInEra})");
        assert!(w.into_vec().is_empty());
    }

    #[test]
    fn unknown_placeholder_passes_through_with_warning() {
        let mut w = Warnings::default();
        let out = translate_era_template("{{nth_year}} {{year}}", "Age", &mut w);
        assert_eq!(out, "{{nth_year}} {year}");
        let warnings = w.into_vec();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("nth_year"));
    }

    #[test]
    fn triple_braces_accepted() {
        let mut w = Warnings::default();
        assert_eq!(translate_era_template("{{{year}}}", "Age", &mut w), "{year}");
    }

    #[test]
    fn cycle_numbers_translate() {
        let mut w = Warnings::default();
        assert_eq!(translate_cycle_template("Year of the {{1}} and {{2}}", &mut w), "Year of the {1} and {2}");
    }
}
