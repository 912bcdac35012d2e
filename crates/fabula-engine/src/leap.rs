//! Parsed custom leap-year patterns.
//!
//! A pattern string is a comma-separated list of terms `[!][+]n`:
//!
//! - `n`: years divisible by `n` are leap years
//! - `!n`: years divisible by `n` are *not* leap years
//! - `+n`: the term is tested against the raw year, ignoring the rule's start offset
//!
//! Terms are tested from the largest modulus to the smallest and the first term
//! that divides the year decides. `"400,!100,4"` is therefore the Gregorian rule.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LeapPatternError;

/// One `(modulus, exclusive)` term of a custom leap pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeapTerm {
    pub modulus: u32,
    pub exclusive: bool,
    /// Test against the raw year instead of `year - start`.
    pub ignore_offset: bool,
}

/// A custom leap pattern, parsed once at construction.
///
/// Serialized as its canonical string form (e.g. `"400,!100,4"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LeapPattern {
    /// Terms in evaluation order (largest modulus first).
    terms: Vec<LeapTerm>,
}

impl LeapPattern {
    /// Parse a pattern string such as `"400,!100,4"`.
    ///
    /// # Errors
    /// Returns [`LeapPatternError`] when the pattern is empty, a term is not an
    /// unsigned integer, or a modulus is zero.
    pub fn parse(pattern: &str) -> Result<Self, LeapPatternError> {
        let fail = |reason: String| LeapPatternError {
            pattern: pattern.to_string(),
            reason,
        };

        let mut terms = Vec::new();
        for raw in pattern.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let mut rest = raw;
            let mut exclusive = false;
            let mut ignore_offset = false;
            // Flags may appear in either order: "!+4" and "+!4" are the same term.
            loop {
                if let Some(r) = rest.strip_prefix('!') {
                    exclusive = true;
                    rest = r;
                } else if let Some(r) = rest.strip_prefix('+') {
                    ignore_offset = true;
                    rest = r;
                } else {
                    break;
                }
            }

            let modulus: u32 = rest
                .trim()
                .parse()
                .map_err(|_| fail(format!("term `{}` is not a positive integer", raw)))?;
            if modulus == 0 {
                return Err(fail(format!("term `{}` has a zero modulus", raw)));
            }
            terms.push(LeapTerm {
                modulus,
                exclusive,
                ignore_offset,
            });
        }

        if terms.is_empty() {
            return Err(fail("pattern has no terms".to_string()));
        }

        // Stable sort keeps author order among equal moduli.
        terms.sort_by(|a, b| b.modulus.cmp(&a.modulus));
        Ok(Self { terms })
    }

    /// The gregorian rule expressed as a pattern.
    pub fn gregorian() -> Self {
        let term = |modulus, exclusive| LeapTerm {
            modulus,
            exclusive,
            ignore_offset: false,
        };
        Self {
            terms: vec![term(400, false), term(100, true), term(4, false)],
        }
    }

    pub fn terms(&self) -> &[LeapTerm] {
        &self.terms
    }

    /// Whether at least one term can make a year leap.
    pub fn has_inclusive_term(&self) -> bool {
        self.terms.iter().any(|t| !t.exclusive)
    }

    /// Whether the pattern is a single plain inclusive term, i.e. a fixed interval.
    pub fn as_simple_interval(&self) -> Option<u32> {
        match self.terms.as_slice() {
            [t] if !t.exclusive && !t.ignore_offset => Some(t.modulus),
            _ => None,
        }
    }

    /// Evaluate the pattern for `year` with the rule's `start` offset.
    pub fn is_leap(&self, year: i64, start: i64) -> bool {
        for term in &self.terms {
            let y = if term.ignore_offset {
                year
            } else {
                year.saturating_sub(start)
            };
            if y.rem_euclid(i64::from(term.modulus)) == 0 {
                return !term.exclusive;
            }
        }
        false
    }
}

impl fmt::Display for LeapPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .terms
            .iter()
            .map(|t| {
                format!(
                    "{}{}{}",
                    if t.exclusive { "!" } else { "" },
                    if t.ignore_offset { "+" } else { "" },
                    t.modulus
                )
            })
            .collect();
        f.write_str(&parts.join(","))
    }
}

impl TryFrom<String> for LeapPattern {
    type Error = LeapPatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LeapPattern> for String {
    fn from(value: LeapPattern) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_sorted_by_descending_modulus() {
        let p = LeapPattern::parse("4, !100, 400").unwrap();
        let moduli: Vec<u32> = p.terms().iter().map(|t| t.modulus).collect();
        assert_eq!(moduli, vec![400, 100, 4]);
        assert_eq!(p.to_string(), "400,!100,4");
    }

    #[test]
    fn flags_in_either_order() {
        let a = LeapPattern::parse("!+7").unwrap();
        let b = LeapPattern::parse("+!7").unwrap();
        assert_eq!(a, b);
        assert!(a.terms()[0].exclusive && a.terms()[0].ignore_offset);
    }

    #[test]
    fn rejects_garbage() {
        assert!(LeapPattern::parse("").is_err());
        assert!(LeapPattern::parse("four").is_err());
        assert!(LeapPattern::parse("4,0").is_err());
        assert!(LeapPattern::parse("-4").is_err());
    }

    #[test]
    fn ignore_offset_uses_raw_year() {
        let p = LeapPattern::parse("+5").unwrap();
        assert!(p.is_leap(10, 3));
        assert!(!p.is_leap(13, 3));
    }

    #[test]
    fn simple_interval_detection() {
        assert_eq!(LeapPattern::parse("4").unwrap().as_simple_interval(), Some(4));
        assert_eq!(LeapPattern::parse("400,!100,4").unwrap().as_simple_interval(), None);
    }
}
