//! Fixture date normalization.
//!
//! Upstream sheets carry dates in whatever shape the club volunteer
//! typed: ISO, `07/06/2025`, `Saturday 7th June 2025 - Finals Day`, or
//! nothing at all (only the first fixture of a day carries the date).
//! The outcome distinguishes *blank* from *invalid* because the two are
//! handled differently: blank may inherit the prior row's date, invalid
//! drops the row.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateOutcome {
    /// No date on the row at all.
    Blank,
    /// Normalized to `YYYY-MM-DD`.
    Normalized(String),
    /// A date was present but could not be understood.
    Invalid,
}

/// Formats attempted after ISO passthrough and cleanup, most common
/// spreadsheet shapes first.
const FORMATS: [&str; 8] = [
    "%d/%m/%Y",
    "%d/%m/%y",
    "%d-%m-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%A %d %B %Y",
    "%A, %d %B %Y",
    "%B %d %Y",
];

pub fn normalize_date(raw: &str) -> DateOutcome {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DateOutcome::Blank;
    }

    // ISO input passes through (re-rendered, so sloppy padding like
    // `2025-6-7` still lands on one canonical shape).
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return DateOutcome::Normalized(date.format("%Y-%m-%d").to_string());
    }

    // Drop trailing " - ..." annotations ("7 June 2025 - Finals Day"),
    // then ordinal suffixes ("7th" -> "7").
    let cleaned = trimmed.split(" - ").next().unwrap_or(trimmed).trim();
    let cleaned = strip_ordinals(cleaned);

    for fmt in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            // %Y happily eats two-digit years as year 25; let %y pick
            // those up instead.
            if date.year() < 1900 {
                continue;
            }
            return DateOutcome::Normalized(date.format("%Y-%m-%d").to_string());
        }
    }
    DateOutcome::Invalid
}

fn strip_ordinals(input: &str) -> String {
    static ORDINAL: OnceLock<Regex> = OnceLock::new();
    let re = ORDINAL.get_or_init(|| Regex::new(r"(?i)\b(\d+)(st|nd|rd|th)\b").unwrap());
    re.replace_all(input, "$1").into_owned()
}
