//! Cell-level cleaning helpers shared by the normalizer, the financial
//! scrub, and the metric splitter. All functions are pure: null handling
//! and audit recording stay with the callers.

use chrono::format::{parse, Parsed, StrftimeItems};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::common::constants::{FALSE_WORDS, NULL_SPELLINGS, TRUE_WORDS};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LEADING_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-\s*").unwrap());
static INNER_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-\s*").unwrap());
static NUMERIC_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d.]").unwrap());
static TEXT_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d.()]").unwrap());
static ALPHA_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").unwrap());

/// Strip whitespace and embedded line breaks from a spreadsheet header.
pub fn cleanse_column_name(raw: &str) -> String {
    raw.trim().replace(['\n', '\r'], "")
}

/// True for cells that spell out "nothing": blank, whitespace-only, or one
/// of the recognized null markers.
pub fn is_null_spelling(raw: &str) -> bool {
    NULL_SPELLINGS.contains(&raw.trim())
}

/// Standard text cleaning: trim, collapse every internal whitespace run
/// (including newlines) to a single space.
pub fn clean_text(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}

/// Dash-separated list fields as they come out of Excel: drop the leading
/// dash, turn the separators into commas.
pub fn clean_dash_text(raw: &str) -> String {
    let text = clean_text(raw);
    let text = LEADING_DASH.replace(&text, "");
    let text = INNER_DASH.replace_all(&text, ", ");
    text.trim().to_string()
}

/// Phone numbers keep digits only.
pub fn clean_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parse a messy money cell. Accounting parentheses and a leading minus
/// both mean negative; currency symbols and thousands separators are
/// noise. Returns `None` when nothing numeric is left.
pub fn clean_numeric(raw: &str) -> Option<f64> {
    let mut value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let mut negative = false;
    if value.starts_with('(') && value.ends_with(')') {
        negative = true;
        value = value[1..value.len() - 1].trim();
    }
    if let Some(rest) = value.strip_prefix('-') {
        negative = true;
        value = rest;
    }

    let digits = NUMERIC_NOISE.replace_all(value, "");
    if digits.is_empty() {
        return None;
    }
    let parsed: f64 = digits.parse().ok()?;
    Some(if negative { -parsed } else { parsed })
}

/// Pull the alphabetic remainder out of a mixed cell like `1,200 LTM CAD`.
pub fn extract_text_content(raw: &str) -> String {
    let stripped = TEXT_NOISE.replace_all(raw, "");
    let words: Vec<&str> = ALPHA_RUN.find_iter(&stripped).map(|m| m.as_str()).collect();
    words.join(" ")
}

/// Canadian-dollar markers the deal team actually types.
pub fn is_cad_currency(raw: &str) -> bool {
    let lowered = raw.to_lowercase();
    lowered.contains("cad") || lowered.contains("c$")
}

/// Fixed boolean vocabulary, case-insensitive.
pub fn parse_bool(raw: &str) -> Option<bool> {
    let lowered = raw.trim().to_lowercase();
    if TRUE_WORDS.contains(&lowered.as_str()) {
        Some(true)
    } else if FALSE_WORDS.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Try each format in order; first match wins.
pub fn parse_date<S: AsRef<str>>(raw: &str, formats: &[S]) -> Option<NaiveDate> {
    let text = raw.trim();
    formats
        .iter()
        .find_map(|format| parse_date_with(text, format.as_ref()))
}

/// Parse one date format, tolerating day-less month-year styles like
/// `Jan-24` by pinning them to the first of the month.
pub fn parse_date_with(text: &str, format: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, format) {
        return Some(date);
    }
    let mut parsed = Parsed::new();
    parse(&mut parsed, text, StrftimeItems::new(format)).ok()?;
    parsed.set_day(1).ok()?;
    parsed.to_naive_date().ok()
}
