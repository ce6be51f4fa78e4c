//! Field extraction: recognised text → contact fields.
//!
//! Each field has its own pure function of `(text) -> Option<String>` so it
//! can be tested and replaced on its own. The heuristics are deliberately
//! shallow pattern matches. They return the *first* candidate and perform no
//! validation that a "name" is a person's name or an "age" is really an age.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());

/// Optional `+`, a digit, 7+ digits/blanks/hyphens, a closing digit.
///
/// Separators are horizontal only: a number never continues onto the next
/// line of OCR output.
static RE_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d[\d \t-]{7,}\d").unwrap());

static RE_AGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[1-9][0-9]?\b").unwrap());

/// Lines at or below this many characters are never a name.
const MIN_NAME_CHARS: usize = 3;

/// First line longer than three characters after trimming.
pub fn extract_name(text: &str) -> Option<String> {
    text.split('\n')
        .map(str::trim)
        .find(|line| line.chars().count() > MIN_NAME_CHARS)
        .map(str::to_string)
}

/// First `local@domain.tld` shaped substring.
pub fn extract_email(text: &str) -> Option<String> {
    RE_EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// First run of nine or more phone-like characters.
pub fn extract_phone(text: &str) -> Option<String> {
    RE_PHONE.find(text).map(|m| m.as_str().to_string())
}

/// First standalone 1–99 integer, skipping international dialling codes.
///
/// A token written directly after `+` (the `44` in `+44 7911 123456`) is a
/// country code, never an age. Otherwise context-blind: a house number, a
/// day of the month or the leading group of a local phone number ahead of
/// the real age wins.
pub fn extract_age(text: &str) -> Option<String> {
    RE_AGE
        .find_iter(text)
        .find(|m| !text[..m.start()].ends_with('+'))
        .map(|m| m.as_str().to_string())
}
