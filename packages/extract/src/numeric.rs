//! Locale-tolerant grade parsing.
//!
//! Grade cells use either `,` or `.` as the decimal separator and often
//! carry trailing decoration (`"85%"`, `"5,0 (R)"`). Empty or non-numeric
//! cells come back as `None`, never as `0.0`.

use std::sync::LazyLock;

use regex::Regex;

/// Leading decimal number, ignoring whatever follows it.
static LEADING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)").expect("valid regex"));

/// Parses a grade cell into a number rounded to one decimal.
///
/// Returns `None` when the cell is empty or does not start with a number.
#[must_use]
pub fn to_grade(text: &str) -> Option<f64> {
    let dotted = text.replacen(',', ".", 1);
    let number = LEADING_NUMBER_RE.find(dotted.trim())?;
    let value: f64 = number.as_str().parse().ok()?;
    value.is_finite().then(|| round1(value))
}

/// Parses an attendance cell, ignoring any `%` sign.
#[must_use]
pub fn to_percent(text: &str) -> Option<f64> {
    to_grade(&text.replace('%', ""))
}

/// Rounds to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Arithmetic mean, or `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
