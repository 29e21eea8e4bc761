//! Academic period parsing.
//!
//! Period cells come in many shapes: `"2024-1"`, `"2024/II"`, `"1-2024"`,
//! `"Primer Semestre 2024"`, or split across separate year and semester
//! columns.

use std::sync::LazyLock;

use notas_grades_models::Semester;
use regex::Regex;

use crate::normalize::normalize;

/// A four-digit year not embedded in a longer digit run.
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)((?:19|20)\d{2})(?:\D|$)").expect("valid regex"));

/// `2024-1`, `2024/ii`, `2024.2`
static YEAR_THEN_SEMESTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:19|20)\d{2}\s*[-/._]\s*(1|2|ii|i)\b").expect("valid regex")
});

/// `1-2024`, `ii/2024`
static SEMESTER_THEN_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(1|2|ii|i)\s*[-/]\s*(?:19|20)\d{2}").expect("valid regex")
});

/// `semestre 2`, `sem. i`
static LABELLED_SEMESTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bsem(?:estre)?\.?\s*(1|2|ii|i)\b").expect("valid regex")
});

static FIRST_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:primer|primero|1er|1ro)\b").expect("valid regex"));

static SECOND_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:segundo|2do)\b").expect("valid regex"));

static BARE_SEMESTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(1|2|ii|i)$").expect("valid regex"));

/// Extracts the first plausible year (1900-2099) from text.
#[must_use]
pub fn parse_year(text: &str) -> Option<i32> {
    YEAR_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extracts a semester from a period or semester cell.
#[must_use]
pub fn parse_semester(text: &str) -> Option<Semester> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return None;
    }

    for re in [
        &*YEAR_THEN_SEMESTER_RE,
        &*SEMESTER_THEN_YEAR_RE,
        &*LABELLED_SEMESTER_RE,
        &*BARE_SEMESTER_RE,
    ] {
        if let Some(caps) = re.captures(&normalized) {
            return semester_token(&caps[1]);
        }
    }

    if FIRST_WORD_RE.is_match(&normalized) {
        return Some(Semester::First);
    }
    if SECOND_WORD_RE.is_match(&normalized) {
        return Some(Semester::Second);
    }
    None
}

fn semester_token(token: &str) -> Option<Semester> {
    match token {
        "1" | "i" => Some(Semester::First),
        "2" | "ii" => Some(Semester::Second),
        _ => None,
    }
}

/// Resolves a row's year: period cell first, then the year cell, then the
/// caller's fallback, then `0`.
#[must_use]
pub fn resolve_year(period: &str, year: &str, fallback: Option<i32>) -> i32 {
    parse_year(period)
        .or_else(|| parse_year(year))
        .or_else(|| year.trim().parse().ok())
        .or(fallback)
        .unwrap_or(0)
}

/// Resolves a row's semester: period cell first, then the semester cell,
/// defaulting to the first semester.
#[must_use]
pub fn resolve_semester(period: &str, semester: &str) -> Semester {
    parse_semester(period)
        .or_else(|| parse_semester(semester))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_year() {
        assert_eq!(parse_year("2024-1"), Some(2024));
        assert_eq!(parse_year("Primer Semestre 2023"), Some(2023));
        assert_eq!(parse_year("sin periodo"), None);
        assert_eq!(parse_year("120245"), None);
    }

    #[test]
    fn parses_year_then_semester() {
        assert_eq!(parse_semester("2024-1"), Some(Semester::First));
        assert_eq!(parse_semester("2024/2"), Some(Semester::Second));
        assert_eq!(parse_semester("2024-II"), Some(Semester::Second));
        assert_eq!(parse_semester("2024 - I"), Some(Semester::First));
    }

    #[test]
    fn parses_semester_then_year() {
        assert_eq!(parse_semester("2-2023"), Some(Semester::Second));
        assert_eq!(parse_semester("I/2023"), Some(Semester::First));
    }

    #[test]
    fn parses_semester_words() {
        assert_eq!(
            parse_semester("Segundo Semestre 2024"),
            Some(Semester::Second)
        );
        assert_eq!(parse_semester("1er sem 2024"), Some(Semester::First));
        assert_eq!(parse_semester("Semestre 2"), Some(Semester::Second));
    }

    #[test]
    fn parses_bare_semester_cells() {
        assert_eq!(parse_semester("2"), Some(Semester::Second));
        assert_eq!(parse_semester(" I "), Some(Semester::First));
        assert_eq!(parse_semester(""), None);
        assert_eq!(parse_semester("2024"), None);
    }

    #[test]
    fn resolves_year_with_fallbacks() {
        assert_eq!(resolve_year("2024-2", "", None), 2024);
        assert_eq!(resolve_year("", "2022", None), 2022);
        assert_eq!(resolve_year("", "", Some(2025)), 2025);
        assert_eq!(resolve_year("", "", None), 0);
    }

    #[test]
    fn resolves_semester_with_default() {
        assert_eq!(resolve_semester("2024-2", ""), Semester::Second);
        assert_eq!(resolve_semester("", "2"), Semester::Second);
        assert_eq!(resolve_semester("", ""), Semester::First);
    }
}
