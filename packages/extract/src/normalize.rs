//! Text normalization for header and keyword comparison.
//!
//! Applied symmetrically to page text and to the built-in vocabularies, so
//! `"Código del Ramo"`, `"CODIGO  DEL RAMO"` and `"codigo<!-- x --> del ramo"`
//! all compare equal.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Matches an HTML comment, including ones spanning several lines.
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

/// Canonicalizes text for comparison.
///
/// The pipeline:
/// 1. Strip HTML comments
/// 2. Unicode canonical decomposition (NFD), dropping combining marks
/// 3. Collapse whitespace runs to a single space and trim
/// 4. Lowercase
#[must_use]
pub fn normalize(text: &str) -> String {
    let without_comments = COMMENT_RE.replace_all(text, "");
    let stripped: String = without_comments
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    collapse_whitespace(&stripped).to_lowercase()
}

/// Collapses whitespace runs (including non-breaking spaces) to a single
/// space and trims. Case and accents are kept, so this is what display
/// values such as course names go through.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns `true` if `haystack` contains any of the `needles`.
pub(crate) fn contains_any<S: AsRef<str>>(haystack: &str, needles: &[S]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_ref()))
}

/// Returns `true` if any alphanumeric token of `haystack` starts with one
/// of the `keywords`.
pub(crate) fn has_token_prefix(haystack: &str, keywords: &[&str]) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .any(|token| keywords.iter().any(|k| token.starts_with(k)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_lowercases() {
        assert_eq!(normalize("Código del Ramo"), "codigo del ramo");
        assert_eq!(normalize("AÑO"), "ano");
        assert_eq!(normalize("Sección"), "seccion");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("  Nota \t\n Final  "), "nota final");
        assert_eq!(normalize("Nota\u{a0}Final"), "nota final");
    }

    #[test]
    fn removes_html_comments() {
        assert_eq!(normalize("Examen<!-- oculto -->"), "examen");
        assert_eq!(normalize("Nota <!--\nvieja\n--> Final"), "nota final");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn collapse_keeps_case_and_accents() {
        assert_eq!(collapse_whitespace("  Cálculo   I "), "Cálculo I");
    }

    #[test]
    fn token_prefix_matching() {
        assert!(has_token_prefix("codigo del ramo", &["cod"]));
        assert!(has_token_prefix("nota (final)", &["final"]));
        assert!(!has_token_prefix("decodificar", &["cod"]));
    }
}
