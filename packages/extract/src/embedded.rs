//! Grade data embedded in the page as a JavaScript assignment.
//!
//! Some portals render the grades table client-side from a literal such as
//! `var notas = [{"codigo": "MAT-1001", ...}];`. When such a payload is
//! present it is more reliable than the rendered table.

use std::sync::LazyLock;

use notas_grades_models::RawRow;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::rows::{RowFields, RowRules, build_row};

/// Start of a data assignment, up to and including the `=`.
static ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:var|let|const)\s+(?:data|notas|__data__)\s*=\s*").expect("valid regex")
});

/// Finds the first embedded JSON object or array in script text.
///
/// The payload is read with a streaming deserializer starting right after
/// the `=`, so nested objects and a missing trailing `;` are handled.
/// Payloads that are not valid JSON are skipped.
#[must_use]
pub fn find_embedded_json_in_text(text: &str) -> Option<Value> {
    ASSIGNMENT_RE.find_iter(text).find_map(|assignment| {
        let rest = &text[assignment.end()..];
        if !rest.starts_with(['{', '[']) {
            return None;
        }
        let value = serde_json::Deserializer::from_str(rest)
            .into_iter::<Value>()
            .next()?
            .ok()?;
        (value.is_object() || value.is_array()).then_some(value)
    })
}

/// Finds the first embedded JSON payload in any `<script>` of a document.
#[must_use]
pub fn find_embedded_json(document: &Html) -> Option<Value> {
    let script_sel = Selector::parse("script").unwrap_or_else(|_| unreachable!());
    document
        .select(&script_sel)
        .find_map(|script| find_embedded_json_in_text(&script.text().collect::<String>()))
}

/// Renders a scalar JSON value as cell text. Other values read as empty.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Returns the text of the first alias key holding a non-empty scalar.
fn text_field(entry: &Value, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| entry.get(key).map(scalar_text).unwrap_or_default())
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

/// Returns the elements of the first alias key holding an array.
fn series_field(entry: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|key| entry.get(key).and_then(Value::as_array))
        .map(|values| values.iter().map(scalar_text).collect())
        .unwrap_or_default()
}

/// Reads one embedded entry into row fields.
#[must_use]
pub fn fields_from_entry(entry: &Value) -> RowFields {
    RowFields {
        code: text_field(entry, &["codigo", "cod", "code"]),
        name: text_field(entry, &["nombre", "asignatura", "name"]),
        section: text_field(entry, &["seccion", "section"]),
        attendance: text_field(entry, &["asistencia", "att"]),
        partials: series_field(entry, &["certamenes", "pp"]),
        labs: series_field(entry, &["laboratorios", "lab"]),
        partial_average: text_field(entry, &["promedioCertamenes"]),
        lab_average: text_field(entry, &["promedioLaboratorio"]),
        exam: text_field(entry, &["notaExamen", "examen"]),
        exam_weighted: text_field(entry, &["examenPonderado"]),
        final_grade: text_field(entry, &["notaFinal", "final"]),
        status: text_field(entry, &["estado", "status"]),
        period: text_field(entry, &["periodo", "period"]),
        year: text_field(entry, &["anio", "year"]),
        semester: text_field(entry, &["semestre", "semester"]),
    }
}

/// Converts an embedded payload into rows.
///
/// Accepts a top-level array or an object with a `ramos` array. Entries
/// go through the same validation as table rows.
#[must_use]
pub fn rows_from_embedded(value: &Value, rules: &RowRules<'_>) -> Vec<RawRow> {
    let entries = value
        .as_array()
        .or_else(|| value.get("ramos").and_then(Value::as_array));
    let Some(entries) = entries else {
        return Vec::new();
    };

    let rows: Vec<RawRow> = entries
        .iter()
        .filter_map(|entry| build_row(&fields_from_entry(entry), rules))
        .collect();

    log::debug!(
        "Embedded payload: {} of {} entries usable",
        rows.len(),
        entries.len()
    );

    rows
}
