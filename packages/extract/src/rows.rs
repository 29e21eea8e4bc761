//! Row extraction and noise-row rejection.
//!
//! Table cells and embedded JSON entries are both first read into
//! [`RowFields`] (plain strings), then [`build_row`] coerces the numbers
//! and applies the validation rules. A row is kept only when its code
//! matches the course-code pattern and its name is not a known header or
//! summary phrase.

use notas_grades_models::{DEFAULT_SECTION, RawRow};
use regex::Regex;
use scraper::ElementRef;

use crate::columns::{ColumnMap, Field, MAX_SERIES_LEN};
use crate::normalize::{collapse_whitespace, normalize};
use crate::numeric::{round1, to_grade, to_percent};
use crate::period::{resolve_semester, resolve_year};
use crate::table::row_cells;

/// Normalized names that mark a row as a repeated header or a summary
/// banner rather than a course.
const NOISE_NAMES: &[&str] = &[
    "nombre",
    "nombre del ramo",
    "nombre ramo",
    "nombre asignatura",
    "nombre de la asignatura",
    "asignatura",
    "ramo",
    "curso",
    "course",
    "subject",
    "total",
    "totales",
    "promedio",
    "promedio general",
    "promedio semestral",
    "promedio ponderado",
    "resumen",
];

/// Settings shared by every row of one extraction run.
#[derive(Debug, Clone, Copy)]
pub struct RowRules<'a> {
    /// Institution course-code pattern, applied to the canonical code.
    pub code_pattern: &'a Regex,
    /// Exam weight used to recover a raw exam score from a weighted one.
    pub exam_weight: Option<f64>,
    /// Year used when a row has no detectable year.
    pub fallback_year: Option<i32>,
}

/// Raw string values of one row, keyed by meaning instead of position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFields {
    pub code: String,
    pub name: String,
    pub section: String,
    pub attendance: String,
    pub partials: Vec<String>,
    pub labs: Vec<String>,
    pub partial_average: String,
    pub lab_average: String,
    pub exam: String,
    pub exam_weighted: String,
    pub final_grade: String,
    pub status: String,
    pub period: String,
    pub year: String,
    pub semester: String,
}

impl RowFields {
    /// Reads a row's cells through a column map. Unmapped or out-of-range
    /// columns read as empty strings.
    #[must_use]
    pub fn from_cells<S: AsRef<str>>(cells: &[S], columns: &ColumnMap) -> Self {
        let at = |index: usize| {
            cells
                .get(index)
                .map_or_else(String::new, |c| c.as_ref().trim().to_string())
        };
        let field = |field: Field| columns.index(field).map_or_else(String::new, at);

        Self {
            code: field(Field::Code),
            name: field(Field::Name),
            section: field(Field::Section),
            attendance: field(Field::Attendance),
            partials: columns.partials.iter().map(|&i| at(i)).collect(),
            labs: columns.labs.iter().map(|&i| at(i)).collect(),
            partial_average: field(Field::PartialAverage),
            lab_average: field(Field::LabAverage),
            exam: field(Field::Exam),
            exam_weighted: field(Field::ExamWeighted),
            final_grade: field(Field::Final),
            status: field(Field::Status),
            period: field(Field::Period),
            year: field(Field::Year),
            semester: field(Field::Semester),
        }
    }
}

/// Canonical form of a course code: no whitespace, uppercase, dash-like
/// characters folded to `-`.
#[must_use]
pub fn canonical_code(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '\u{2010}'..='\u{2015}' | '\u{2212}' | '_' => '-',
            other => other,
        })
        .flat_map(char::to_uppercase)
        .collect()
}

/// Returns `true` if a course name is a known header or summary phrase.
#[must_use]
pub fn is_noise_name(name: &str) -> bool {
    let normalized = normalize(name);
    NOISE_NAMES.contains(&normalized.as_str())
}

/// Coerces and validates one row. Returns `None` for noise rows.
#[must_use]
pub fn build_row(fields: &RowFields, rules: &RowRules<'_>) -> Option<RawRow> {
    let code = canonical_code(&fields.code);
    let name = collapse_whitespace(&fields.name);
    if code.is_empty() || name.is_empty() {
        return None;
    }
    if !rules.code_pattern.is_match(&code) || is_noise_name(&name) {
        return None;
    }

    let section = collapse_whitespace(&fields.section);
    let exam_score = to_grade(&fields.exam).or_else(|| {
        let weight = rules.exam_weight?;
        to_grade(&fields.exam_weighted).map(|weighted| round1(weighted / weight))
    });
    let status = collapse_whitespace(&fields.status);

    Some(RawRow {
        code,
        name,
        section: if section.is_empty() {
            DEFAULT_SECTION.to_string()
        } else {
            section
        },
        attendance_percent: to_percent(&fields.attendance),
        partial_scores: grade_series(&fields.partials),
        lab_scores: grade_series(&fields.labs),
        exam_score,
        reported_partial_average: to_grade(&fields.partial_average),
        reported_lab_average: to_grade(&fields.lab_average),
        reported_final: to_grade(&fields.final_grade),
        reported_status: (!status.is_empty()).then_some(status),
        period_year: resolve_year(&fields.period, &fields.year, rules.fallback_year),
        period_semester: resolve_semester(&fields.period, &fields.semester),
    })
}

/// Parses a score series, keeping at most [`MAX_SERIES_LEN`] grades.
fn grade_series(cells: &[String]) -> Vec<f64> {
    cells
        .iter()
        .filter_map(|s| to_grade(s))
        .take(MAX_SERIES_LEN)
        .collect()
}

/// Extracts one table row. Returns `None` for noise rows.
#[must_use]
pub fn extract_row(
    row: ElementRef<'_>,
    columns: &ColumnMap,
    rules: &RowRules<'_>,
) -> Option<RawRow> {
    let cells = row_cells(row);
    if cells.iter().all(String::is_empty) {
        return None;
    }
    build_row(&RowFields::from_cells(&cells, columns), rules)
}

/// Extracts every valid row, in table order.
#[must_use]
pub fn extract_rows(
    rows: &[ElementRef<'_>],
    columns: &ColumnMap,
    rules: &RowRules<'_>,
) -> Vec<RawRow> {
    let extracted: Vec<RawRow> = rows
        .iter()
        .filter_map(|row| extract_row(*row, columns, rules))
        .collect();

    log::debug!(
        "Extracted {} of {} table rows ({} skipped as noise)",
        extracted.len(),
        rows.len(),
        rows.len() - extracted.len()
    );

    extracted
}
