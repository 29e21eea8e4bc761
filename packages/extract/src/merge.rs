//! Folding raw rows into per-course aggregates.
//!
//! Some institutions list a course twice: once for the lecture section and
//! once for the lab section. Rows are grouped by course code and each row
//! is folded into its course according to whether it is a lab row.

use std::collections::BTreeMap;

use notas_grades_models::{CourseAggregate, RawRow, Semester};

use crate::normalize::{contains_any, normalize};

/// Returns `true` if the row's section or name mentions a lab keyword.
///
/// `keywords` must already be normalized.
#[must_use]
pub fn is_lab_row<S: AsRef<str>>(row: &RawRow, keywords: &[S]) -> bool {
    contains_any(&normalize(&row.section), keywords)
        || contains_any(&normalize(&row.name), keywords)
}

/// Groups rows by course code and merges each group into one aggregate.
///
/// The result is ordered by year, then code. Grading fields are left
/// empty; see [`crate::weighting::grade`].
#[must_use]
pub fn merge<S: AsRef<str>>(rows: &[RawRow], lab_keywords: &[S]) -> Vec<CourseAggregate> {
    let groups = rows
        .iter()
        .fold(BTreeMap::<&str, CourseAggregate>::new(), |mut groups, row| {
            let aggregate = groups
                .entry(row.code.as_str())
                .or_insert_with(|| CourseAggregate::from_first_row(row));
            fold_row(aggregate, row, is_lab_row(row, lab_keywords));
            groups
        });

    let mut courses: Vec<CourseAggregate> = groups.into_values().collect();
    courses.sort_by(|a, b| {
        a.period_year
            .cmp(&b.period_year)
            .then_with(|| a.code.cmp(&b.code))
    });
    courses
}

/// Folds one row into its course aggregate.
fn fold_row(aggregate: &mut CourseAggregate, row: &RawRow, is_lab: bool) {
    if row.name.chars().count() > aggregate.name.chars().count() {
        aggregate.name.clone_from(&row.name);
    }
    aggregate.period_year = aggregate.period_year.max(row.period_year);
    if aggregate.period_semester == Semester::default() {
        aggregate.period_semester = row.period_semester;
    }
    if aggregate.attendance_percent.is_none() {
        aggregate.attendance_percent = row.attendance_percent;
    }
    if row.reported_final.is_some() {
        aggregate.reported_final = row.reported_final;
    }
    if row.reported_status.is_some() {
        aggregate.reported_status.clone_from(&row.reported_status);
    }

    let lab = &mut aggregate.lab;
    if is_lab {
        // Lab sections often reuse the partial-score columns for lab grades.
        if row.lab_scores.is_empty() {
            lab.lab_scores.extend_from_slice(&row.partial_scores);
        } else {
            lab.lab_scores.extend_from_slice(&row.lab_scores);
        }
        lab.reported_final = lab.reported_final.or(row.reported_final);
        lab.reported_lab_average = lab
            .reported_lab_average
            .or(row.reported_lab_average)
            .or(row.reported_partial_average);
        return;
    }

    // Single-row layouts carry the lab columns on the theory row.
    lab.lab_scores.extend_from_slice(&row.lab_scores);
    lab.reported_lab_average = lab.reported_lab_average.or(row.reported_lab_average);

    let theory = &mut aggregate.theory;
    theory.partial_scores.extend_from_slice(&row.partial_scores);
    theory.reported_partial_average = theory
        .reported_partial_average
        .or(row.reported_partial_average);
    theory.exam_score = theory.exam_score.or(row.exam_score);
    theory.reported_final = theory.reported_final.or(row.reported_final);
}
