#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Course grade record types.
//!
//! A grades page is reduced in two steps: every usable table row becomes a
//! [`RawRow`], and all rows sharing a course code are folded into one
//! [`CourseAggregate`]. The aggregate carries both what the page reported
//! (final grade, status text) and what was computed from the individual
//! scores under a [`Weights`] policy.
//!
//! Every numeric grade is an `Option<f64>`: `None` means the cell was empty
//! or unparseable, which is not the same thing as a zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Minimum grade (inclusive) for a course to count as passed.
pub const PASSING_GRADE: f64 = 4.0;

/// Section label used when a row has no section cell.
pub const DEFAULT_SECTION: &str = "Teórico";

/// Academic semester within a year.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum Semester {
    /// First semester (also the default when nothing can be detected).
    #[default]
    First = 1,
    /// Second semester.
    Second = 2,
}

impl Semester {
    /// Returns the numeric value of this semester (1 or 2).
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a semester from its numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not 1 or 2.
    pub const fn from_value(value: u8) -> Result<Self, InvalidSemesterError> {
        match value {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            _ => Err(InvalidSemesterError { value }),
        }
    }
}

impl std::fmt::Display for Semester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl From<Semester> for u8 {
    fn from(semester: Semester) -> Self {
        semester.value()
    }
}

impl TryFrom<u8> for Semester {
    type Error = InvalidSemesterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Error returned when attempting to create a [`Semester`] from an invalid
/// numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSemesterError {
    /// The invalid semester value that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidSemesterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid semester value {}: expected 1 or 2", self.value)
    }
}

impl std::error::Error for InvalidSemesterError {}

/// Builds the `"{year}-{semester}"` key used to group courses by period.
#[must_use]
pub fn period_key(year: i32, semester: Semester) -> String {
    format!("{year}-{semester}")
}

/// Pass/fail state of a course.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
    /// Final grade at or above [`PASSING_GRADE`]
    Aprobado,
    /// Final grade below [`PASSING_GRADE`]
    Reprobado,
    /// No final grade available yet
    #[default]
    Cursando,
}

impl CourseStatus {
    /// Classifies a final grade against [`PASSING_GRADE`].
    #[must_use]
    pub fn from_grade(grade: f64) -> Self {
        if grade >= PASSING_GRADE {
            Self::Aprobado
        } else {
            Self::Reprobado
        }
    }
}

/// One extracted table row, before rows of the same course are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRow {
    /// Canonical uppercase course code (e.g. `"MAT-1001"`).
    pub code: String,
    /// Course name as shown on the page.
    pub name: String,
    /// Section label (e.g. `"1 - Teórico"`, `"2 - Laboratorio"`).
    pub section: String,
    pub attendance_percent: Option<f64>,
    /// Partial exam ("certamen") scores, left to right.
    pub partial_scores: Vec<f64>,
    /// Lab session scores, left to right.
    pub lab_scores: Vec<f64>,
    pub exam_score: Option<f64>,
    /// Partial average as stated by the page, if it has such a column.
    pub reported_partial_average: Option<f64>,
    /// Lab average as stated by the page, if it has such a column.
    pub reported_lab_average: Option<f64>,
    /// Final grade as stated by the page.
    pub reported_final: Option<f64>,
    /// Status text as stated by the page (e.g. `"Aprobado"`).
    pub reported_status: Option<String>,
    /// Academic year; `0` when it could not be detected.
    pub period_year: i32,
    pub period_semester: Semester,
}

/// Lecture ("teórico") component of a course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TheoryComponent {
    pub partial_scores: Vec<f64>,
    pub reported_partial_average: Option<f64>,
    pub exam_score: Option<f64>,
    pub reported_final: Option<f64>,
}

/// Laboratory component of a course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabComponent {
    pub lab_scores: Vec<f64>,
    pub reported_lab_average: Option<f64>,
    pub reported_final: Option<f64>,
}

/// Percentages used to combine partial, exam and lab grades.
///
/// `theory_weight + lab_weight` is always 100. Inside the theory component
/// the exam takes `exam_weight_inside_theory` percent and the partial
/// average takes the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weights {
    pub theory_weight: u8,
    pub lab_weight: u8,
    pub exam_weight_inside_theory: u8,
}

impl Weights {
    /// Creates a new weighting policy.
    #[must_use]
    pub const fn new(theory_weight: u8, lab_weight: u8, exam_weight_inside_theory: u8) -> Self {
        Self {
            theory_weight,
            lab_weight,
            exam_weight_inside_theory,
        }
    }

    /// Percentage of the theory component taken by the partial average.
    #[must_use]
    pub const fn partial_weight_inside_theory(self) -> u8 {
        100 - self.exam_weight_inside_theory
    }
}

/// One merged per-course record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAggregate {
    pub code: String,
    /// Longest name observed across the course's rows.
    pub name: String,
    pub period_year: i32,
    pub period_semester: Semester,
    pub attendance_percent: Option<f64>,
    pub theory: TheoryComponent,
    pub lab: LabComponent,
    /// Page-level final grade; the last non-empty value across all rows.
    pub reported_final: Option<f64>,
    pub reported_status: Option<String>,
    /// Final grade computed from the individual scores.
    pub computed_final: Option<f64>,
    /// Policy used for `computed_final`. `None` until the course is graded.
    pub weights_used: Option<Weights>,
    pub status: CourseStatus,
}

impl CourseAggregate {
    /// Creates an empty aggregate for the given course, taking identity
    /// fields from its first row.
    #[must_use]
    pub fn from_first_row(row: &RawRow) -> Self {
        Self {
            code: row.code.clone(),
            name: row.name.clone(),
            period_year: row.period_year,
            period_semester: row.period_semester,
            attendance_percent: None,
            theory: TheoryComponent::default(),
            lab: LabComponent::default(),
            reported_final: None,
            reported_status: None,
            computed_final: None,
            weights_used: None,
            status: CourseStatus::Cursando,
        }
    }

    /// Returns the `"{year}-{semester}"` key of this course's period.
    #[must_use]
    pub fn period_key(&self) -> String {
        period_key(self.period_year, self.period_semester)
    }
}

/// How an extraction run ended.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionOutcome {
    /// At least one course was extracted.
    Extracted,
    /// No table on the page looked like a grades table.
    NoCandidateTable,
    /// A table was found but every row was rejected as noise.
    EmptyExtraction,
}

/// Result of extracting one grades page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
    pub outcome: ExtractionOutcome,
    /// Courses ordered by year, then code.
    pub courses: Vec<CourseAggregate>,
}

impl GradeReport {
    /// Creates a report with no courses for a recoverable empty outcome.
    #[must_use]
    pub const fn empty(outcome: ExtractionOutcome) -> Self {
        Self {
            outcome,
            courses: Vec::new(),
        }
    }

    /// Creates a report from graded courses. The outcome is
    /// [`ExtractionOutcome::EmptyExtraction`] when `courses` is empty.
    #[must_use]
    pub fn from_courses(courses: Vec<CourseAggregate>) -> Self {
        let outcome = if courses.is_empty() {
            ExtractionOutcome::EmptyExtraction
        } else {
            ExtractionOutcome::Extracted
        };
        Self { outcome, courses }
    }

    /// Returns `true` when nothing was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// Groups courses by their `"{year}-{semester}"` period key, keeping
    /// the report's course order inside each group.
    #[must_use]
    pub fn by_period(&self) -> BTreeMap<String, Vec<&CourseAggregate>> {
        let mut groups: BTreeMap<String, Vec<&CourseAggregate>> = BTreeMap::new();
        for course in &self.courses {
            groups.entry(course.period_key()).or_default().push(course);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(code: &str, year: i32, semester: Semester) -> CourseAggregate {
        CourseAggregate {
            code: code.to_string(),
            name: "Curso".to_string(),
            period_year: year,
            period_semester: semester,
            attendance_percent: None,
            theory: TheoryComponent::default(),
            lab: LabComponent::default(),
            reported_final: None,
            reported_status: None,
            computed_final: None,
            weights_used: None,
            status: CourseStatus::Cursando,
        }
    }

    #[test]
    fn semester_round_trips_through_numbers() {
        assert_eq!(Semester::from_value(1), Ok(Semester::First));
        assert_eq!(Semester::from_value(2), Ok(Semester::Second));
        assert_eq!(
            Semester::from_value(3),
            Err(InvalidSemesterError { value: 3 })
        );
        assert_eq!(Semester::default(), Semester::First);
    }

    #[test]
    fn semester_serializes_as_number() {
        let json = serde_json::to_string(&Semester::Second).unwrap();
        assert_eq!(json, "2");
        assert!(serde_json::from_str::<Semester>("5").is_err());
    }

    #[test]
    fn status_uses_passing_threshold() {
        assert_eq!(CourseStatus::from_grade(4.0), CourseStatus::Aprobado);
        assert_eq!(CourseStatus::from_grade(3.9), CourseStatus::Reprobado);
        assert_eq!(CourseStatus::Aprobado.to_string(), "APROBADO");
        assert_eq!(
            "CURSANDO".parse::<CourseStatus>().unwrap(),
            CourseStatus::Cursando
        );
    }

    #[test]
    fn partial_weight_complements_exam_weight() {
        assert_eq!(Weights::new(100, 0, 30).partial_weight_inside_theory(), 70);
        assert_eq!(Weights::new(80, 20, 0).partial_weight_inside_theory(), 100);
    }

    #[test]
    fn builds_period_key() {
        assert_eq!(period_key(2024, Semester::Second), "2024-2");
    }

    #[test]
    fn groups_courses_by_period() {
        let report = GradeReport::from_courses(vec![
            course("FIS-1001", 2023, Semester::Second),
            course("MAT-1001", 2024, Semester::First),
            course("QUI-1001", 2024, Semester::First),
        ]);

        let groups = report.by_period();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["2023-2"].len(), 1);
        let codes: Vec<&str> = groups["2024-1"].iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["MAT-1001", "QUI-1001"]);
    }

    #[test]
    fn empty_courses_mean_empty_extraction() {
        let report = GradeReport::from_courses(Vec::new());
        assert_eq!(report.outcome, ExtractionOutcome::EmptyExtraction);
        assert!(report.is_empty());
    }

    #[test]
    fn aggregate_serializes_camel_case() {
        let json = serde_json::to_value(course("MAT-1001", 2024, Semester::First)).unwrap();
        assert_eq!(json["periodYear"], 2024);
        assert_eq!(json["periodSemester"], 1);
        assert_eq!(json["status"], "CURSANDO");
        assert!(json["reportedFinal"].is_null());
    }
}
