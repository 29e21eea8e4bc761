//! JSON report output.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use notas_grades_models::{CourseAggregate, ExtractionOutcome, GradeReport};
use serde::Serialize;

/// File name of the raw page saved when nothing could be extracted.
pub const RAW_HTML_FILE: &str = "notas_raw.html";

/// Errors that can occur while writing output files.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Serializing the report failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing a file failed.
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The JSON document written to disk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument<'a> {
    pub generated_at: String,
    pub outcome: ExtractionOutcome,
    pub courses: &'a [CourseAggregate],
    /// Courses grouped by `"{year}-{semester}"`.
    pub by_period: BTreeMap<String, Vec<&'a CourseAggregate>>,
}

impl<'a> ReportDocument<'a> {
    #[must_use]
    pub fn new(report: &'a GradeReport, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at: generated_at.to_rfc3339(),
            outcome: report.outcome,
            courses: &report.courses,
            by_period: report.by_period(),
        }
    }
}

/// Renders a report as pretty-printed JSON.
///
/// # Errors
///
/// Returns the serialization error, if any.
pub fn render_report(
    report: &GradeReport,
    generated_at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ReportDocument::new(report, generated_at))
}

fn write_file(path: &Path, contents: &str) -> Result<(), OutputError> {
    std::fs::write(path, contents).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a report as JSON, stamped with the current time.
///
/// # Errors
///
/// * [`OutputError::Json`] if serialization fails
/// * [`OutputError::Io`] if the file cannot be written
pub fn write_report(path: &Path, report: &GradeReport) -> Result<(), OutputError> {
    let json = render_report(report, Utc::now())?;
    write_file(path, &json)?;
    log::info!(
        "Wrote {} ({} courses, outcome {})",
        path.display(),
        report.courses.len(),
        report.outcome
    );
    Ok(())
}

/// Path of the raw page dump, next to the report file.
#[must_use]
pub fn raw_html_path(report_path: &Path) -> PathBuf {
    report_path.with_file_name(RAW_HTML_FILE)
}

/// Saves the raw page next to the report for manual inspection.
///
/// # Errors
///
/// * [`OutputError::Io`] if the file cannot be written
pub fn write_raw_html(report_path: &Path, html: &str) -> Result<PathBuf, OutputError> {
    let path = raw_html_path(report_path);
    write_file(&path, html)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use notas_grades_models::{CourseStatus, LabComponent, Semester, TheoryComponent, Weights};

    use super::*;

    fn course(code: &str, year: i32) -> CourseAggregate {
        CourseAggregate {
            code: code.to_string(),
            name: "Curso".to_string(),
            period_year: year,
            period_semester: Semester::First,
            attendance_percent: Some(90.0),
            theory: TheoryComponent {
                partial_scores: vec![5.0, 6.0],
                ..TheoryComponent::default()
            },
            lab: LabComponent::default(),
            reported_final: None,
            reported_status: None,
            computed_final: Some(5.5),
            weights_used: Some(Weights::new(100, 0, 0)),
            status: CourseStatus::Aprobado,
        }
    }

    #[test]
    fn renders_camel_case_document() {
        let report =
            GradeReport::from_courses(vec![course("FIS-1001", 2023), course("MAT-1001", 2024)]);
        let at = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&render_report(&report, at).unwrap()).unwrap();

        assert_eq!(json["generatedAt"], "2024-07-01T12:00:00+00:00");
        assert_eq!(json["outcome"], "EXTRACTED");
        assert_eq!(json["courses"].as_array().unwrap().len(), 2);
        assert_eq!(json["courses"][0]["theory"]["partialScores"][1], 6.0);
        assert_eq!(json["courses"][0]["weightsUsed"]["theoryWeight"], 100);
        assert_eq!(json["byPeriod"]["2024-1"][0]["code"], "MAT-1001");
        assert_eq!(json["byPeriod"]["2023-1"][0]["code"], "FIS-1001");
    }

    #[test]
    fn renders_empty_outcome() {
        let report = GradeReport::empty(ExtractionOutcome::NoCandidateTable);
        let at = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&render_report(&report, at).unwrap()).unwrap();
        assert_eq!(json["outcome"], "NO_CANDIDATE_TABLE");
        assert!(json["courses"].as_array().unwrap().is_empty());
        assert!(json["byPeriod"].as_object().unwrap().is_empty());
    }

    #[test]
    fn raw_dump_sits_next_to_report() {
        assert_eq!(
            raw_html_path(Path::new("out/notas.json")),
            PathBuf::from("out/notas_raw.html")
        );
        assert_eq!(raw_html_path(Path::new("notas.json")), PathBuf::from("notas_raw.html"));
    }
}
