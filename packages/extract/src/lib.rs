#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grade extraction engine.
//!
//! Turns the HTML of a grade-concentration page into a [`GradeReport`]:
//!
//! 1. An embedded JSON payload ([`embedded`]) is used when present.
//! 2. Otherwise the grades table is picked by header scoring ([`selector`]).
//! 3. Header cells are mapped to semantic fields ([`columns`]).
//! 4. Every data row is coerced and validated ([`rows`]).
//! 5. Rows of the same course are merged ([`merge`]).
//! 6. Each course gets a weighted final grade and a status ([`weighting`]).
//!
//! The engine never performs I/O. Pages with no grades table or no usable
//! rows are not errors; they produce an empty report whose
//! [`ExtractionOutcome`] says why.

pub mod columns;
pub mod embedded;
pub mod merge;
pub mod normalize;
pub mod numeric;
pub mod period;
pub mod rows;
pub mod selector;
pub mod table;
pub mod weighting;

use std::collections::BTreeMap;

use notas_grades_models::{ExtractionOutcome, GradeReport, RawRow};
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::columns::{AliasTable, ColumnMap, Field, map_columns};
use crate::embedded::{find_embedded_json, rows_from_embedded};
use crate::rows::{RowRules, extract_rows};
use crate::selector::select_table;
use crate::table::own_rows;

/// Course-code pattern used when none is configured (e.g. `MAT-1001`).
pub const DEFAULT_CODE_PATTERN: &str = r"^[A-Z0-9]{3,6}-\d{4}$";

/// Errors raised for invalid extraction settings.
///
/// Problems with the page itself are never errors; see
/// [`ExtractionOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The configured course-code pattern is not a valid regex.
    #[error("Invalid course code pattern '{pattern}': {source}")]
    InvalidCodePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The configured exam weight is outside `(0, 1]`.
    #[error("Invalid exam weight {weight}: expected a fraction in (0, 1]")]
    InvalidExamWeight { weight: f64 },
}

/// Institution-specific extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ExtractOptions {
    /// Regex a canonical course code must match.
    pub code_pattern: String,
    /// Keywords marking a row as a lab section (matched on normalized
    /// section and name text).
    pub lab_keywords: Vec<String>,
    /// Exam weight used to recover the raw exam score from a weighted exam
    /// column. Disabled when `None`.
    pub exam_weight: Option<f64>,
    /// Year assigned to rows without a detectable year.
    pub fallback_year: Option<i32>,
    /// Extra header aliases, tried before the built-in ones.
    pub extra_aliases: BTreeMap<Field, Vec<String>>,
    /// Use an embedded JSON payload instead of the table when it yields
    /// rows.
    pub prefer_embedded_json: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            code_pattern: DEFAULT_CODE_PATTERN.to_string(),
            lab_keywords: vec!["lab".to_string()],
            exam_weight: None,
            fallback_year: None,
            extra_aliases: BTreeMap::new(),
            prefer_embedded_json: true,
        }
    }
}

impl ExtractOptions {
    /// Sets the course-code pattern.
    #[must_use]
    pub fn with_code_pattern(mut self, pattern: &str) -> Self {
        pattern.clone_into(&mut self.code_pattern);
        self
    }

    /// Sets the lab keywords.
    #[must_use]
    pub fn with_lab_keywords(mut self, keywords: Vec<String>) -> Self {
        self.lab_keywords = keywords;
        self
    }

    /// Enables exam score recovery from a weighted exam column.
    #[must_use]
    pub const fn with_exam_weight(mut self, weight: f64) -> Self {
        self.exam_weight = Some(weight);
        self
    }

    /// Sets the year used for rows without a detectable year.
    #[must_use]
    pub const fn with_fallback_year(mut self, year: i32) -> Self {
        self.fallback_year = Some(year);
        self
    }

    /// Adds header aliases for a field.
    #[must_use]
    pub fn with_aliases(mut self, field: Field, aliases: &[&str]) -> Self {
        self.extra_aliases
            .entry(field)
            .or_default()
            .extend(aliases.iter().map(|a| (*a).to_string()));
        self
    }

    /// Enables or disables the embedded JSON path.
    #[must_use]
    pub const fn with_prefer_embedded_json(mut self, prefer: bool) -> Self {
        self.prefer_embedded_json = prefer;
        self
    }
}

/// A validated, reusable extraction pipeline.
#[derive(Debug, Clone)]
pub struct GradeExtractor {
    code_pattern: Regex,
    lab_keywords: Vec<String>,
    aliases: AliasTable,
    exam_weight: Option<f64>,
    fallback_year: Option<i32>,
    prefer_embedded_json: bool,
}

impl GradeExtractor {
    /// Validates the options and builds an extractor.
    ///
    /// # Errors
    ///
    /// * [`ExtractError::InvalidCodePattern`] if the code pattern does not
    ///   compile
    /// * [`ExtractError::InvalidExamWeight`] if the exam weight is not a
    ///   fraction in `(0, 1]`
    pub fn new(options: &ExtractOptions) -> Result<Self, ExtractError> {
        let code_pattern = Regex::new(&options.code_pattern).map_err(|source| {
            ExtractError::InvalidCodePattern {
                pattern: options.code_pattern.clone(),
                source,
            }
        })?;

        if let Some(weight) = options.exam_weight
            && !(weight > 0.0 && weight <= 1.0)
        {
            return Err(ExtractError::InvalidExamWeight { weight });
        }

        let lab_keywords = options
            .lab_keywords
            .iter()
            .map(|k| normalize::normalize(k))
            .filter(|k| !k.is_empty())
            .collect();

        Ok(Self {
            code_pattern,
            lab_keywords,
            aliases: AliasTable::with_overrides(&options.extra_aliases),
            exam_weight: options.exam_weight,
            fallback_year: options.fallback_year,
            prefer_embedded_json: options.prefer_embedded_json,
        })
    }

    const fn rules(&self) -> RowRules<'_> {
        RowRules {
            code_pattern: &self.code_pattern,
            exam_weight: self.exam_weight,
            fallback_year: self.fallback_year,
        }
    }

    /// Extracts the grade report of an HTML page.
    #[must_use]
    pub fn extract(&self, html: &str) -> GradeReport {
        self.extract_document(&Html::parse_document(html))
    }

    /// Extracts the grade report of an already parsed page.
    #[must_use]
    pub fn extract_document(&self, document: &Html) -> GradeReport {
        let rules = self.rules();

        if self.prefer_embedded_json
            && let Some(payload) = find_embedded_json(document)
        {
            let rows = rows_from_embedded(&payload, &rules);
            if !rows.is_empty() {
                log::info!("Using embedded JSON payload ({} rows)", rows.len());
                return self.finish(&rows);
            }
            log::debug!("Embedded JSON payload has no usable rows, reading tables");
        }

        let Some(table) = select_table(document) else {
            log::info!("No table looks like a grades table");
            return GradeReport::empty(ExtractionOutcome::NoCandidateTable);
        };
        log::info!(
            "Selected table #{} (score {})",
            table.position,
            table.score.score
        );

        let columns = map_columns(&table.header, &self.aliases);
        let rows = if columns.lacks_identity() {
            log::warn!(
                "Header {:?} has no code or name column, using the fixed legacy layout",
                table.header
            );
            extract_rows(
                &own_rows(table.element),
                &ColumnMap::positional_layout(),
                &rules,
            )
        } else {
            extract_rows(&table.data_rows(), &columns, &rules)
        };

        self.finish(&rows)
    }

    fn finish(&self, rows: &[RawRow]) -> GradeReport {
        let courses: Vec<_> = merge::merge(rows, &self.lab_keywords)
            .into_iter()
            .map(weighting::grade)
            .collect();

        log::info!("Extracted {} courses from {} rows", courses.len(), rows.len());

        GradeReport::from_courses(courses)
    }
}

/// Extracts the grade report of an HTML page with the given options.
///
/// # Errors
///
/// * If the options are invalid; see [`GradeExtractor::new`]
pub fn extract_grades(html: &str, options: &ExtractOptions) -> Result<GradeReport, ExtractError> {
    Ok(GradeExtractor::new(options)?.extract(html))
}
