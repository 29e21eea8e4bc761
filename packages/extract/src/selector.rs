//! Grades table selection.
//!
//! A grades page usually contains several tables (layout, student info,
//! schedule, fees). Each one is scored by its header row against a keyword
//! vocabulary, and the highest score wins. A table with both a course-code
//! header and a course-name header gets a large bonus, since that pair is
//! what separates the grades table from everything else on the page.

use scraper::{ElementRef, Html, Selector};

use crate::normalize::{has_token_prefix, normalize};
use crate::table::{header_rows, header_texts, in_thead, own_rows};

/// Bonus for a header containing both a code and a name column.
pub const CODE_NAME_BONUS: u32 = 100;

/// Keywords identifying a course-code header.
const CODE_KEYWORDS: &[&str] = &["cod", "sigla", "code"];

/// Keywords identifying a course-name header.
const NAME_KEYWORDS: &[&str] = &["nombre", "asignatura", "ramo", "curso", "course", "subject"];

/// Keywords for every other column a grades table is expected to have.
const OTHER_KEYWORDS: &[&str] = &[
    "seccion",
    "section",
    "secc",
    "asistencia",
    "attendance",
    "examen",
    "exam",
    "final",
    "estado",
    "status",
    "situacion",
    "periodo",
    "period",
    "ano",
    "year",
    "semestre",
    "semester",
];

/// Score of one table header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderScore {
    /// Total score used to rank tables.
    pub score: u32,
    /// Number of header cells matching any vocabulary keyword.
    pub matches: u32,
}

impl HeaderScore {
    /// A table qualifies only if at least one header cell matched.
    #[must_use]
    pub const fn qualifies(self) -> bool {
        self.matches > 0
    }
}

/// Scores a header row.
///
/// +[`CODE_NAME_BONUS`] when a code header and a name header are both
/// present, plus 1 for every other header cell matching the vocabulary.
/// Without the pair every matching cell (code and name ones included)
/// counts 1.
#[must_use]
pub fn score_header<S: AsRef<str>>(header: &[S]) -> HeaderScore {
    let mut code_seen = false;
    let mut name_seen = false;
    let mut matches = 0_u32;

    for cell in header {
        let cell = normalize(cell.as_ref());
        let is_code = has_token_prefix(&cell, CODE_KEYWORDS);
        let is_name = has_token_prefix(&cell, NAME_KEYWORDS);
        let is_other = has_token_prefix(&cell, OTHER_KEYWORDS);
        if !(is_code || is_name || is_other) {
            continue;
        }
        matches += 1;

        if is_code && !code_seen {
            code_seen = true;
        } else if is_name && !name_seen {
            name_seen = true;
        }
    }

    let score = if code_seen && name_seen {
        CODE_NAME_BONUS + matches - 2
    } else {
        matches
    };

    HeaderScore { score, matches }
}

/// The table chosen as the grades table.
#[derive(Debug, Clone)]
pub struct SelectedTable<'a> {
    /// The `<table>` element.
    pub element: ElementRef<'a>,
    /// Zero-based position of the table in document order.
    pub position: usize,
    /// The header row element (the first one when `<thead>` has several).
    pub header_row: ElementRef<'a>,
    /// Header text per column, spans expanded (whitespace-collapsed, not
    /// normalized).
    pub header: Vec<String>,
    pub score: HeaderScore,
}

impl<'a> SelectedTable<'a> {
    /// Returns the data rows: every owned row except the header row and
    /// anything else inside `<thead>`.
    #[must_use]
    pub fn data_rows(&self) -> Vec<ElementRef<'a>> {
        own_rows(self.element)
            .into_iter()
            .filter(|row| row.id() != self.header_row.id() && !in_thead(*row))
            .collect()
    }
}

/// Selects the grades table of a document.
///
/// The strictly highest score wins, so ties keep the table that comes
/// first in document order. Returns `None` when no table header matches a
/// single vocabulary keyword.
#[must_use]
pub fn select_table(document: &Html) -> Option<SelectedTable<'_>> {
    let table_sel = Selector::parse("table").unwrap_or_else(|_| unreachable!());
    let mut best: Option<SelectedTable<'_>> = None;

    for (position, element) in document.select(&table_sel).enumerate() {
        let rows = own_rows(element);
        let header_rows = header_rows(&rows);
        let Some(&header_row) = header_rows.first() else {
            continue;
        };
        let header = header_texts(&header_rows);
        let score = score_header(header.as_slice());

        log::debug!(
            "Table #{position}: score={} matches={} header={header:?}",
            score.score,
            score.matches
        );

        if !score.qualifies() {
            continue;
        }
        if best.as_ref().is_some_and(|b| b.score.score >= score.score) {
            continue;
        }

        best = Some(SelectedTable {
            element,
            position,
            header_row,
            header,
            score,
        });
    }

    best
}
