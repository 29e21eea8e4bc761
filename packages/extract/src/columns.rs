//! Header-to-column mapping.
//!
//! Every semantic [`Field`] has an ordered alias list. For each field, in
//! [`Field::ALL`] order, the first alias that is a substring of some
//! normalized header cell claims that cell. A claimed cell cannot be
//! claimed again, which is why the narrower fields (`exam_weighted`,
//! `partial_average`) resolve before the broader ones (`exam`, `final`).
//!
//! Repeating assessment series (`C1..C4`, `PP1`, `L1..L4`, `Lab 2`) are
//! detected separately by their positional naming pattern.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::normalize::normalize;

/// Maximum number of columns in one assessment series.
pub const MAX_SERIES_LEN: usize = 4;

/// Partial exam series header: `c1`, `cert 2`, `pp3`, `p.4`, `certamen 1`.
static PARTIAL_SERIES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:certamen|cert|parcial|prueba|pc|pp|c|p)\s*[.#°-]?\s*[1-4]$")
        .expect("valid regex")
});

/// Lab series header: `l1`, `lab 2`, `laboratorio 3`.
static LAB_SERIES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:laboratorio|lab|l)\s*[.#°-]?\s*[1-4]$").expect("valid regex")
});

/// A semantic column of the grades table.
#[derive(
    Debug,
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Code,
    Name,
    Section,
    Attendance,
    /// Partial average as stated by the page
    PartialAverage,
    /// Lab average as stated by the page
    LabAverage,
    /// Exam contribution already multiplied by the exam weight
    ExamWeighted,
    Exam,
    Final,
    Status,
    Period,
    Year,
    Semester,
}

impl Field {
    /// All fields, in resolution order.
    pub const ALL: &[Self] = &[
        Self::Code,
        Self::Name,
        Self::Section,
        Self::Attendance,
        Self::PartialAverage,
        Self::LabAverage,
        Self::ExamWeighted,
        Self::Exam,
        Self::Final,
        Self::Status,
        Self::Period,
        Self::Year,
        Self::Semester,
    ];

    /// Built-in aliases for this field, already normalized, in priority
    /// order.
    #[must_use]
    pub const fn default_aliases(self) -> &'static [&'static str] {
        match self {
            Self::Code => &["codigo", "sigla", "cod", "code"],
            Self::Name => &["nombre", "asignatura", "ramo", "curso", "course", "subject"],
            Self::Section => &["seccion", "section", "secc", "paralelo"],
            Self::Attendance => &["asistencia", "attendance", "asist"],
            Self::PartialAverage => &[
                "promedio certamenes",
                "promedio catedra",
                "promedio teoria",
                "promedio parcial",
                "prom. cert",
                "prom cert",
                "prom. catedra",
                "nota presentacion",
                "presentacion",
            ],
            Self::LabAverage => &[
                "promedio laboratorio",
                "promedio lab",
                "prom. lab",
                "prom lab",
                "nota laboratorio",
                "nota lab",
            ],
            Self::ExamWeighted => &[
                "examen ponderado",
                "examen pond",
                "ponderacion examen",
                "% examen",
                "examen %",
                "examen (%)",
                "weighted exam",
            ],
            Self::Exam => &["examen", "exam"],
            Self::Final => &["nota final", "promedio final", "final"],
            Self::Status => &["estado", "situacion", "condicion", "status"],
            Self::Period => &["periodo", "period"],
            Self::Year => &["ano", "year"],
            Self::Semester => &["semestre", "semester"],
        }
    }
}

/// Field to alias list lookup, with institution-specific aliases tried
/// before the built-in ones.
#[derive(Debug, Clone)]
pub struct AliasTable {
    aliases: BTreeMap<Field, Vec<String>>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::with_overrides(&BTreeMap::new())
    }
}

impl AliasTable {
    /// Builds the table from the built-in aliases, prepending `overrides`
    /// (normalized) for the fields they mention.
    #[must_use]
    pub fn with_overrides(overrides: &BTreeMap<Field, Vec<String>>) -> Self {
        let aliases = Field::ALL
            .iter()
            .map(|&field| {
                let mut list: Vec<String> = overrides
                    .get(&field)
                    .into_iter()
                    .flatten()
                    .map(|a| normalize(a))
                    .filter(|a| !a.is_empty())
                    .collect();
                list.extend(field.default_aliases().iter().map(|a| (*a).to_string()));
                (field, list)
            })
            .collect();
        Self { aliases }
    }

    /// Returns the aliases of a field in priority order.
    #[must_use]
    pub fn aliases(&self, field: Field) -> &[String] {
        self.aliases
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Column positions of every mapped field plus the assessment series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    fields: BTreeMap<Field, usize>,
    /// Partial exam columns, left to right.
    pub partials: Vec<usize>,
    /// Lab session columns, left to right.
    pub labs: Vec<usize>,
}

impl ColumnMap {
    /// Returns the column of a field, or `None` if it is unmapped.
    #[must_use]
    pub fn index(&self, field: Field) -> Option<usize> {
        self.fields.get(&field).copied()
    }

    /// Assigns a column to a field.
    pub fn set(&mut self, field: Field, index: usize) {
        self.fields.insert(field, index);
    }

    /// Returns `true` if the header identified neither the code nor the
    /// name column, so no row could ever pass validation.
    #[must_use]
    pub fn lacks_identity(&self) -> bool {
        self.index(Field::Code).is_none() && self.index(Field::Name).is_none()
    }

    /// The fixed column layout of the classic concentration page: code,
    /// name, section, attendance, four partials, four labs, exam, final,
    /// status and period.
    #[must_use]
    pub fn positional_layout() -> Self {
        let mut map = Self {
            fields: BTreeMap::new(),
            partials: vec![4, 5, 6, 7],
            labs: vec![8, 9, 10, 11],
        };
        for (field, index) in [
            (Field::Code, 0),
            (Field::Name, 1),
            (Field::Section, 2),
            (Field::Attendance, 3),
            (Field::Exam, 12),
            (Field::Final, 13),
            (Field::Status, 14),
            (Field::Period, 15),
        ] {
            map.set(field, index);
        }
        map
    }
}

/// Which assessment series a header cell belongs to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Partial,
    Lab,
}

/// Classifies a normalized header cell as a series column.
#[must_use]
pub fn series_of(normalized: &str) -> Option<Series> {
    if LAB_SERIES_RE.is_match(normalized) {
        Some(Series::Lab)
    } else if PARTIAL_SERIES_RE.is_match(normalized) {
        Some(Series::Partial)
    } else {
        None
    }
}

/// Maps a header row to column positions.
#[must_use]
pub fn map_columns<S: AsRef<str>>(header: &[S], aliases: &AliasTable) -> ColumnMap {
    let normalized: Vec<String> = header.iter().map(|h| normalize(h.as_ref())).collect();
    let mut map = ColumnMap::default();
    let mut claimed = BTreeSet::new();

    for (index, cell) in normalized.iter().enumerate() {
        let series = match series_of(cell) {
            Some(Series::Partial) => &mut map.partials,
            Some(Series::Lab) => &mut map.labs,
            None => continue,
        };
        if series.len() < MAX_SERIES_LEN {
            series.push(index);
        }
        claimed.insert(index);
    }

    for &field in Field::ALL {
        let found = aliases.aliases(field).iter().find_map(|alias| {
            normalized
                .iter()
                .enumerate()
                .find(|(i, cell)| !claimed.contains(i) && cell.contains(alias.as_str()))
                .map(|(i, _)| i)
        });
        if let Some(index) = found {
            claimed.insert(index);
            map.set(field, index);
        }
    }

    log::debug!(
        "Column map: fields={:?} partials={:?} labs={:?}",
        map.fields,
        map.partials,
        map.labs
    );

    map
}
