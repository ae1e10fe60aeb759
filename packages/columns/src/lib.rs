#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Column classification by header text.
//!
//! The backing sheet's columns are not known at compile time, so each
//! column's semantic role is inferred from keywords in its name. Roles are
//! decided once per column by walking an ordered rule list ([`RULES`]); the
//! first rule that matches wins and the result is carried around as an
//! immutable [`Schema`]. Both the form renderer and the row assembler read
//! roles from the schema instead of re-deriving them.

pub mod dates;
pub mod hint;
pub mod options;

use risk_map_risk_models::IndicatorFamily;
use serde::{Deserialize, Serialize};

/// Fields that are derived from other inputs and never get their own form
/// control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedField {
    /// Combined `"lat, lon"` column.
    Coordinate,
    /// Dedicated latitude column.
    Latitude,
    /// Dedicated longitude column.
    Longitude,
    /// Explicit hex color column.
    Color,
}

/// The semantic role of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "kind", rename_all = "snake_case")]
pub enum ColumnRole {
    /// The single risk level column.
    Level,
    /// Coordinate, latitude, longitude, or color column.
    Derived(DerivedField),
    /// URL of an uploaded documentation artifact.
    Documentation,
    /// Feeder line ("penyulang") with a constrained option set.
    Feeder,
    /// One of the four status indicator families.
    Indicator(IndicatorFamily),
    /// Calendar date.
    Date,
    /// Sequence or reference number.
    Number,
    /// Free text.
    Plain,
}

/// One entry of the ordered classification list.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Short name for logs and tests.
    pub name: &'static str,
    /// Receives the lowercased column name.
    pub matches: fn(&str) -> Option<ColumnRole>,
}

/// Classification rules in priority order. Keyword sets overlap (a name can
/// contain both a date and a number keyword), so the order is significant.
pub const RULES: &[Rule] = &[
    Rule {
        name: "derived",
        matches: derived_role,
    },
    Rule {
        name: "documentation",
        matches: documentation_role,
    },
    Rule {
        name: "feeder",
        matches: feeder_role,
    },
    Rule {
        name: "indicator",
        matches: indicator_role,
    },
    Rule {
        name: "date",
        matches: date_role,
    },
    Rule {
        name: "number",
        matches: number_role,
    },
];

const DATE_KEYWORDS: &[&str] = &["tanggal", "tgl", "date", "waktu", "time", "bulan", "tahun"];

/// Person-name columns that mention a date keyword but hold names.
const DATE_EXCLUSIONS: &[&str] = &["petugas", "nama", "penemu"];

const NUMBER_KEYWORDS: &[&str] = &["no", "nomor", "nomer", "number", "num", "urut"];

/// Reference numbers that are entered verbatim and get no "last number"
/// hint.
const NUMBER_EXCLUSIONS: &[&str] = &[
    "nomer surat permohonan pembungkusan",
    "nomer surat pemohonan pembungkusan",
    "nomer surat pfk",
    "idpel",
    "no meter",
];

/// Returns `true` if the (lowercased) name holds a risk level.
#[must_use]
pub fn is_level_column(column_name: &str) -> bool {
    let lower = column_name.to_lowercase();
    lower.contains("level") && (lower.contains("risiko") || lower.contains("resiko"))
}

/// Finds the first risk level column. At most one column plays this role.
#[must_use]
pub fn find_level_column(columns: &[String]) -> Option<&str> {
    columns
        .iter()
        .map(String::as_str)
        .find(|c| is_level_column(c))
}

/// Classifies a single column name, ignoring the level role.
///
/// This is total: a name that matches no rule is [`ColumnRole::Plain`].
#[must_use]
pub fn classify(column_name: &str) -> ColumnRole {
    let lower = column_name.to_lowercase();
    RULES
        .iter()
        .find_map(|rule| (rule.matches)(&lower))
        .unwrap_or(ColumnRole::Plain)
}

fn derived_role(lower: &str) -> Option<ColumnRole> {
    let field = if lower.contains("koordinat") || lower.contains("coord") {
        DerivedField::Coordinate
    } else if lower.contains("latitude") || matches!(lower.trim(), "lat" | "lintang") {
        DerivedField::Latitude
    } else if lower.contains("longitude") || matches!(lower.trim(), "lon" | "lng" | "bujur") {
        DerivedField::Longitude
    } else if lower.contains("color") || lower.trim() == "warna" {
        DerivedField::Color
    } else {
        return None;
    };
    Some(ColumnRole::Derived(field))
}

fn documentation_role(lower: &str) -> Option<ColumnRole> {
    lower
        .contains("dokumentasi")
        .then_some(ColumnRole::Documentation)
}

fn feeder_role(lower: &str) -> Option<ColumnRole> {
    lower.contains("penyulang").then_some(ColumnRole::Feeder)
}

fn indicator_role(lower: &str) -> Option<ColumnRole> {
    IndicatorFamily::from_column_name(lower).map(ColumnRole::Indicator)
}

fn date_role(lower: &str) -> Option<ColumnRole> {
    if contains_any(lower, DATE_EXCLUSIONS) {
        return None;
    }
    contains_any(lower, DATE_KEYWORDS).then_some(ColumnRole::Date)
}

fn number_role(lower: &str) -> Option<ColumnRole> {
    if contains_any(lower, NUMBER_EXCLUSIONS) {
        return None;
    }
    contains_any(lower, NUMBER_KEYWORDS).then_some(ColumnRole::Number)
}

/// Checks if `haystack` contains any of the given `needles`.
fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// A column name paired with its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedColumn {
    /// Column name exactly as in the header row.
    pub name: String,
    /// Role decided by [`Schema::classify`].
    pub role: ColumnRole,
}

/// Every column of a dataset with its role, in sheet order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ClassifiedColumn>,
}

impl Schema {
    /// Classifies every column. The level column is picked once, before the
    /// per-column rules run.
    #[must_use]
    pub fn classify(columns: &[String]) -> Self {
        let level = find_level_column(columns);
        let columns = columns
            .iter()
            .map(|name| ClassifiedColumn {
                name: name.clone(),
                role: if Some(name.as_str()) == level {
                    ColumnRole::Level
                } else {
                    classify(name)
                },
            })
            .collect();
        Self { columns }
    }

    /// Classified columns in sheet order.
    #[must_use]
    pub fn columns(&self) -> &[ClassifiedColumn] {
        &self.columns
    }

    /// Returns `true` if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Name of the risk level column, if any.
    #[must_use]
    pub fn level_column(&self) -> Option<&str> {
        self.first_with_role(ColumnRole::Level)
    }

    /// Role of the named column.
    #[must_use]
    pub fn role_of(&self, column: &str) -> Option<ColumnRole> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.role)
    }

    /// Name of the first column with exactly `role`.
    #[must_use]
    pub fn first_with_role(&self, role: ColumnRole) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.role == role)
            .map(|c| c.name.as_str())
    }

    /// Names of all columns with exactly `role`, in sheet order.
    pub fn names_with_role(&self, role: ColumnRole) -> impl Iterator<Item = &str> + '_ {
        self.columns
            .iter()
            .filter(move |c| c.role == role)
            .map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_excluded_number_columns() {
        assert_eq!(classify("Nomer Surat PFK"), ColumnRole::Plain);
        assert_eq!(classify("IDPEL"), ColumnRole::Plain);
        assert_eq!(classify("No Meter"), ColumnRole::Plain);
        assert_eq!(
            classify("Nomer Surat Permohonan Pembungkusan"),
            ColumnRole::Plain
        );
    }

    #[test]
    fn classifies_number_columns() {
        assert_eq!(classify("No"), ColumnRole::Number);
        assert_eq!(classify("Nomor Urut"), ColumnRole::Number);
        assert_eq!(classify("Nomer Tiang"), ColumnRole::Number);
    }

    #[test]
    fn date_beats_number() {
        assert_eq!(classify("Tanggal No Urut"), ColumnRole::Date);
    }

    #[test]
    fn person_name_columns_are_not_dates() {
        assert_eq!(classify("Nama Petugas"), ColumnRole::Plain);
        assert_eq!(classify("Tanggal Penemu"), ColumnRole::Plain);
        assert_eq!(classify("Tanggal Temuan"), ColumnRole::Date);
        assert_eq!(classify("Bulan"), ColumnRole::Date);
    }

    #[test]
    fn derived_columns_come_first() {
        assert_eq!(
            classify("Koordinat"),
            ColumnRole::Derived(DerivedField::Coordinate)
        );
        assert_eq!(
            classify("Latitude"),
            ColumnRole::Derived(DerivedField::Latitude)
        );
        assert_eq!(classify("lng"), ColumnRole::Derived(DerivedField::Longitude));
        assert_eq!(classify("Color"), ColumnRole::Derived(DerivedField::Color));
        assert_eq!(classify("Warna"), ColumnRole::Derived(DerivedField::Color));
        assert_eq!(
            classify("Tanggal Koordinat"),
            ColumnRole::Derived(DerivedField::Coordinate)
        );
    }

    #[test]
    fn documentation_beats_feeder_and_date() {
        assert_eq!(classify("Dokumentasi Penyulang"), ColumnRole::Documentation);
        assert_eq!(classify("Dokumentasi Tanggal"), ColumnRole::Documentation);
    }

    #[test]
    fn feeder_beats_indicator() {
        assert_eq!(classify("Penyulang"), ColumnRole::Feeder);
        assert_eq!(classify("Indikator Surat Penyulang"), ColumnRole::Feeder);
    }

    #[test]
    fn indicator_beats_date() {
        assert_eq!(
            classify("Indikator Surat Tanggal"),
            ColumnRole::Indicator(IndicatorFamily::Surat)
        );
        assert_eq!(
            classify("Indikator Bungkus"),
            ColumnRole::Indicator(IndicatorFamily::Bungkus)
        );
    }

    #[test]
    fn unmatched_is_plain() {
        assert_eq!(classify("Alamat"), ColumnRole::Plain);
        assert_eq!(classify(""), ColumnRole::Plain);
    }

    #[test]
    fn schema_picks_single_level_column() {
        let columns: Vec<String> = ["Level Resiko", "Alamat", "Level Risiko Lama"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let schema = Schema::classify(&columns);
        assert_eq!(schema.level_column(), Some("Level Resiko"));
        assert_eq!(schema.names_with_role(ColumnRole::Level).count(), 1);
        assert_eq!(schema.role_of("Level Risiko Lama"), Some(ColumnRole::Plain));
    }

    #[test]
    fn every_column_gets_exactly_one_role() {
        let columns: Vec<String> = [
            "No",
            "Tanggal",
            "Nama Pemilik",
            "Koordinat",
            "Dokumentasi 1",
            "Penyulang",
            "Indikator PFK",
            "Level Resiko",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        let schema = Schema::classify(&columns);
        assert_eq!(schema.columns().len(), columns.len());
        for column in &columns {
            assert!(schema.role_of(column).is_some());
        }
    }
}
