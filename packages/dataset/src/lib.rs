#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Observation dataset model shared by the form and map layers.
//!
//! A [`Dataset`] is a flat table whose column set and order come from the
//! backing sheet's header row. Nothing about the columns is known at compile
//! time: semantic roles are inferred later from header text. Raw store
//! output ([`RawTable`]) passes through [`normalize::normalize`] before
//! anything else touches it.

pub mod cache;
pub mod fingerprint;
pub mod normalize;
pub mod seed;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur while building or loading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// A row had more cells than the table has columns.
    #[error("Row has {actual} cells but the table has {expected} columns")]
    RowWidth {
        /// Number of columns in the table.
        expected: usize,
        /// Number of cells in the offending row.
        actual: usize,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error reading a seed file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Seed data was structurally unusable.
    #[error("Seed error: {message}")]
    Seed {
        /// Description of what went wrong.
        message: String,
    },
}

/// Header row plus untyped cells, exactly as returned by a tabular store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    /// Column names from the header row, in sheet order.
    pub headers: Vec<String>,
    /// Data rows. Rows may be shorter than `headers` when trailing cells
    /// are empty.
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// A single normalized cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// No value.
    Empty,
    /// A numeric value.
    Number(f64),
    /// Free text.
    Text(String),
}

impl CellValue {
    /// Returns `true` for empty cells, whitespace-only text, and `NaN`.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Number(n) => n.is_nan(),
            Self::Text(s) => s.trim().is_empty(),
        }
    }

    /// Interprets the cell as a float, parsing text when needed.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Empty => None,
            Self::Number(n) => (!n.is_nan()).then_some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Returns the display text with surrounding whitespace removed.
    #[must_use]
    pub fn display_trimmed(&self) -> String {
        self.to_string().trim().to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Number(n) if n.is_nan() => Ok(()),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Formats a float the way the sheet shows it: integral values drop the
/// fractional part.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// An ordered table of observation records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Creates an empty dataset with the given header.
    #[must_use]
    pub const fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Creates a dataset from a header and rows.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::RowWidth`] if any row is wider than the
    /// header.
    pub fn with_rows(
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<Self, DatasetError> {
        let mut dataset = Self::new(columns);
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    /// Column names in sheet order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `column` in the header.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Returns the row at `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    /// Iterates over all rows in order.
    pub fn records(&self) -> impl DoubleEndedIterator<Item = Record<'_>> + '_ {
        self.rows.iter().map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    /// Iterates over one column's cells, earliest row first. Yields nothing
    /// when the column does not exist.
    pub fn column_values<'a>(
        &'a self,
        column: &str,
    ) -> impl DoubleEndedIterator<Item = &'a CellValue> + use<'a> {
        let index = self.column_index(column);
        self.rows
            .iter()
            .filter_map(move |row| index.and_then(|i| row.get(i)))
    }

    /// Distinct non-blank display values of a column in first-seen order.
    #[must_use]
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        let mut seen = std::collections::BTreeSet::new();
        self.column_values(column)
            .filter(|v| !v.is_blank())
            .map(ToString::to_string)
            .filter(|v| seen.insert(v.clone()))
            .collect()
    }

    /// Appends a row. Short rows are padded with [`CellValue::Empty`].
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::RowWidth`] if the row has more cells than
    /// the dataset has columns.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) -> Result<(), DatasetError> {
        if row.len() > self.columns.len() {
            return Err(DatasetError::RowWidth {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        row.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(row);
        Ok(())
    }
}

/// A borrowed view of one dataset row.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [CellValue],
}

impl<'a> Record<'a> {
    /// Returns the cell for `column`, if the column exists.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a CellValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Iterates over `(column, value)` pairs in sheet order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a CellValue)> + use<'a> {
        let columns: &'a [String] = self.columns;
        let values: &'a [CellValue] = self.values;
        columns.iter().map(String::as_str).zip(values.iter())
    }

    /// Cells in sheet order.
    #[must_use]
    pub const fn values(&self) -> &'a [CellValue] {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::with_rows(
            vec!["Nama".to_string(), "Penyulang".to_string()],
            vec![
                vec!["A".into(), "Matos".into()],
                vec!["B".into(), CellValue::Empty],
                vec!["C".into(), "Kebalen".into()],
                vec!["D".into(), "Matos".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn pads_short_rows() {
        let mut ds = Dataset::new(vec!["a".to_string(), "b".to_string()]);
        ds.push_row(vec!["x".into()]).unwrap();
        assert_eq!(ds.row(0).unwrap().get("b"), Some(&CellValue::Empty));
    }

    #[test]
    fn rejects_wide_rows() {
        let mut ds = Dataset::new(vec!["a".to_string()]);
        let err = ds.push_row(vec!["x".into(), "y".into()]).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::RowWidth {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn distinct_values_keep_first_seen_order() {
        assert_eq!(sample().distinct_values("Penyulang"), vec!["Matos", "Kebalen"]);
        assert!(sample().distinct_values("Missing").is_empty());
    }

    #[test]
    fn integral_numbers_display_without_fraction() {
        assert_eq!(CellValue::Number(42.0).to_string(), "42");
        assert_eq!(CellValue::Number(-7.938_135_33).to_string(), "-7.93813533");
        assert_eq!(CellValue::Number(f64::NAN).to_string(), "");
    }

    #[test]
    fn blank_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text("  ".to_string()).is_blank());
        assert!(CellValue::Number(f64::NAN).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
        assert!(!CellValue::Text("0".to_string()).is_blank());
    }

    #[test]
    fn record_lookup_by_column() {
        let ds = sample();
        let row = ds.row(2).unwrap();
        assert_eq!(row.get("Nama"), Some(&CellValue::Text("C".to_string())));
        assert_eq!(row.get("Nope"), None);
        assert_eq!(row.iter().count(), 2);
    }
}
