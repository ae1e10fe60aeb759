//! Row assembly in sheet column order.
//!
//! Both the remote row and its local mirror are driven by the same
//! [`Schema`], so a column's role is decided exactly once.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use risk_map_columns::{ColumnRole, DerivedField, Schema, dates};
use risk_map_dataset::CellValue;

use crate::Submission;

/// Values resolved during a submission that are not plain user text.
#[derive(Debug, Clone, Copy)]
pub struct RowInputs<'a> {
    /// Chosen level, trimmed.
    pub level: &'a str,
    /// Parsed coordinates.
    pub coordinates: Option<(f64, f64)>,
    /// Risk-derived hex color.
    pub color: &'a str,
    /// Uploaded file URLs by column.
    pub uploaded: &'a BTreeMap<String, String>,
    /// Fallback for blank or unparseable dates.
    pub today: NaiveDate,
    /// Write dedicated latitude/longitude columns too.
    pub write_split_coordinates: bool,
}

/// `"{lat}, {lon}"` as written to the combined column.
#[must_use]
pub fn format_coordinates((lat, lon): (f64, f64)) -> String {
    format!("{lat}, {lon}")
}

/// Builds the row appended to the store.
///
/// Dedicated latitude/longitude columns stay empty unless
/// [`RowInputs::write_split_coordinates`] is set.
#[must_use]
pub fn assemble_row(schema: &Schema, submission: &Submission, inputs: &RowInputs<'_>) -> Vec<String> {
    schema
        .columns()
        .iter()
        .map(|column| match column.role {
            ColumnRole::Level => inputs.level.to_string(),
            ColumnRole::Derived(DerivedField::Coordinate) => inputs
                .coordinates
                .map(format_coordinates)
                .unwrap_or_default(),
            ColumnRole::Derived(DerivedField::Color) => inputs.color.to_string(),
            ColumnRole::Derived(DerivedField::Latitude) => inputs
                .coordinates
                .filter(|_| inputs.write_split_coordinates)
                .map(|(lat, _)| lat.to_string())
                .unwrap_or_default(),
            ColumnRole::Derived(DerivedField::Longitude) => inputs
                .coordinates
                .filter(|_| inputs.write_split_coordinates)
                .map(|(_, lon)| lon.to_string())
                .unwrap_or_default(),
            ColumnRole::Documentation => inputs
                .uploaded
                .get(&column.name)
                .cloned()
                .unwrap_or_default(),
            ColumnRole::Date => dates::format_for_sheet(dates::parse_date_or(
                submission.value(&column.name),
                inputs.today,
            )),
            ColumnRole::Feeder | ColumnRole::Indicator(_) | ColumnRole::Number | ColumnRole::Plain => {
                submission.value(&column.name).to_string()
            }
        })
        .collect()
}

/// Builds the typed row mirrored into the in-memory dataset.
///
/// Unlike the remote row, latitude and longitude are always stored as
/// numbers so the map picks the point up directly.
#[must_use]
pub fn mirror_row(schema: &Schema, submission: &Submission, inputs: &RowInputs<'_>) -> Vec<CellValue> {
    let remote = assemble_row(schema, submission, inputs);
    schema
        .columns()
        .iter()
        .zip(remote)
        .map(|(column, value)| match column.role {
            ColumnRole::Derived(DerivedField::Latitude) => inputs
                .coordinates
                .map_or(CellValue::Empty, |(lat, _)| CellValue::Number(lat)),
            ColumnRole::Derived(DerivedField::Longitude) => inputs
                .coordinates
                .map_or(CellValue::Empty, |(_, lon)| CellValue::Number(lon)),
            _ if value.is_empty() => CellValue::Empty,
            _ => CellValue::Text(value),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::classify(
            &["Level Resiko", "Koordinat", "Lat", "Lon", "Warna", "Dokumentasi", "Tgl", "Nama"]
                .map(ToString::to_string),
        )
    }

    fn inputs<'a>(uploaded: &'a BTreeMap<String, String>, split: bool) -> RowInputs<'a> {
        RowInputs {
            level: "High",
            coordinates: Some((-7.5, 112.25)),
            color: "#ffaa00",
            uploaded,
            today: NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(),
            write_split_coordinates: split,
        }
    }

    fn submission() -> Submission {
        let mut submission = Submission::default();
        submission
            .values
            .insert("Nama".to_string(), "Sari".to_string());
        submission
    }

    #[test]
    fn assembles_in_sheet_order() {
        let mut uploaded = BTreeMap::new();
        uploaded.insert("Dokumentasi".to_string(), "memory://blobs/1".to_string());

        let row = assemble_row(&schema(), &submission(), &inputs(&uploaded, false));
        assert_eq!(
            row,
            vec![
                "High",
                "-7.5, 112.25",
                "",
                "",
                "#ffaa00",
                "memory://blobs/1",
                "07/03/2025",
                "Sari"
            ]
        );
    }

    #[test]
    fn split_coordinates_are_opt_in() {
        let uploaded = BTreeMap::new();
        let row = assemble_row(&schema(), &submission(), &inputs(&uploaded, true));
        assert_eq!(row[2], "-7.5");
        assert_eq!(row[3], "112.25");
        assert_eq!(row[5], "");
    }

    #[test]
    fn mirror_stores_numeric_coordinates() {
        let uploaded = BTreeMap::new();
        let row = mirror_row(&schema(), &submission(), &inputs(&uploaded, false));
        assert_eq!(row[2], CellValue::Number(-7.5));
        assert_eq!(row[3], CellValue::Number(112.25));
        assert_eq!(row[5], CellValue::Empty);
        assert_eq!(row[7], CellValue::from("Sari"));
    }
}
