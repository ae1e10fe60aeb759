//! Form layout derived from the dataset schema.
//!
//! The layout is a plain description of controls; turning it into HTML or
//! JSON is left to the caller.

use chrono::NaiveDate;
use risk_map_columns::{ColumnRole, Schema, dates, hint::last_value_hint, options::options_for};
use risk_map_dataset::Dataset;
use risk_map_risk_models::{DEFAULT_COLOR, risk_to_color_hex};
use serde::{Deserialize, Serialize};

use crate::COORDINATE_EXAMPLE;
use crate::upload::ALLOWED_EXTENSIONS;

/// Label of the single coordinate input.
pub const COORDINATE_LABEL: &str = "Koordinat (Latitude, Longitude)";

/// An input control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Control {
    /// Drop-down with a fixed option list.
    #[serde(rename_all = "camelCase")]
    Select {
        /// Options in display order.
        options: Vec<String>,
        /// Preselected option.
        default: Option<String>,
    },
    /// Date picker. The default is formatted as `DD/MM/YYYY`.
    #[serde(rename_all = "camelCase")]
    Date {
        /// Preselected date.
        default: String,
    },
    /// Free text.
    #[serde(rename_all = "camelCase")]
    Text {
        /// Help text, e.g. the last number entered.
        help: Option<String>,
    },
    /// File upload.
    #[serde(rename_all = "camelCase")]
    File {
        /// Accepted extensions.
        accept: Vec<String>,
    },
}

/// One rendered column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    /// Column name, used as both label and submission key.
    pub column: String,
    /// Role the control was derived from.
    pub role: ColumnRole,
    /// Control to show.
    pub control: Control,
}

/// The level selector, rendered once above the other fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelField {
    /// Name of the level column.
    pub column: String,
    /// Level options. No option is preselected.
    pub options: Vec<String>,
    /// Color each option maps to, in option order.
    pub colors: Vec<String>,
}

/// The coordinate input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateField {
    /// Label.
    pub label: String,
    /// Example value shown as a placeholder.
    pub example: String,
}

/// Full form layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormLayout {
    /// Level selector, if the dataset has a level column.
    pub level: Option<LevelField>,
    /// Combined coordinate input.
    pub coordinate: CoordinateField,
    /// Remaining columns in sheet order.
    pub fields: Vec<FormField>,
}

/// Lays out one control per column.
///
/// The level column and derived columns (coordinate, latitude, longitude,
/// color) get no per-column control.
#[must_use]
pub fn render_form(schema: &Schema, dataset: &Dataset, today: NaiveDate) -> FormLayout {
    let level = schema.level_column().map(|column| {
        let options = options_for(ColumnRole::Level, column, dataset).unwrap_or_default();
        let colors = options
            .iter()
            .map(|o| risk_to_color_hex(o, DEFAULT_COLOR).to_string())
            .collect();
        LevelField {
            column: column.to_string(),
            options,
            colors,
        }
    });

    let fields = schema
        .columns()
        .iter()
        .filter_map(|column| {
            let control = match column.role {
                ColumnRole::Level | ColumnRole::Derived(_) => return None,
                ColumnRole::Documentation => Control::File {
                    accept: ALLOWED_EXTENSIONS.iter().map(ToString::to_string).collect(),
                },
                ColumnRole::Feeder | ColumnRole::Indicator(_) => {
                    let options = options_for(column.role, &column.name, dataset).unwrap_or_default();
                    Control::Select {
                        default: options.first().cloned(),
                        options,
                    }
                }
                ColumnRole::Date => Control::Date {
                    default: dates::format_for_sheet(today),
                },
                ColumnRole::Number => Control::Text {
                    help: Some(format!(
                        "Nomor terakhir: {}",
                        last_value_hint(dataset, &column.name)
                    )),
                },
                ColumnRole::Plain => Control::Text { help: None },
            };
            Some(FormField {
                column: column.name.clone(),
                role: column.role,
                control,
            })
        })
        .collect();

    FormLayout {
        level,
        coordinate: CoordinateField {
            label: COORDINATE_LABEL.to_string(),
            example: COORDINATE_EXAMPLE.to_string(),
        },
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_map_dataset::CellValue;
    use risk_map_risk_models::IndicatorFamily;

    fn dataset() -> Dataset {
        Dataset::with_rows(
            [
                "No",
                "Level Resiko",
                "Koordinat",
                "Color",
                "Penyulang",
                "Indikator Bungkus",
                "Tanggal",
                "Dokumentasi",
                "Catatan",
            ]
            .map(ToString::to_string)
            .to_vec(),
            vec![
                vec![
                    "A-7".into(),
                    "Critical".into(),
                    CellValue::Empty,
                    CellValue::Empty,
                    "Kebalen".into(),
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                ],
                vec![CellValue::Number(0.0)],
            ],
        )
        .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    #[test]
    fn skips_level_and_derived_columns() {
        let data = dataset();
        let layout = render_form(&Schema::classify(data.columns()), &data, today());
        let columns: Vec<_> = layout.fields.iter().map(|f| f.column.as_str()).collect();
        assert_eq!(
            columns,
            vec!["No", "Penyulang", "Indikator Bungkus", "Tanggal", "Dokumentasi", "Catatan"]
        );
    }

    #[test]
    fn level_options_include_existing_values() {
        let data = dataset();
        let layout = render_form(&Schema::classify(data.columns()), &data, today());
        let level = layout.level.unwrap();
        assert_eq!(level.column, "Level Resiko");
        assert_eq!(
            level.options,
            vec!["Lower", "Low", "Medium", "High", "Emergency", "Critical"]
        );
        assert_eq!(level.colors[2], "#f2e804");
        assert_eq!(level.colors[5], "#3388ff");
    }

    #[test]
    fn controls_follow_roles() {
        let data = dataset();
        let layout = render_form(&Schema::classify(data.columns()), &data, today());
        let by_column = |name: &str| {
            layout
                .fields
                .iter()
                .find(|f| f.column == name)
                .unwrap()
                .control
                .clone()
        };

        assert_eq!(
            by_column("No"),
            Control::Text {
                help: Some("Nomor terakhir: A-7 (angka: 7)".to_string())
            }
        );
        assert_eq!(
            by_column("Penyulang"),
            Control::Select {
                options: vec!["Dinoyo".to_string(), "Matos".to_string(), "Kebalen".to_string()],
                default: Some("Dinoyo".to_string()),
            }
        );
        assert_eq!(
            by_column("Tanggal"),
            Control::Date {
                default: "07/03/2025".to_string()
            }
        );
        match by_column("Indikator Bungkus") {
            Control::Select { options, .. } => assert_eq!(
                options.len(),
                IndicatorFamily::Bungkus.default_options().len()
            ),
            other => panic!("unexpected control {other:?}"),
        }
        assert!(matches!(by_column("Dokumentasi"), Control::File { .. }));
    }
}
