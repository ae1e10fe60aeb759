//! Marker fill, shape, and border rules.
//!
//! Every rule is total: missing columns and unrecognized values fall back
//! to a fixed default instead of failing.

use risk_map_dataset::Record;
use risk_map_risk_models::{DEFAULT_COLOR, is_valid_hex, risk_to_color_hex};
use serde::{Deserialize, Serialize};

use crate::MapColumns;

/// Border used when the wrapping indicator says nothing.
pub const DEFAULT_BORDER: &str = "#000000";

/// Marker outline shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    /// Round marker.
    #[default]
    Circle,
    /// Square marker.
    Square,
}

/// Shape from the letter indicator value.
#[must_use]
pub fn shape_for(indicator: Option<&str>) -> MarkerShape {
    let value = indicator.unwrap_or("").trim().to_lowercase();
    if value.contains("surat himbauan") {
        MarkerShape::Square
    } else {
        MarkerShape::Circle
    }
}

/// Border color from the wrapping indicator value.
#[must_use]
pub fn border_for(indicator: Option<&str>) -> &'static str {
    let value = indicator.unwrap_or("").trim().to_lowercase();
    if value.contains("pengiriman usulan") {
        "#ff6b35"
    } else if value.contains("realisasi pembungkusan") {
        "#28a745"
    } else if value.contains("belum ada tindak lanjut") {
        "#dc3545"
    } else {
        DEFAULT_BORDER
    }
}

fn cell_text(record: &Record<'_>, column: Option<&str>) -> Option<String> {
    column
        .and_then(|c| record.get(c))
        .map(|v| v.display_trimmed())
        .filter(|v| !v.is_empty())
}

/// Fill color for a row, in priority order: the row's own color column,
/// the caller's preferred color column, the risk level, then
/// [`DEFAULT_COLOR`]. Only valid hex values are accepted at each step.
#[must_use]
pub fn fill_for(record: &Record<'_>, columns: &MapColumns) -> String {
    [
        columns.row_color.as_deref(),
        columns.preferred_color.as_deref(),
    ]
    .into_iter()
    .filter_map(|column| cell_text(record, column))
    .find(|v| is_valid_hex(v))
    .or_else(|| {
        cell_text(record, columns.level.as_deref())
            .map(|level| risk_to_color_hex(&level, DEFAULT_COLOR).to_string())
    })
    .unwrap_or_else(|| DEFAULT_COLOR.to_string())
}

/// Shape, border, and fill for a row.
#[must_use]
pub fn style_for(record: &Record<'_>, columns: &MapColumns) -> (MarkerShape, &'static str, String) {
    let surat = cell_text(record, columns.letter_indicator.as_deref());
    let bungkus = cell_text(record, columns.wrapping_indicator.as_deref());
    (
        shape_for(surat.as_deref()),
        border_for(bungkus.as_deref()),
        fill_for(record, columns),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_map_columns::Schema;
    use risk_map_dataset::{CellValue, Dataset};

    fn dataset(columns: &[&str], row: Vec<CellValue>) -> Dataset {
        Dataset::with_rows(columns.iter().map(ToString::to_string).collect(), vec![row]).unwrap()
    }

    fn fill(data: &Dataset, preferred: &str) -> String {
        let columns = MapColumns::locate(&Schema::classify(data.columns()), preferred);
        fill_for(&data.row(0).unwrap(), &columns)
    }

    #[test]
    fn shapes() {
        assert_eq!(shape_for(Some("Surat Himbauan")), MarkerShape::Square);
        assert_eq!(shape_for(Some("Selesai Surat Ke Muspika")), MarkerShape::Circle);
        assert_eq!(shape_for(Some("lainnya")), MarkerShape::Circle);
        assert_eq!(shape_for(None), MarkerShape::Circle);
    }

    #[test]
    fn borders() {
        assert_eq!(border_for(Some("Belum ada Tindak lanjut Bungkus")), "#dc3545");
        assert_eq!(
            border_for(Some("Pengiriman Usulan Pembungkusan Kabel")),
            "#ff6b35"
        );
        assert_eq!(border_for(Some("Realisasi pembungkusan")), "#28a745");
        assert_eq!(border_for(Some("")), "#000000");
        assert_eq!(border_for(None), "#000000");
    }

    #[test]
    fn level_drives_fill_without_color_column() {
        let data = dataset(&["Level Resiko"], vec!["Medium".into()]);
        assert_eq!(fill(&data, "Color"), "#f2e804");
    }

    #[test]
    fn explicit_color_wins() {
        let data = dataset(
            &["Level Resiko", "Warna"],
            vec!["Medium".into(), "#abc".into()],
        );
        assert_eq!(fill(&data, "Color"), "#abc");
    }

    #[test]
    fn invalid_color_falls_through() {
        let data = dataset(
            &["Level Resiko", "Color", "Marker"],
            vec!["High".into(), "merah".into(), "#123456".into()],
        );
        assert_eq!(fill(&data, "Marker"), "#123456");
        assert_eq!(fill(&data, "Color"), "#ffaa00");
    }

    #[test]
    fn default_fill() {
        let data = dataset(&["Nama"], vec!["Budi".into()]);
        assert_eq!(fill(&data, "Color"), "#3388ff");
    }
}
