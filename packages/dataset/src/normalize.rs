//! Raw store output to typed dataset conversion.
//!
//! The store hands back loosely typed JSON cells. Normalization coerces
//! them into [`CellValue`]s so downstream code never has to guess: numbers
//! stay numbers, text stays text, and a handful of known columns get forced
//! into a fixed type.

use crate::{CellValue, Dataset, RawTable, format_number};

/// Columns always kept as trimmed text, even when the sheet stores a
/// number.
pub const FORCE_STRING_COLUMNS: &[&str] = &["Nomer Surat Permohonan Pembungkusan"];

/// Columns coerced to numbers. A decimal comma is accepted.
pub const NUMERIC_COORDINATE_COLUMNS: &[&str] = &["Latitude", "Longitude"];

/// Converts a raw table into a [`Dataset`].
///
/// Short rows are padded with empty cells and cells beyond the header are
/// dropped, so this never fails.
#[must_use]
pub fn normalize(raw: &RawTable) -> Dataset {
    let mut dataset = Dataset::new(raw.headers.clone());

    for raw_row in &raw.rows {
        let row: Vec<CellValue> = raw
            .headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = raw_row.get(i).unwrap_or(&serde_json::Value::Null);
                normalize_cell(header, cell)
            })
            .collect();

        if let Err(e) = dataset.push_row(row) {
            log::warn!("Dropping malformed row during normalization: {e}");
        }
    }

    log::debug!(
        "Normalized {} rows x {} columns",
        dataset.len(),
        dataset.columns().len()
    );

    dataset
}

/// Normalizes a single cell according to its column.
#[must_use]
pub fn normalize_cell(column: &str, cell: &serde_json::Value) -> CellValue {
    if FORCE_STRING_COLUMNS.contains(&column) {
        return match json_to_text(cell) {
            Some(text) => CellValue::Text(text.trim().to_string()),
            None => CellValue::Empty,
        };
    }

    if NUMERIC_COORDINATE_COLUMNS.contains(&column) {
        return coerce_number(cell);
    }

    match cell {
        serde_json::Value::Null => CellValue::Empty,
        serde_json::Value::Number(n) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
        serde_json::Value::String(s) => CellValue::Text(s.clone()),
        other => json_to_text(other).map_or(CellValue::Empty, CellValue::Text),
    }
}

/// Coerces a cell to a number, replacing a decimal comma with a dot.
/// Anything unparseable becomes [`CellValue::Empty`].
fn coerce_number(cell: &serde_json::Value) -> CellValue {
    match cell {
        serde_json::Value::Number(n) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
        serde_json::Value::String(s) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_or(CellValue::Empty, CellValue::Number),
        _ => CellValue::Empty,
    }
}

fn json_to_text(cell: &serde_json::Value) -> Option<String> {
    match cell {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        serde_json::Value::Number(n) => Some(n.as_f64().map_or_else(|| n.to_string(), format_number)),
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Returns a copy suited for tabular preview: a literal `0` in a
/// forced-string column is shown blank.
#[must_use]
pub fn pretty(dataset: &Dataset) -> Dataset {
    let forced: Vec<usize> = FORCE_STRING_COLUMNS
        .iter()
        .filter_map(|c| dataset.column_index(c))
        .collect();

    let mut out = Dataset::new(dataset.columns().to_vec());
    for record in dataset.records() {
        let row = record
            .values()
            .iter()
            .enumerate()
            .map(|(i, value)| {
                if forced.contains(&i) && value.display_trimmed() == "0" {
                    CellValue::Empty
                } else {
                    value.clone()
                }
            })
            .collect();
        if let Err(e) = out.push_row(row) {
            log::warn!("Failed to copy row for preview: {e}");
        }
    }
    out
}
