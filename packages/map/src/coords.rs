//! Per-row coordinate resolution and centroid.

use std::sync::LazyLock;

use regex::Regex;
use risk_map_dataset::{CellValue, Record};

use crate::MapColumns;

static FLOAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?[0-9]+(?:\.[0-9]+)?").expect("valid regex"));

/// Extracts the first two floats from free text such as `"-7.9, 112.6"` or
/// `"lat -7.9 lon 112.6"`.
#[must_use]
pub fn parse_coordinate_field(text: &str) -> Option<(f64, f64)> {
    let mut floats = FLOAT_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok());
    let lat = floats.next()?;
    let lon = floats.next()?;
    Some((lat, lon))
}

fn cell_f64(cell: Option<&CellValue>) -> Option<f64> {
    cell.and_then(CellValue::as_f64).filter(|v| v.is_finite())
}

/// Resolves a row's position.
///
/// Dedicated latitude/longitude columns win. If either is blank, two
/// floats are parsed out of the combined coordinate column instead. Rows
/// yielding no complete pair return `None`.
#[must_use]
pub fn resolve(record: &Record<'_>, columns: &MapColumns) -> Option<(f64, f64)> {
    let lat = columns.latitude.as_deref().and_then(|c| record.get(c));
    let lon = columns.longitude.as_deref().and_then(|c| record.get(c));

    let lat_blank = lat.is_none_or(CellValue::is_blank);
    let lon_blank = lon.is_none_or(CellValue::is_blank);

    if (lat_blank || lon_blank)
        && let Some(parsed) = columns
            .coordinate
            .as_deref()
            .and_then(|c| record.get(c))
            .and_then(|cell| parse_coordinate_field(&cell.to_string()))
    {
        return Some(parsed);
    }

    Some((cell_f64(lat)?, cell_f64(lon)?))
}

/// Arithmetic mean of `points`, or `(0, 0)` when there are none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(points: &[(f64, f64)]) -> (f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let n = points.len() as f64;
    let (lat_sum, lon_sum) = points
        .iter()
        .fold((0.0, 0.0), |(a, b), (lat, lon)| (a + lat, b + lon));
    (lat_sum / n, lon_sum / n)
}
