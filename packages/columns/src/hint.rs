//! "Last value" hint shown next to number inputs.

use std::sync::LazyLock;

use regex::Regex;
use risk_map_dataset::Dataset;

/// Hint shown when a column has no usable value yet.
pub const NO_DATA_HINT: &str = "Belum ada data";

static DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// Values that count as "nothing entered".
const PLACEHOLDERS: &[&str] = &["", "nan", "none", "0"];

/// Describes the most recently entered value of `column`.
///
/// Scans from the last row toward the first, skipping blanks and
/// placeholder values. When the value embeds a run of digits, the last run
/// is reported alongside it. Returns [`NO_DATA_HINT`] when nothing
/// qualifies.
#[must_use]
pub fn last_value_hint(dataset: &Dataset, column: &str) -> String {
    dataset
        .column_values(column)
        .rev()
        .map(|v| v.display_trimmed())
        .find(|v| !PLACEHOLDERS.contains(&v.to_lowercase().as_str()))
        .map_or_else(
            || NO_DATA_HINT.to_string(),
            |value| {
                let digits = DIGITS_RE
                    .find_iter(&value)
                    .last()
                    .map(|m| m.as_str().to_string());
                match digits {
                    Some(digits) => format!("{value} (angka: {digits})"),
                    None => value,
                }
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_map_dataset::CellValue;

    fn dataset(values: Vec<CellValue>) -> Dataset {
        Dataset::with_rows(
            vec!["No Urut".to_string()],
            values.into_iter().map(|v| vec![v]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn reports_latest_value_with_digits() {
        let ds = dataset(vec!["A-001".into(), "A-002".into()]);
        assert_eq!(last_value_hint(&ds, "No Urut"), "A-002 (angka: 002)");
    }

    #[test]
    fn skips_placeholders() {
        let ds = dataset(vec![
            "17".into(),
            CellValue::Empty,
            "nan".into(),
            "None".into(),
            "0".into(),
            CellValue::Number(0.0),
        ]);
        assert_eq!(last_value_hint(&ds, "No Urut"), "17 (angka: 17)");
    }

    #[test]
    fn non_numeric_value_is_returned_as_is() {
        let ds = dataset(vec!["tanpa nomor".into()]);
        assert_eq!(last_value_hint(&ds, "No Urut"), "tanpa nomor");
    }

    #[test]
    fn empty_column_reports_sentinel() {
        let ds = dataset(vec![CellValue::Empty]);
        assert_eq!(last_value_hint(&ds, "No Urut"), NO_DATA_HINT);
        assert_eq!(last_value_hint(&ds, "Missing"), NO_DATA_HINT);
    }
}
