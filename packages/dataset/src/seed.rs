//! CSV seed loading for running against an in-memory store.
//!
//! The first record is the header row. Blank cells become `null`; all
//! other cells are kept as strings, the same shape a sheet export has.

use std::path::Path;

use crate::{DatasetError, RawTable};

/// Reads a CSV file into a [`RawTable`].
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be read, is not valid CSV,
/// or has no header row.
pub fn load_csv(path: &Path) -> Result<RawTable, DatasetError> {
    let bytes = std::fs::read(path)?;
    let table = parse_csv(&bytes)?;
    log::info!(
        "Loaded {} seed rows from {}",
        table.rows.len(),
        path.display()
    );
    Ok(table)
}

/// Parses CSV bytes into a [`RawTable`].
///
/// # Errors
///
/// Returns [`DatasetError`] if the input is not valid CSV or has no header
/// row.
pub fn parse_csv(bytes: &[u8]) -> Result<RawTable, DatasetError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(DatasetError::Seed {
            message: "CSV file contains no header row".to_owned(),
        });
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row = record
            .iter()
            .take(headers.len())
            .map(|cell| {
                let cell = cell.trim();
                if cell.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(cell.to_owned())
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let csv = b"Nama,Koordinat,Level Resiko\nBudi,\"-7.93813533, 112.6332461\",Medium\nSari,,\n";
        let table = parse_csv(csv).unwrap();
        assert_eq!(table.headers, vec!["Nama", "Koordinat", "Level Resiko"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[0][1],
            serde_json::Value::String("-7.93813533, 112.6332461".to_string())
        );
        assert_eq!(table.rows[1][1], serde_json::Value::Null);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse_csv(b"").is_err());
    }
}
