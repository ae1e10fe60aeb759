#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Record form controller.
//!
//! One submission runs through a fixed sequence:
//!
//! 1. [`render::render_form`] lays out one control per column from the
//!    dataset's [`Schema`].
//! 2. [`FormController::submit`] validates the level selection, parses the
//!    free-text coordinates, resolves uploads through a [`BlobStore`],
//!    assembles a row in sheet column order, appends it to the
//!    [`TabularStore`], and mirrors a typed copy into the in-memory
//!    [`Dataset`].
//!
//! A missing level aborts before anything is written. Upload failures and
//! malformed coordinates only degrade their own columns and are reported
//! as [`Notice`]s.

pub mod render;
pub mod row;
pub mod upload;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use risk_map_columns::{ColumnRole, Schema, dates};
use risk_map_dataset::Dataset;
use risk_map_risk_models::{DEFAULT_COLOR, risk_to_color_hex};
use risk_map_sheets::{BlobStore, StoreError, TabularStore, WriteMode};
use serde::{Deserialize, Serialize};

pub use upload::UploadError;

/// Example shown in the coordinate input.
pub const COORDINATE_EXAMPLE: &str = "-7.93813533, 112.6332461";

/// Problems with the submitted values themselves.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The dataset has a level column but no level was chosen.
    #[error("Silakan pilih {column} terlebih dahulu")]
    MissingLevel {
        /// Name of the level column.
        column: String,
    },

    /// The coordinate text is not `"lat, lon"`.
    #[error(
        "Format koordinat salah: '{input}'. Gunakan Latitude, Longitude (misal: -7.93813533, 112.6332461)"
    )]
    CoordinateFormat {
        /// Text as entered.
        input: String,
    },

    /// The sheet has no header row, so there is nothing to fill in.
    #[error("Sheet tidak memiliki header kolom")]
    NoColumns,
}

/// Errors that abort a submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Submitted values were rejected; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The row could not be appended to the store.
    #[error("Failed to append row: {0}")]
    Store(#[from] StoreError),
}

/// A file attached to a documentation column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// File name as provided by the client.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Everything a user entered in one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    /// Chosen risk level.
    pub level: Option<String>,
    /// Free-text `"lat, lon"`.
    pub coordinates: Option<String>,
    /// Entered text keyed by column name.
    pub values: BTreeMap<String, String>,
    /// Attached files keyed by documentation column name.
    pub uploads: BTreeMap<String, Upload>,
}

impl Submission {
    /// Entered text for `column`, or an empty string.
    #[must_use]
    pub fn value(&self, column: &str) -> &str {
        self.values.get(column).map_or("", String::as_str)
    }

    /// The chosen level with surrounding whitespace removed, if non-blank.
    #[must_use]
    pub fn level(&self) -> Option<&str> {
        self.level
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

/// What a non-fatal notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Coordinates were malformed and dropped.
    CoordinateFormat,
    /// A file upload failed and its column was left empty.
    Upload,
    /// The row was appended remotely but the local copy was not updated.
    LocalMirror,
}

/// A non-fatal problem reported alongside a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    /// Category.
    pub kind: NoticeKind,
    /// Affected column, when there is one.
    pub column: Option<String>,
    /// Human-readable description.
    pub message: String,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    /// Row as appended to the store, in sheet column order.
    pub row: Vec<String>,
    /// Parsed coordinates, if any.
    pub coordinates: Option<(f64, f64)>,
    /// Risk-derived fill color.
    pub color: String,
    /// Public URLs of successfully uploaded files, by column.
    pub uploaded: BTreeMap<String, String>,
    /// Date columns and the values written to them.
    pub date_summary: Vec<(String, String)>,
    /// Non-fatal problems.
    pub notices: Vec<Notice>,
    /// Whether the in-memory dataset received the row.
    pub mirrored: bool,
}

/// Parses `"lat, lon"` free text.
///
/// Blank input means no coordinates. The text is split on the first comma
/// and both halves are parsed as floats.
///
/// # Errors
///
/// Returns [`ValidationError::CoordinateFormat`] if either half is not a
/// number.
pub fn parse_coordinates(input: &str) -> Result<Option<(f64, f64)>, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let format_error = || ValidationError::CoordinateFormat {
        input: input.to_string(),
    };
    let (lat, lon) = input.split_once(',').ok_or_else(format_error)?;
    let lat: f64 = lat.trim().parse().map_err(|_| format_error())?;
    let lon: f64 = lon.trim().parse().map_err(|_| format_error())?;
    if !lat.is_finite() || !lon.is_finite() {
        return Err(format_error());
    }
    Ok(Some((lat, lon)))
}

/// Settings for [`FormController`].
#[derive(Debug, Clone)]
pub struct FormOptions {
    /// Parent folder for month folders in blob storage.
    pub main_folder_id: String,
    /// Directory for transient upload copies.
    pub staging_dir: PathBuf,
    /// Also write dedicated latitude/longitude columns. Off by default:
    /// only the combined coordinate column is written.
    pub write_split_coordinates: bool,
    /// How the store interprets appended values.
    pub write_mode: WriteMode,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            main_folder_id: String::new(),
            staging_dir: std::env::temp_dir().join("risk_map_uploads"),
            write_split_coordinates: false,
            write_mode: WriteMode::UserEntered,
        }
    }
}

/// Runs submissions against a store and blob storage.
pub struct FormController<'a> {
    store: &'a dyn TabularStore,
    blobs: &'a dyn BlobStore,
    options: &'a FormOptions,
}

impl<'a> FormController<'a> {
    /// Creates a controller.
    #[must_use]
    pub const fn new(
        store: &'a dyn TabularStore,
        blobs: &'a dyn BlobStore,
        options: &'a FormOptions,
    ) -> Self {
        Self {
            store,
            blobs,
            options,
        }
    }

    /// Runs one submission cycle against `dataset`.
    ///
    /// On success the row has been appended to the store and, unless the
    /// outcome says otherwise, to `dataset`.
    ///
    /// # Errors
    ///
    /// * [`SubmitError::Validation`] if the level is missing or the sheet
    ///   has no columns. Nothing is uploaded or written.
    /// * [`SubmitError::Store`] if the append fails. Files uploaded earlier
    ///   in the cycle are not removed.
    pub async fn submit(
        &self,
        dataset: &mut Dataset,
        submission: &Submission,
        today: NaiveDate,
    ) -> Result<SubmitOutcome, SubmitError> {
        let schema = Schema::classify(dataset.columns());
        if schema.is_empty() {
            return Err(ValidationError::NoColumns.into());
        }

        let level = submission.level().unwrap_or("");
        if let Some(column) = schema.level_column()
            && level.is_empty()
        {
            return Err(ValidationError::MissingLevel {
                column: column.to_string(),
            }
            .into());
        }

        let mut notices = Vec::new();

        let coordinates = match parse_coordinates(submission.coordinates.as_deref().unwrap_or("")) {
            Ok(coordinates) => coordinates,
            Err(e) => {
                log::warn!("{e}");
                notices.push(Notice {
                    kind: NoticeKind::CoordinateFormat,
                    column: None,
                    message: e.to_string(),
                });
                None
            }
        };

        let color = risk_to_color_hex(level, DEFAULT_COLOR).to_string();

        let uploaded = upload::resolve_uploads(
            self.blobs,
            self.options,
            &schema,
            submission,
            today,
            &mut notices,
        )
        .await;

        let inputs = row::RowInputs {
            level,
            coordinates,
            color: &color,
            uploaded: &uploaded,
            today,
            write_split_coordinates: self.options.write_split_coordinates,
        };
        let row = row::assemble_row(&schema, submission, &inputs);

        self.store.append_row(&row, self.options.write_mode).await?;
        log::info!("Appended submission with {} columns", row.len());

        let mirrored = match dataset.push_row(row::mirror_row(&schema, submission, &inputs)) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Row appended to store but local copy not updated: {e}");
                notices.push(Notice {
                    kind: NoticeKind::LocalMirror,
                    column: None,
                    message: format!(
                        "Baris sudah ditambahkan ke Sheets, namun tampilan lokal tidak diperbarui: {e}"
                    ),
                });
                false
            }
        };

        let date_summary = schema
            .names_with_role(ColumnRole::Date)
            .map(|column| {
                (
                    column.to_string(),
                    dates::format_for_sheet(dates::parse_date_or(submission.value(column), today)),
                )
            })
            .collect();

        Ok(SubmitOutcome {
            row,
            coordinates,
            color,
            uploaded,
            date_summary,
            notices,
            mirrored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_map_dataset::{CellValue, RawTable, normalize::normalize};
    use risk_map_sheets::memory::{MemoryBlobStore, MemoryStore};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    fn columns() -> Vec<String> {
        [
            "No",
            "Nama Pemilik",
            "Alamat",
            "Level Resiko",
            "Koordinat",
            "Latitude",
            "Longitude",
            "Color",
            "Penyulang",
            "Indikator Surat",
            "Tanggal Temuan",
            "Dokumentasi Foto",
            "Keterangan",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    fn submission() -> Submission {
        let mut values = BTreeMap::new();
        values.insert("No".to_string(), "12".to_string());
        values.insert("Nama Pemilik".to_string(), "Budi".to_string());
        values.insert("Alamat".to_string(), "Jl. Soekarno Hatta 1".to_string());
        values.insert("Penyulang".to_string(), "Matos".to_string());
        values.insert("Indikator Surat".to_string(), "Surat Himbauan".to_string());
        values.insert("Tanggal Temuan".to_string(), "2025-03-01".to_string());
        values.insert("Keterangan".to_string(), "Dahan dekat kabel".to_string());
        Submission {
            level: Some("Medium".to_string()),
            coordinates: Some(COORDINATE_EXAMPLE.to_string()),
            values,
            uploads: BTreeMap::new(),
        }
    }

    fn options() -> FormOptions {
        FormOptions {
            main_folder_id: "root".to_string(),
            staging_dir: std::env::temp_dir().join(format!("risk_map_form_{}", uuid::Uuid::new_v4())),
            ..FormOptions::default()
        }
    }

    #[test]
    fn parses_coordinates() {
        assert_eq!(
            parse_coordinates(" -7.93813533 , 112.6332461 ").unwrap(),
            Some((-7.938_135_33, 112.633_246_1))
        );
        assert_eq!(parse_coordinates("").unwrap(), None);
        assert!(parse_coordinates("-7.9").is_err());
        assert!(parse_coordinates("utara, selatan").is_err());
        assert!(parse_coordinates("-7.9, 112.6, 3").is_err());
    }

    #[tokio::test]
    async fn missing_level_aborts_without_writes() {
        let store = MemoryStore::new(RawTable::default());
        let blobs = MemoryBlobStore::new("memory://blobs");
        let options = options();
        let controller = FormController::new(&store, &blobs, &options);

        let mut dataset = Dataset::new(columns());
        let mut submission = submission();
        submission.level = Some("  ".to_string());
        submission.uploads.insert(
            "Dokumentasi Foto".to_string(),
            Upload {
                file_name: "a.png".to_string(),
                bytes: b"PNG".to_vec(),
            },
        );

        let err = controller
            .submit(&mut dataset, &submission, today())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::MissingLevel { ref column }) if column == "Level Resiko"
        ));
        assert_eq!(store.append_count(), 0);
        assert_eq!(blobs.file_count().await, 0);
        assert!(dataset.is_empty());
    }

    #[tokio::test]
    async fn appends_remotely_and_mirrors_locally() {
        let store = MemoryStore::new(RawTable {
            headers: columns(),
            rows: Vec::new(),
        });
        let blobs = MemoryBlobStore::new("memory://blobs");
        let options = options();
        let controller = FormController::new(&store, &blobs, &options);

        let mut dataset = Dataset::new(columns());
        let outcome = controller
            .submit(&mut dataset, &submission(), today())
            .await
            .unwrap();

        assert_eq!(store.append_count(), 1);
        assert!(outcome.mirrored);
        assert!(outcome.notices.is_empty());
        assert_eq!(outcome.color, "#f2e804");
        assert_eq!(
            outcome.date_summary,
            vec![("Tanggal Temuan".to_string(), "01/03/2025".to_string())]
        );

        let record = dataset.row(0).unwrap();
        assert_eq!(
            record.get("Latitude"),
            Some(&CellValue::Number(-7.938_135_33))
        );
        assert_eq!(
            record.get("Koordinat"),
            Some(&CellValue::from("-7.93813533, 112.6332461"))
        );

        let remote = store.snapshot().await;
        assert_eq!(remote.rows.len(), 1);
        assert_eq!(remote.rows[0][5], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn round_trip_preserves_entered_values() {
        let store = MemoryStore::new(RawTable {
            headers: columns(),
            rows: Vec::new(),
        });
        let blobs = MemoryBlobStore::new("memory://blobs");
        let options = options();
        let controller = FormController::new(&store, &blobs, &options);

        let mut dataset = Dataset::new(columns());
        let submission = submission();
        controller
            .submit(&mut dataset, &submission, today())
            .await
            .unwrap();

        let reread = normalize(&store.read_all_records().await.unwrap());
        let schema = Schema::classify(reread.columns());
        let record = reread.row(0).unwrap();

        for column in schema.columns() {
            let expected = match column.role {
                ColumnRole::Derived(_) | ColumnRole::Documentation => continue,
                ColumnRole::Level => "Medium".to_string(),
                ColumnRole::Date => "01/03/2025".to_string(),
                _ => submission.value(&column.name).to_string(),
            };
            assert_eq!(
                record.get(&column.name).map(ToString::to_string),
                Some(expected),
                "column {}",
                column.name
            );
        }
    }

    #[tokio::test]
    async fn malformed_coordinates_are_a_notice() {
        let store = MemoryStore::new(RawTable::default());
        let blobs = MemoryBlobStore::new("memory://blobs");
        let options = options();
        let controller = FormController::new(&store, &blobs, &options);

        let mut dataset = Dataset::new(columns());
        let mut submission = submission();
        submission.coordinates = Some("di dekat pasar".to_string());

        let outcome = controller
            .submit(&mut dataset, &submission, today())
            .await
            .unwrap();

        assert_eq!(outcome.coordinates, None);
        assert_eq!(outcome.notices.len(), 1);
        assert_eq!(outcome.notices[0].kind, NoticeKind::CoordinateFormat);
        assert_eq!(outcome.row[4], "");
        assert_eq!(store.append_count(), 1);
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let store = MemoryStore::unavailable();
        let blobs = MemoryBlobStore::new("memory://blobs");
        let options = options();
        let controller = FormController::new(&store, &blobs, &options);

        let mut dataset = Dataset::new(columns());
        let err = controller
            .submit(&mut dataset, &submission(), today())
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitError::Store(_)));
        assert!(dataset.is_empty());
    }

    #[tokio::test]
    async fn empty_header_is_rejected() {
        let store = MemoryStore::new(RawTable::default());
        let blobs = MemoryBlobStore::new("memory://blobs");
        let options = options();
        let controller = FormController::new(&store, &blobs, &options);

        let err = controller
            .submit(&mut Dataset::default(), &submission(), today())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::NoColumns)
        ));
    }
}
