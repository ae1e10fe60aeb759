//! Documentation upload resolution.
//!
//! Each attached file is staged to a local temporary path, uploaded into a
//! month folder under the main folder, and replaced by its public URL. A
//! failure only empties its own column.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use risk_map_columns::{ColumnRole, Schema};
use risk_map_sheets::{BlobError, BlobStore};

use crate::{FormOptions, Notice, NoticeKind, Submission, Upload};

/// File extensions accepted for documentation uploads.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Columns that name the owner of an observation, in preference order.
const OWNER_COLUMNS: &[&str] = &[
    "Nama Pemilik/Penanggungjawab",
    "Nama Pemilik",
    "Pemilik",
    "Penanggungjawab",
    "Nama",
    "Owner",
];

/// Columns that describe where an observation is, used when no owner is
/// given.
const ADDRESS_COLUMNS: &[&str] = &["Alamat", "Address", "Lokasi", "Location"];

const UNKNOWN_IDENTIFIER: &str = "Unknown";

/// Errors resolving a single upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The file type is not accepted.
    #[error("File type not allowed: {file_name} (accepted: jpg, jpeg, png)")]
    Extension {
        /// Offending file name.
        file_name: String,
    },

    /// The temporary local copy could not be written.
    #[error("Failed to stage upload: {0}")]
    Staging(#[from] std::io::Error),

    /// Blob storage rejected the folder lookup or the upload.
    #[error(transparent)]
    Blob(#[from] BlobError),
}

/// Returns `true` if `file_name` has an accepted extension.
#[must_use]
pub fn is_allowed_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| e.eq_ignore_ascii_case(allowed))
        })
}

/// Name of the month folder for `date`, e.g. `March`.
#[must_use]
pub fn month_folder_name(date: NaiveDate) -> String {
    date.format("%B").to_string()
}

/// Identifies the observation an upload belongs to: the first non-blank
/// owner column, else the first non-blank address column, else
/// `Unknown`. Characters unsafe in file names become `_`.
#[must_use]
pub fn upload_identifier(values: &BTreeMap<String, String>) -> String {
    let identifier = OWNER_COLUMNS
        .iter()
        .chain(ADDRESS_COLUMNS)
        .filter_map(|key| values.get(*key))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_IDENTIFIER);
    sanitize_file_name(identifier)
}

/// `{identifier}_{column}_{original}`.
#[must_use]
pub fn upload_file_name(values: &BTreeMap<String, String>, column: &str, original: &str) -> String {
    format!("{}_{column}_{original}", upload_identifier(values))
}

fn sanitize_file_name(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect()
}

/// Uploads every attached file for a documentation column.
///
/// Returns the public URL per column for successful uploads. Failures are
/// logged, pushed to `notices`, and leave the column out of the result.
pub async fn resolve_uploads(
    blobs: &dyn BlobStore,
    options: &FormOptions,
    schema: &Schema,
    submission: &Submission,
    today: NaiveDate,
    notices: &mut Vec<Notice>,
) -> BTreeMap<String, String> {
    let mut uploaded = BTreeMap::new();

    for column in schema.names_with_role(ColumnRole::Documentation) {
        let Some(upload) = submission.uploads.get(column) else {
            continue;
        };

        let display_name = upload_file_name(&submission.values, column, &upload.file_name);
        match upload_one(blobs, options, upload, &display_name, today).await {
            Ok(url) => {
                log::info!("Uploaded {column} as {display_name}");
                uploaded.insert(column.to_string(), url);
            }
            Err(e) => {
                log::warn!("Upload for {column} failed: {e}");
                notices.push(Notice {
                    kind: NoticeKind::Upload,
                    column: Some(column.to_string()),
                    message: format!(
                        "File {column} gagal diupload. Data akan disimpan tanpa lampiran. ({e})"
                    ),
                });
            }
        }
    }

    for column in submission.uploads.keys() {
        if schema.role_of(column) != Some(ColumnRole::Documentation) {
            log::debug!("Ignoring upload for non-documentation column {column}");
        }
    }

    uploaded
}

async fn upload_one(
    blobs: &dyn BlobStore,
    options: &FormOptions,
    upload: &Upload,
    display_name: &str,
    today: NaiveDate,
) -> Result<String, UploadError> {
    if !is_allowed_file(&upload.file_name) {
        return Err(UploadError::Extension {
            file_name: upload.file_name.clone(),
        });
    }

    let staged = stage(&options.staging_dir, upload).await?;
    let result = transfer(blobs, &options.main_folder_id, &staged, display_name, today).await;

    if let Err(e) = tokio::fs::remove_file(&staged).await {
        log::warn!("Failed to remove staged upload {}: {e}", staged.display());
    }

    result.map_err(UploadError::from)
}

async fn transfer(
    blobs: &dyn BlobStore,
    main_folder_id: &str,
    staged: &Path,
    display_name: &str,
    today: NaiveDate,
) -> Result<String, BlobError> {
    let folder_id = blobs
        .ensure_folder(main_folder_id, &month_folder_name(today))
        .await?;
    blobs.upload(staged, &folder_id, display_name).await
}

/// Writes the upload to a unique file under `dir`.
async fn stage(dir: &Path, upload: &Upload) -> Result<PathBuf, std::io::Error> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!(
        "{}_{}",
        uuid::Uuid::new_v4().simple(),
        sanitize_file_name(&upload.file_name)
    ));
    tokio::fs::write(&path, &upload.bytes).await?;
    Ok(path)
}
