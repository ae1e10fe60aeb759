#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Seams to the external services behind the observation dataset.
//!
//! Three collaborators are consumed through traits so the form and map
//! layers never talk to a concrete service:
//!
//! - [`TabularStore`]: reads the whole sheet and appends rows.
//! - [`BlobStore`]: creates folders and uploads documentation files.
//! - [`credentials::CredentialProvider`]: hands out bearer tokens.
//!
//! [`google`] implements the first two over the Google Sheets v4 and Drive
//! v3 REST APIs; [`memory`] implements them in process for local runs and
//! tests.

pub mod credentials;
pub mod google;
pub mod memory;

use std::path::Path;

use async_trait::async_trait;
use risk_map_dataset::RawTable;

pub use credentials::CredentialError;

/// Errors from the tabular store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The spreadsheet or worksheet exists but cannot be opened with the
    /// current credentials.
    #[error("Access denied to {target}: {message}")]
    Access {
        /// Spreadsheet id or worksheet name.
        target: String,
        /// Server-provided detail.
        message: String,
    },

    /// The spreadsheet or worksheet does not exist.
    #[error("Not found: {target}")]
    NotFound {
        /// Spreadsheet id or worksheet name.
        target: String,
    },

    /// Credentials could not be obtained.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service answered with an unexpected status or body.
    #[error("Unexpected response: {message}")]
    Unexpected {
        /// Description of what went wrong.
        message: String,
    },
}

/// Errors from blob storage.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The credentials were rejected.
    #[error("Authorization failed: {message}")]
    Auth {
        /// Server-provided detail.
        message: String,
    },

    /// Storage or rate quota exhausted.
    #[error("Quota exceeded: {message}")]
    Quota {
        /// Server-provided detail.
        message: String,
    },

    /// The parent folder does not exist.
    #[error("Folder not found: {folder_id}")]
    NotFound {
        /// Folder id that was looked up.
        folder_id: String,
    },

    /// Credentials could not be obtained.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Local file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an unexpected status or body.
    #[error("Unexpected response: {message}")]
    Unexpected {
        /// Description of what went wrong.
        message: String,
    },
}

/// How appended values are interpreted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Values are parsed as if typed by a user (dates, numbers, formulas).
    #[default]
    UserEntered,
    /// Values are stored verbatim as strings.
    Raw,
}

impl WriteMode {
    /// The Sheets API `valueInputOption` for this mode.
    #[must_use]
    pub const fn as_api_str(self) -> &'static str {
        match self {
            Self::UserEntered => "USER_ENTERED",
            Self::Raw => "RAW",
        }
    }
}

/// A single worksheet holding the observation table.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Reads the header row and every data row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the sheet cannot be opened or read.
    async fn read_all_records(&self) -> Result<RawTable, StoreError>;

    /// Appends one row in header order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the sheet cannot be opened or written.
    async fn append_row(&self, values: &[String], mode: WriteMode) -> Result<(), StoreError>;
}

/// File storage for documentation uploads.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns the id of the folder `name` under `parent_id`, creating it
    /// if absent.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] if the lookup or creation fails.
    async fn ensure_folder(&self, parent_id: &str, name: &str) -> Result<String, BlobError>;

    /// Uploads the file at `local_path` into `folder_id` as
    /// `display_name` and returns its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] if the file cannot be read or the upload
    /// fails.
    async fn upload(
        &self,
        local_path: &Path,
        folder_id: &str,
        display_name: &str,
    ) -> Result<String, BlobError>;
}
