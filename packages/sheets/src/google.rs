//! Google Sheets v4 and Drive v3 REST clients.
//!
//! Only the handful of calls the application needs are implemented:
//! reading a worksheet's values, appending a row, finding or creating a
//! folder, and uploading a file.
//!
//! See <https://developers.google.com/sheets/api/reference/rest> and
//! <https://developers.google.com/drive/api/reference/rest/v3>.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use risk_map_dataset::RawTable;
use serde::Deserialize;

use crate::credentials::CredentialProvider;
use crate::{BlobError, BlobStore, StoreError, TabularStore, WriteMode};

/// Sheets API base URL.
pub const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Drive API base URL.
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Drive upload base URL.
pub const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

/// MIME type Drive uses for folders.
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Entry point for opening spreadsheets.
#[derive(Clone)]
pub struct SheetsClient {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    base_url: String,
}

impl SheetsClient {
    /// Creates a client against the public Sheets API.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::with_base_url(credentials, SHEETS_BASE_URL)
    }

    /// Creates a client against a custom base URL.
    #[must_use]
    pub fn with_base_url(credentials: Arc<dyn CredentialProvider>, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Opens a spreadsheet by id. No request is made until a worksheet is
    /// requested.
    #[must_use]
    pub fn open(&self, spreadsheet_id: &str) -> Spreadsheet {
        Spreadsheet {
            client: self.clone(),
            id: spreadsheet_id.to_string(),
        }
    }
}

/// An opened spreadsheet.
#[derive(Clone)]
pub struct Spreadsheet {
    client: SheetsClient,
    id: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

impl Spreadsheet {
    /// Looks up a worksheet by title.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no worksheet has that title, or
    /// [`StoreError::Access`] if the spreadsheet cannot be opened.
    pub async fn worksheet(&self, name: &str) -> Result<Worksheet, StoreError> {
        let url = format!("{}/{}", self.client.base_url, self.id);
        let token = self.client.credentials.access_token().await?;
        let resp = self
            .client
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await?;
        let resp = check_store_status(resp, &self.id).await?;
        let meta: SpreadsheetMeta = resp.json().await?;

        if !meta.sheets.iter().any(|s| s.properties.title == name) {
            return Err(StoreError::NotFound {
                target: format!("worksheet '{name}' in {}", self.id),
            });
        }

        Ok(Worksheet {
            spreadsheet: self.clone(),
            name: name.to_string(),
        })
    }
}

/// A worksheet, usable as a [`TabularStore`].
#[derive(Clone)]
pub struct Worksheet {
    spreadsheet: Spreadsheet,
    name: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl Worksheet {
    fn values_url(&self) -> String {
        format!(
            "{}/{}/values/{}",
            self.spreadsheet.client.base_url,
            self.spreadsheet.id,
            encode_path_segment(&quote_sheet_name(&self.name)),
        )
    }
}

#[async_trait]
impl TabularStore for Worksheet {
    async fn read_all_records(&self) -> Result<RawTable, StoreError> {
        let client = &self.spreadsheet.client;
        let token = client.credentials.access_token().await?;
        let resp = client
            .client
            .get(self.values_url())
            .bearer_auth(token)
            .query(&[
                ("majorDimension", "ROWS"),
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("dateTimeRenderOption", "FORMATTED_STRING"),
            ])
            .send()
            .await?;
        let resp = check_store_status(resp, &self.name).await?;
        let range: ValueRange = resp.json().await?;
        let table = table_from_values(range.values);

        log::info!(
            "Read {} rows x {} columns from worksheet '{}'",
            table.rows.len(),
            table.headers.len(),
            self.name
        );
        Ok(table)
    }

    async fn append_row(&self, values: &[String], mode: WriteMode) -> Result<(), StoreError> {
        let client = &self.spreadsheet.client;
        let token = client.credentials.access_token().await?;
        let url = format!("{}:append", self.values_url());
        let resp = client
            .client
            .post(&url)
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", mode.as_api_str()),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&serde_json::json!({ "values": [values] }))
            .send()
            .await?;
        check_store_status(resp, &self.name).await?;

        log::info!("Appended 1 row to worksheet '{}'", self.name);
        Ok(())
    }
}

/// Splits a `values` grid into header row and data rows, dropping fully
/// empty trailing rows.
fn table_from_values(mut values: Vec<Vec<serde_json::Value>>) -> RawTable {
    if values.is_empty() {
        return RawTable::default();
    }
    let headers = values
        .remove(0)
        .into_iter()
        .map(|h| match h {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        })
        .collect();

    while values.last().is_some_and(|row| row.iter().all(is_empty_cell)) {
        values.pop();
    }

    RawTable {
        headers,
        rows: values,
    }
}

fn is_empty_cell(cell: &serde_json::Value) -> bool {
    match cell {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}

async fn check_store_status(
    resp: reqwest::Response,
    target: &str,
) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => StoreError::NotFound {
            target: target.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Access {
            target: target.to_string(),
            message: api_error_message(&body),
        },
        _ => StoreError::Unexpected {
            message: format!("{status}: {}", api_error_message(&body)),
        },
    })
}

/// Drive client implementing [`BlobStore`].
pub struct DriveClient {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    base_url: String,
    upload_url: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

impl DriveClient {
    /// Creates a client against the public Drive API.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url: DRIVE_BASE_URL.to_string(),
            upload_url: DRIVE_UPLOAD_URL.to_string(),
        }
    }

    /// Public link for a Drive file id.
    #[must_use]
    pub fn public_url(file_id: &str) -> String {
        format!("https://drive.google.com/uc?id={file_id}")
    }
}

#[async_trait]
impl BlobStore for DriveClient {
    async fn ensure_folder(&self, parent_id: &str, name: &str) -> Result<String, BlobError> {
        let token = self.credentials.access_token().await?;
        let query = format!(
            "'{}' in parents and name = '{}' and mimeType = '{FOLDER_MIME}' and trashed = false",
            escape_query(parent_id),
            escape_query(name),
        );
        let resp = self
            .client
            .get(format!("{}/files", self.base_url))
            .bearer_auth(&token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id, name)"),
                ("pageSize", "10"),
            ])
            .send()
            .await?;
        let resp = check_blob_status(resp, parent_id).await?;
        let existing: FileList = resp.json().await?;

        if let Some(folder) = existing.files.into_iter().next() {
            log::debug!("Using existing folder '{name}' ({})", folder.id);
            return Ok(folder.id);
        }

        let resp = self
            .client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&token)
            .query(&[("fields", "id")])
            .json(&serde_json::json!({
                "name": name,
                "mimeType": FOLDER_MIME,
                "parents": [parent_id],
            }))
            .send()
            .await?;
        let resp = check_blob_status(resp, parent_id).await?;
        let created: DriveFile = resp.json().await?;

        log::info!("Created folder '{name}' ({})", created.id);
        Ok(created.id)
    }

    async fn upload(
        &self,
        local_path: &Path,
        folder_id: &str,
        display_name: &str,
    ) -> Result<String, BlobError> {
        let bytes = tokio::fs::read(local_path).await?;
        let token = self.credentials.access_token().await?;

        let metadata = serde_json::json!({
            "name": display_name,
            "parents": [folder_id],
        });
        let boundary = format!("risk-map-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, &metadata, mime_for(display_name), &bytes);

        let resp = self
            .client
            .post(&self.upload_url)
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", "id, parents")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;
        let resp = check_blob_status(resp, folder_id).await?;
        let file: DriveFile = resp.json().await?;

        log::info!("Uploaded '{display_name}' ({} bytes) as {}", bytes.len(), file.id);
        Ok(Self::public_url(&file.id))
    }
}

/// Builds a `multipart/related` body: JSON metadata part then media part.
fn multipart_related_body(
    boundary: &str,
    metadata: &serde_json::Value,
    mime: &str,
    media: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + 512);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--{boundary}\r\nContent-Type: {mime}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Content type for an uploaded file, by extension.
#[must_use]
pub fn mime_for(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else {
        "application/octet-stream"
    }
}

async fn check_blob_status(
    resp: reqwest::Response,
    folder_id: &str,
) -> Result<reqwest::Response, BlobError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(classify_blob_failure(status, &body, folder_id))
}

fn classify_blob_failure(status: StatusCode, body: &str, folder_id: &str) -> BlobError {
    let message = api_error_message(body);
    let lower = body.to_lowercase();
    match status {
        StatusCode::NOT_FOUND => BlobError::NotFound {
            folder_id: folder_id.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => BlobError::Quota { message },
        StatusCode::FORBIDDEN if lower.contains("quota") || lower.contains("ratelimit") => {
            BlobError::Quota { message }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BlobError::Auth { message },
        _ => BlobError::Unexpected {
            message: format!("{status}: {message}"),
        },
    }
}

/// Extracts `error.message` from a Google API error body, falling back to
/// the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

/// Quotes a sheet title for A1 notation (`'My Sheet'`).
fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Percent-encodes a single URL path segment.
fn encode_path_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Escapes a value for a Drive `q` string literal.
fn escape_query(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}
