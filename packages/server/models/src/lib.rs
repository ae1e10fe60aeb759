#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the risk map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the form and dataset types so the wire contract can evolve on its
//! own.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use risk_map_dataset::CellValue;
use risk_map_form::SubmitOutcome;
use risk_map_form::render::FormLayout;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Error body returned with every non-2xx status.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Human-readable error.
    pub error: String,
}

/// A file attached to a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload {
    /// Documentation column the file belongs to.
    pub column: String,
    /// Original file name.
    pub file_name: String,
    /// File contents, standard base64.
    pub data: String,
}

/// `POST /api/submit` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Chosen risk level.
    pub level: Option<String>,
    /// Free-text `"lat, lon"`.
    pub coordinates: Option<String>,
    /// Entered text keyed by column name.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    /// Attached files.
    #[serde(default)]
    pub uploads: Vec<UploadPayload>,
}

/// `POST /api/submit` success response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// What the submission did.
    pub outcome: SubmitOutcome,
    /// Rows in the session dataset after the submission.
    pub row_count: usize,
}

/// `GET /api/form` response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    /// Controls to render.
    pub layout: FormLayout,
    /// Fingerprint of the dataset the layout was derived from.
    pub fingerprint: String,
}

/// `POST /api/refresh` response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// Rows loaded from the store.
    pub row_count: usize,
    /// Fingerprint of the loaded dataset.
    pub fingerprint: String,
    /// When the dataset was loaded.
    pub loaded_at: DateTime<Utc>,
}

/// Query parameters for `GET /api/dataset`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetQueryParams {
    /// Also read the store directly and compare.
    pub fresh: Option<bool>,
}

/// Comparison of the session dataset against a direct store read.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreComparison {
    /// Rows in the store.
    pub row_count: usize,
    /// Fingerprint of the store contents.
    pub fingerprint: String,
    /// Whether the session copy differs from the store.
    pub differs: bool,
}

/// `GET /api/dataset` response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetResponse {
    /// Column names in sheet order.
    pub columns: Vec<String>,
    /// Session rows.
    pub rows: Vec<Vec<CellValue>>,
    /// Fingerprint of the session rows.
    pub fingerprint: String,
    /// Present when `fresh=true` was requested.
    pub store: Option<StoreComparison>,
}
