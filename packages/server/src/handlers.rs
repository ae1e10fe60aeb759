//! HTTP handler functions for the risk map server.

use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, ResponseError, web};
use base64::Engine as _;
use chrono::{Local, Utc};
use risk_map_columns::Schema;
use risk_map_dataset::fingerprint::fingerprint;
use risk_map_dataset::normalize::normalize;
use risk_map_form::render::render_form;
use risk_map_form::{FormController, SubmitError, Submission, Upload, ValidationError};
use risk_map_server_models::{
    ApiError, ApiHealth, DatasetQueryParams, DatasetResponse, FormResponse, RefreshResponse,
    StoreComparison, SubmitRequest, SubmitResponse,
};
use risk_map_sheets::StoreError;
use risk_map_sheets::google::mime_for;

use crate::config::ConfigError;
use crate::{AppState, page};

/// Errors returned by the API handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The server is misconfigured or credentials are unusable.
    #[error(transparent)]
    Setup(#[from] ConfigError),

    /// The store could not be read or written.
    #[error(transparent)]
    Access(StoreError),

    /// Submitted values were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request body was malformed.
    #[error("{message}")]
    BadRequest {
        /// Description of the problem.
        message: String,
    },

    /// The requested resource does not exist.
    #[error("Not found: {id}")]
    NotFound {
        /// Requested id.
        id: String,
    },
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Credential(e) => Self::Setup(ConfigError::Credential(e)),
            other => Self::Access(other),
        }
    }
}

impl From<SubmitError> for AppError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Validation(e) => Self::Validation(e),
            SubmitError::Store(e) => e.into(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Setup(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Access(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::warn!("{self}");
        }
        HttpResponse::build(status).json(ApiError {
            error: self.to_string(),
        })
    }
}

fn decode_submission(request: SubmitRequest) -> Result<Submission, AppError> {
    let mut uploads = std::collections::BTreeMap::new();
    for payload in request.uploads {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.data.trim())
            .map_err(|e| AppError::BadRequest {
                message: format!("Invalid base64 for {}: {e}", payload.file_name),
            })?;
        uploads.insert(
            payload.column,
            Upload {
                file_name: payload.file_name,
                bytes,
            },
        );
    }
    Ok(Submission {
        level: request.level,
        coordinates: request.coordinates,
        values: request.values,
        uploads,
    })
}

/// `GET /`
///
/// Renders the form, map frame, legend, and data preview.
pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    let mut session = state.session.lock().await;
    if let Err(e) = session.load(state.store.as_ref(), Utc::now()).await {
        log::error!("Failed to load dataset: {e}");
        return HttpResponse::BadGateway()
            .content_type(ContentType::html())
            .body(page::error_page(&e.to_string()));
    }

    let dataset = session.dataset().cloned().unwrap_or_default();
    let layout = render_form(
        &Schema::classify(dataset.columns()),
        &dataset,
        Local::now().date_naive(),
    );
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page::index_page(&layout, &dataset))
}

/// `GET /map`
///
/// Serves the Leaflet document for the working copy.
pub async fn map(state: web::Data<AppState>) -> HttpResponse {
    let mut session = state.session.lock().await;
    if let Err(e) = session.load(state.store.as_ref(), Utc::now()).await {
        log::error!("Failed to load dataset: {e}");
        return HttpResponse::BadGateway()
            .content_type(ContentType::html())
            .body(page::error_page(&e.to_string()));
    }

    let body = match session.map(&state.map_options) {
        Some(build) => {
            if !build.legend_attached {
                log::debug!("Map served without in-map legend");
            }
            build.map.to_html()
        }
        None => page::no_data_page(),
    };
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(body)
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/form`
///
/// Returns the form layout derived from the working copy.
pub async fn form(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let mut session = state.session.lock().await;
    session.load(state.store.as_ref(), Utc::now()).await?;

    let dataset = session.dataset().cloned().unwrap_or_default();
    let layout = render_form(
        &Schema::classify(dataset.columns()),
        &dataset,
        Local::now().date_naive(),
    );
    Ok(HttpResponse::Ok().json(FormResponse {
        layout,
        fingerprint: session.fingerprint(),
    }))
}

/// `POST /api/submit`
///
/// Validates the submission, uploads files, appends the row, and mirrors
/// it into the working copy.
pub async fn submit(
    state: web::Data<AppState>,
    body: web::Json<SubmitRequest>,
) -> Result<HttpResponse, AppError> {
    let submission = decode_submission(body.into_inner())?;

    let mut session = state.session.lock().await;
    session.load(state.store.as_ref(), Utc::now()).await?;

    let controller = FormController::new(
        state.store.as_ref(),
        state.blobs.as_ref(),
        &state.form_options,
    );
    let outcome = session
        .submit(&controller, &submission, Local::now().date_naive())
        .await?;

    Ok(HttpResponse::Ok().json(SubmitResponse {
        outcome,
        row_count: session.dataset().map_or(0, risk_map_dataset::Dataset::len),
    }))
}

/// `POST /api/refresh`
///
/// Clears the dataset cache and reloads from the store.
pub async fn refresh(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let mut session = state.session.lock().await;
    session.refresh();
    let report = session.load(state.store.as_ref(), Utc::now()).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        row_count: report.row_count,
        fingerprint: report.fingerprint,
        loaded_at: report.loaded_at,
    }))
}

/// `GET /api/dataset`
///
/// Returns the working copy. With `fresh=true` the store is also read
/// directly and compared.
pub async fn dataset(
    state: web::Data<AppState>,
    query: web::Query<DatasetQueryParams>,
) -> Result<HttpResponse, AppError> {
    let mut session = state.session.lock().await;
    session.load(state.store.as_ref(), Utc::now()).await?;

    let working = session.dataset().cloned().unwrap_or_default();
    let working_fingerprint = fingerprint(&working);

    let store = if query.fresh.unwrap_or(false) {
        let fresh = normalize(&state.store.read_all_records().await?);
        let fresh_fingerprint = fingerprint(&fresh);
        Some(StoreComparison {
            row_count: fresh.len(),
            differs: fresh_fingerprint != working_fingerprint,
            fingerprint: fresh_fingerprint,
        })
    } else {
        None
    };

    Ok(HttpResponse::Ok().json(DatasetResponse {
        columns: working.columns().to_vec(),
        rows: working.records().map(|r| r.values().to_vec()).collect(),
        fingerprint: working_fingerprint,
        store,
    }))
}

/// `GET /blobs/{id}`
///
/// Serves a file held by the in-memory blob store.
pub async fn blob(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let stored = match &state.memory_blobs {
        Some(blobs) => blobs.get(&id).await,
        None => None,
    };
    let stored = stored.ok_or(AppError::NotFound { id })?;

    Ok(HttpResponse::Ok()
        .content_type(mime_for(&stored.name))
        .body(stored.bytes))
}
