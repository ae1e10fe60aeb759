#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web server for the risk map data-collection application.
//!
//! Serves an entry form that appends observations to a Google Sheet, a
//! Leaflet map of every observation styled by risk level and indicator
//! columns, and a small JSON API. With a seed CSV the server runs against
//! in-memory backends instead of Google Sheets and Drive.

pub mod config;
mod handlers;
pub mod interactive;
pub mod page;
pub mod session;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use risk_map_form::FormOptions;
use risk_map_map::MapOptions;
use risk_map_sheets::memory::MemoryBlobStore;
use risk_map_sheets::{BlobStore, TabularStore};
use tokio::sync::Mutex;

pub use handlers::AppError;

use crate::config::{AppConfig, Backends, ConfigError, MEMORY_BLOB_PREFIX};
use crate::session::Session;

/// Errors that stop the server from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration or backend setup failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Binding or serving failed.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Working copy of the dataset, its cache, and the cached map.
    pub session: Mutex<Session>,
    /// Tabular store holding the dataset.
    pub store: Arc<dyn TabularStore>,
    /// Blob storage for documentation uploads.
    pub blobs: Arc<dyn BlobStore>,
    /// In-memory blob store served under `/blobs`, when in use.
    pub memory_blobs: Option<Arc<MemoryBlobStore>>,
    /// Form controller settings.
    pub form_options: FormOptions,
    /// Map builder settings.
    pub map_options: MapOptions,
}

impl AppState {
    /// Builds the state from ready backends.
    #[must_use]
    pub fn new(backends: Backends, config: &AppConfig) -> Self {
        Self {
            session: Mutex::new(Session::new(config.cache_ttl())),
            store: backends.store,
            blobs: backends.blobs,
            memory_blobs: backends.memory_blobs,
            form_options: config.form_options(),
            map_options: config.map_options(),
        }
    }
}

/// Registers every route.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/map", web::get().to(handlers::map))
        .route(
            &format!("{MEMORY_BLOB_PREFIX}/{{id}}"),
            web::get().to(handlers::blob),
        )
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health))
                .route("/form", web::get().to(handlers::form))
                .route("/submit", web::post().to(handlers::submit))
                .route("/refresh", web::post().to(handlers::refresh))
                .route("/dataset", web::get().to(handlers::dataset)),
        );
}

/// Starts the risk map server.
///
/// Builds the store and blob backends from `config` and starts the
/// Actix-Web HTTP server. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError::Config`] if the backends cannot be built, or
/// [`ServerError::Io`] if the HTTP server fails to bind or encounters a
/// runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: AppConfig) -> Result<(), ServerError> {
    let backends = config.build_backends().await?;
    let state = web::Data::new(AppState::new(backends, &config));

    let bind_addr = config.bind_addr.clone();
    let port = config.port;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(32 * 1024 * 1024))
            .configure(routes)
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
