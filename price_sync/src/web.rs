//! HTTP API for importing and exporting price archives
//!
//! `POST /api/v0/prices` takes a multipart upload, `GET /api/v0/prices`
//! returns the table as `data.zip`. Other methods get 405 from the router.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

use crate::config::ServiceConfig;
use crate::database::{PriceStore, SqliteStore};
use crate::error::{PriceError, Result};
use crate::pipeline::{handle_export, handle_import, ImportReport};

/// Path serving both import and export
pub const PRICES_PATH: &str = "/api/v0/prices";

/// Multipart field carrying the uploaded archive
pub const UPLOAD_FIELD: &str = "file";

/// Response header with the number of rows written by an import
pub const INSERTED_HEADER: &str = "x-import-inserted";

/// Response header with the number of rows left out by an import
pub const SKIPPED_HEADER: &str = "x-import-skipped";

/// Shared application state (the store is opened per call, never locked)
#[derive(Clone)]
struct AppState {
    store: Arc<dyn PriceStore>,
}

/// POST /api/v0/prices
async fn import_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    log::info!("Request: {} {}", Method::POST, PRICES_PATH);

    match import_upload(state, multipart).await {
        Ok(report) => import_response(report),
        Err(e) => e.into_response(),
    }
}

async fn import_upload(state: AppState, mut multipart: Multipart) -> Result<ImportReport> {
    let archive = read_upload(&mut multipart).await?;
    log::debug!("Received {} byte upload", archive.len());

    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || handle_import(store.as_ref(), &archive)).await?
}

/// Pull the bytes of the `file` field out of the form, ignoring other fields
async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            return Ok(field.bytes().await?.to_vec());
        }
    }
    Err(PriceError::MissingFile(UPLOAD_FIELD))
}

fn import_response(report: ImportReport) -> Response {
    let diagnostics = report.diagnostics;
    log::info!(
        "Import finished: {} inserted, {} skipped of {} rows",
        diagnostics.inserted,
        diagnostics.skipped(),
        diagnostics.rows_read
    );

    let mut response = Json(report.stats).into_response();
    let headers = response.headers_mut();
    headers.insert(INSERTED_HEADER, HeaderValue::from(diagnostics.inserted));
    headers.insert(SKIPPED_HEADER, HeaderValue::from(diagnostics.skipped()));
    response
}

/// GET /api/v0/prices
///
/// The archive is built completely before the response starts, so every
/// failure still becomes a clean 500 and Content-Length is exact.
async fn export_handler(State(state): State<AppState>) -> Response {
    log::info!("Request: {} {}", Method::GET, PRICES_PATH);

    let store = Arc::clone(&state.store);
    let archive = match tokio::task::spawn_blocking(move || handle_export(store.as_ref())).await {
        Ok(Ok(archive)) => archive,
        Ok(Err(e)) => return e.into_response(),
        Err(e) => return PriceError::from(e).into_response(),
    };

    let content_length = HeaderValue::from(archive.len());
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static("attachment; filename=data.zip"),
            ),
            (header::CONTENT_LENGTH, content_length),
        ],
        Body::from(archive),
    )
        .into_response()
}

/// Build the web server router around an already initialized store
pub fn create_router(store: Arc<dyn PriceStore>, max_upload_bytes: usize) -> Router {
    let state = AppState { store };

    Router::new()
        .route(PRICES_PATH, get(export_handler).post(import_handler))
        .layer(
            ServiceBuilder::new()
                // the multipart extractor's own 2 MB default is replaced by an explicit limit
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_upload_bytes)),
        )
        .with_state(state)
}

/// Start the web server (async)
///
/// Opens the store, creates the schema (failure is fatal to the caller),
/// then serves until Ctrl-C.
pub async fn serve(
    config: ServiceConfig,
    host: &str,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::new(&config.database, config.id_strategy);
    store.ping()?;
    log::info!(
        "Connected to database: {} (id strategy: {})",
        store.path().display(),
        store.id_strategy()
    );
    store.create_schema_if_absent()?;

    let app = create_router(Arc::new(store), config.max_upload_bytes);
    let addr = format!("{}:{}", host, port);

    log::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    log::info!("Shutdown signal received");
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;
