//! Route modules for the Folio server

pub mod documents;
pub mod export;
pub mod health;
pub mod pages;

use axum::{
    extract::{rejection::PathRejection, DefaultBodyLimit, Path},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::DocumentName;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config().server.max_upload_mb * 1024 * 1024;

    let documents = documents::router()
        .merge(pages::router())
        .merge(export::router());

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/health", get(health::health_check))
        .nest("/api/v1/documents", documents)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Validate a document name taken from the URL path
pub(crate) fn document_name(raw: &str) -> Result<DocumentName> {
    Ok(DocumentName::parse(raw)?)
}

/// Unwrap path parameters, reporting malformed ones (`/pages/abc`) as
/// `invalid_payload`
pub(crate) fn path_params<T>(path: std::result::Result<Path<T>, PathRejection>) -> Result<T> {
    path.map(|Path(params)| params)
        .map_err(|e| AppError::InvalidPayload(e.body_text()))
}
