//! Export routes

use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

use super::{document_name, path_params};
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::DocumentName;

/// Create the export router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:name/export", get(export_document))
        .route("/:name/export/:page", get(export_page))
}

async fn export_document(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Response> {
    let name = document_name(&path_params(path)?)?;
    let text = state.export().export_all(&name).await?;
    let file_name = format!(
        "{}.{}",
        name.cache_key(),
        state.config().extraction.format.extension()
    );
    text_response(&state, &name, text, &file_name)
}

async fn export_page(
    State(state): State<AppState>,
    path: std::result::Result<Path<(String, usize)>, PathRejection>,
) -> Result<Response> {
    let (name, page) = path_params(path)?;
    let name = document_name(&name)?;
    let text = state.export().export_page(&name, page).await?;
    let file_name = format!(
        "{}-{}.{}",
        name.cache_key(),
        page,
        state.config().extraction.format.extension()
    );
    text_response(&state, &name, text, &file_name)
}

fn text_response(
    state: &AppState,
    name: &DocumentName,
    text: String,
    file_name: &str,
) -> Result<Response> {
    tracing::debug!(document = %name, bytes = text.len(), "Exporting content");

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            state.config().extraction.format.mime_type(),
        )
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name.replace('"', "")),
        )
        .body(Body::from(text))
        .map_err(|e| AppError::Internal(e.to_string()))
}
