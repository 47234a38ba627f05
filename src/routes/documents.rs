//! Document routes
//!
//! Upload, listing, raw file download and cache status.

use axum::{
    body::Body,
    extract::{rejection::PathRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::{document_name, path_params};
use crate::content::CacheStatus;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::{DocumentInfo, DocumentName};

/// Create the documents router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_documents).post(upload_document))
        .route("/:name/file", get(serve_document))
        .route("/:name/status", get(document_status))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub name: String,
    pub size: u64,
    pub sha256: String,
    /// `None` when the extractor cannot read the upload
    pub page_count: Option<usize>,
}

#[derive(Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentInfo>,
    pub total: usize,
}

/// POST /api/v1/documents
///
/// Multipart upload; the `file` field carries the document. Replacing an
/// existing document clears its page cache.
async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let mut upload: Option<(DocumentName, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidPayload(format!("Failed to read form field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let raw_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidPayload("file field has no file name".into()))?;
        // Some clients send a full client-side path
        let base_name = raw_name.rsplit(['/', '\\']).next().unwrap_or(&raw_name);
        let name = DocumentName::parse(base_name)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidPayload(format!("Failed to read file data: {}", e)))?;
        upload = Some((name, data.to_vec()));
    }

    let (name, data) =
        upload.ok_or_else(|| AppError::InvalidPayload("missing `file` field".into()))?;

    let stored = state.content().upload(&name, &data).await?;

    let page_count = match state.documents().page_count(&name).await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(document = %name, error = %e, "Uploaded document is not readable");
            None
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            name: stored.name,
            size: stored.size,
            sha256: stored.sha256,
            page_count,
        }),
    ))
}

/// GET /api/v1/documents
async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentListResponse>> {
    let documents = state.documents().list().await?;
    let total = documents.len();
    Ok(Json(DocumentListResponse { documents, total }))
}

/// GET /api/v1/documents/:name/file
async fn serve_document(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Response> {
    let name = document_name(&path_params(path)?)?;
    let data = state.documents().open(&name).await?;

    let content_type = mime_guess::from_path(name.as_str())
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", name.as_str().replace('"', "")),
        )
        .body(Body::from(data.as_ref().clone()))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// GET /api/v1/documents/:name/status
async fn document_status(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<CacheStatus>> {
    let name = document_name(&path_params(path)?)?;
    Ok(Json(state.content().status(&name).await?))
}
