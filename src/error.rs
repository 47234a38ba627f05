//! Error types for the Folio server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheError;
use crate::extract::{BatchProgress, ExtractorError};
use crate::storage::StorageError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
///
/// Client errors (fix the request) and server errors (retry later) are kept
/// apart; see [`AppError::is_retryable`].
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    #[error("Page {page} of {document} has not been extracted")]
    PageNotExtracted { document: String, page: usize },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Extraction failed for {document}{}: {source}", page_suffix(.page))]
    ExtractionFailed {
        document: String,
        page: Option<usize>,
        #[source]
        source: ExtractorError,
        /// Work committed before the failure
        progress: Option<BatchProgress>,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn page_suffix(page: &Option<usize>) -> String {
    page.map(|p| format!(" page {}", p)).unwrap_or_default()
}

impl AppError {
    /// Whether the same request may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::ExtractionFailed { .. }
                | AppError::Cache(_)
                | AppError::Storage(_)
                | AppError::Internal(_)
        )
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(name) => AppError::DocumentNotFound(name),
            StorageError::InvalidName { name, reason } => {
                AppError::InvalidPayload(format!("invalid document name {:?}: {}", name, reason))
            }
            StorageError::Unreadable { name, source } => AppError::ExtractionFailed {
                document: name,
                page: None,
                source,
                progress: None,
            },
            other => AppError::Storage(other),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<BatchProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::DocumentNotFound(name) => (
                StatusCode::NOT_FOUND,
                "document_not_found",
                format!("Document not found: {}", name),
            ),
            AppError::PageOutOfRange { .. } => {
                (StatusCode::BAD_REQUEST, "page_out_of_range", self.to_string())
            }
            AppError::PageNotExtracted { .. } => {
                (StatusCode::NOT_FOUND, "page_not_extracted", self.to_string())
            }
            AppError::InvalidPayload(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_payload", msg.clone())
            }
            AppError::ExtractionFailed { document, page, .. } => {
                tracing::error!("{}", self);
                let message = match page {
                    Some(page) => format!("Extraction failed for {} page {}", document, page),
                    None => format!("Extraction failed for {}", document),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, "extraction_failed", message)
            }
            AppError::Cache(e) => {
                tracing::error!("Cache error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "cache_io_failure",
                    "Page cache unavailable".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "Storage error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let progress = match &self {
            AppError::ExtractionFailed { progress, .. } => *progress,
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            retryable: self.is_retryable(),
            progress,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
