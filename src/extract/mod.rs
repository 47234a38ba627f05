//! Page extraction
//!
//! Turns "the user wants page P" into a bounded amount of extraction work.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    BatchExtractor                        │
//! │   ensure(doc, page) / force_extract(doc, page)          │
//! └──────────────────────────────────────────────────────────┘
//!        │ per-document lock        │ spawn_blocking + timeout
//!        ▼                          ▼
//!   ┌──────────────┐        ┌──────────────────┐
//!   │ DocumentLocks│        │  PageExtractor   │ (MuPDF)
//!   └──────────────┘        └──────────────────┘
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │  PageCache   │
//!   └──────────────┘
//! ```

mod batch;
mod locks;
mod mupdf_extractor;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{timeout, Duration};

pub use batch::BatchExtractor;
pub use locks::DocumentLocks;
pub use mupdf_extractor::MupdfExtractor;

/// Output markup of extracted pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Text,
    Html,
}

impl ContentFormat {
    /// File extension for cache artifacts
    pub fn extension(&self) -> &'static str {
        match self {
            ContentFormat::Text => "txt",
            ContentFormat::Html => "html",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ContentFormat::Text => "text/plain; charset=utf-8",
            ContentFormat::Html => "text/html; charset=utf-8",
        }
    }
}

impl FromStr for ContentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(ContentFormat::Text),
            "html" => Ok(ContentFormat::Html),
            other => Err(format!("unknown content format: {}", other)),
        }
    }
}

/// Raw extractor errors
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("Failed to open document: {0}")]
    Open(String),

    #[error("Page {page} does not exist (document has {total} pages)")]
    NoSuchPage { page: usize, total: usize },

    #[error("Failed to extract page {page}: {message}")]
    Page { page: usize, message: String },

    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("Extraction task failed: {0}")]
    Join(String),
}

/// Black-box page extractor
///
/// Implementations are blocking; callers dispatch them with [`run_blocking`].
/// Page indices are 1-based.
pub trait PageExtractor: Send + Sync + 'static {
    /// Number of pages in the document
    fn page_count(&self, data: &[u8]) -> Result<usize, ExtractorError>;

    /// Extract the content of one page
    fn extract_page(&self, data: &[u8], page: usize) -> Result<String, ExtractorError>;
}

/// Progress report of one `ensure` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub pages_processed: usize,
    pub last_page_extracted: usize,
    pub total_pages: usize,
    pub is_complete: bool,
}

/// Run blocking extractor work on the blocking pool with a time limit
///
/// The blocking thread may keep running after a timeout; the caller gets its
/// answer either way.
pub async fn run_blocking<T, F>(limit: Duration, f: F) -> Result<T, ExtractorError>
where
    F: FnOnce() -> Result<T, ExtractorError> + Send + 'static,
    T: Send + 'static,
{
    match timeout(limit, tokio::task::spawn_blocking(f)).await {
        Ok(join_result) => join_result.map_err(|e| ExtractorError::Join(e.to_string()))?,
        Err(_) => Err(ExtractorError::Timeout(limit)),
    }
}
