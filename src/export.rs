//! Export of cached content
//!
//! A read-only view over whatever is already cached; exporting never
//! triggers extraction.

use crate::cache::PageCache;
use crate::error::{AppError, Result};
use crate::storage::{DocumentName, DocumentStore};

#[derive(Clone)]
pub struct ExportService {
    documents: DocumentStore,
    cache: PageCache,
}

impl ExportService {
    pub fn new(documents: DocumentStore, cache: PageCache) -> Self {
        Self { documents, cache }
    }

    /// Cached content of one page
    pub async fn export_page(&self, doc: &DocumentName, page: usize) -> Result<String> {
        self.cache
            .get(doc, page)
            .await?
            .ok_or_else(|| AppError::PageNotExtracted {
                document: doc.to_string(),
                page,
            })
    }

    /// All cached pages in document order, separated by blank lines
    ///
    /// Missing pages are skipped. The stored aggregate is served when one
    /// exists; any page write removes it first.
    pub async fn export_all(&self, doc: &DocumentName) -> Result<String> {
        let total_pages = self.documents.page_count(doc).await?;

        if let Some(aggregate) = self.cache.aggregate(doc).await? {
            tracing::debug!(document = %doc, "Serving stored aggregate");
            return Ok(aggregate);
        }

        Ok(self.cache.join_pages(doc, total_pages).await?)
    }
}
