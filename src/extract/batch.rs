//! Batch extraction orchestrator

use std::sync::Arc;

use tokio::time::Duration;

use super::{run_blocking, BatchProgress, DocumentLocks, ExtractorError, PageExtractor};
use crate::cache::PageCache;
use crate::error::{AppError, Result};
use crate::storage::{DocumentName, DocumentStore};

/// Computes missing pages in bounded batches and writes them to the cache
#[derive(Clone)]
pub struct BatchExtractor {
    documents: DocumentStore,
    cache: PageCache,
    extractor: Arc<dyn PageExtractor>,
    locks: DocumentLocks,
    batch_size: usize,
    timeout: Duration,
}

impl BatchExtractor {
    pub fn new(
        documents: DocumentStore,
        cache: PageCache,
        extractor: Arc<dyn PageExtractor>,
        locks: DocumentLocks,
        batch_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            documents,
            cache,
            extractor,
            locks,
            batch_size: batch_size.max(1),
            timeout,
        }
    }

    /// Extract up to one batch of pages for a document
    ///
    /// The batch starts right after the contiguous frontier, or at the
    /// requested page when the request is ahead of it. Pages skipped by such
    /// a jump stay uncached until a later request at or below them (or a
    /// forced extraction) covers them.
    ///
    /// On the first extractor failure the call stops; pages written before
    /// it stay cached and the error carries the partial progress.
    pub async fn ensure(&self, doc: &DocumentName, requested_page: usize) -> Result<BatchProgress> {
        let _guard = self.locks.lock(doc.cache_key()).await;

        let total_pages = self.documents.page_count(doc).await?;
        let requested = requested_page.clamp(1, total_pages.max(1));
        let h = self.cache.cursor(doc, total_pages).await?;

        // Jumping ahead of the frontier starts at the requested page
        let start = if requested > h { (h + 1).max(requested) } else { h + 1 };

        let mut progress = BatchProgress {
            pages_processed: 0,
            last_page_extracted: h,
            total_pages,
            is_complete: false,
        };

        if start > total_pages {
            progress.is_complete = true;
            tracing::debug!(document = %doc, total_pages, "Document already extracted");
            return Ok(progress);
        }

        let end = (start + self.batch_size - 1).min(total_pages);
        let data = self.documents.open(doc).await?;

        tracing::debug!(
            document = %doc,
            cursor = h,
            requested,
            start,
            end,
            "Starting extraction batch"
        );

        for page in start..=end {
            if self.cache.has(doc, page).await? {
                tracing::debug!(document = %doc, page, "Page already cached, skipping");
            } else {
                let content = match self.extract_one(&data, page).await {
                    Ok(content) => content,
                    Err(source) => {
                        tracing::warn!(
                            document = %doc,
                            page,
                            processed = progress.pages_processed,
                            error = %source,
                            "Extraction batch aborted"
                        );
                        return Err(AppError::ExtractionFailed {
                            document: doc.to_string(),
                            page: Some(page),
                            source,
                            progress: Some(progress),
                        });
                    }
                };
                self.cache.put(doc, page, &content).await?;
                progress.pages_processed += 1;
            }
            progress.last_page_extracted = page;
        }

        progress.is_complete = progress.last_page_extracted >= total_pages;

        if progress.is_complete {
            self.write_aggregate(doc, total_pages).await;
        }

        tracing::info!(
            document = %doc,
            processed = progress.pages_processed,
            last_page = progress.last_page_extracted,
            total_pages,
            complete = progress.is_complete,
            "Extraction batch finished"
        );

        Ok(progress)
    }

    /// Extract one page unconditionally, replacing any cached content
    /// (manual edits included)
    pub async fn force_extract(&self, doc: &DocumentName, page: usize) -> Result<String> {
        let _guard = self.locks.lock(doc.cache_key()).await;

        let total_pages = self.documents.page_count(doc).await?;
        if page == 0 || page > total_pages {
            return Err(AppError::PageOutOfRange {
                page,
                total: total_pages,
            });
        }

        let data = self.documents.open(doc).await?;
        let content = self
            .extract_one(&data, page)
            .await
            .map_err(|source| AppError::ExtractionFailed {
                document: doc.to_string(),
                page: Some(page),
                source,
                progress: None,
            })?;

        self.cache.put(doc, page, &content).await?;
        tracing::info!(document = %doc, page, "Force-extracted page");

        Ok(content)
    }

    async fn extract_one(
        &self,
        data: &Arc<Vec<u8>>,
        page: usize,
    ) -> std::result::Result<String, ExtractorError> {
        let data = Arc::clone(data);
        let extractor = Arc::clone(&self.extractor);
        run_blocking(self.timeout, move || extractor.extract_page(&data, page)).await
    }

    /// Refresh the whole-document artifact once every page is present
    ///
    /// Errors are logged and not returned. The pages themselves are already
    /// committed, and `export_all` joins them when no aggregate is stored.
    async fn write_aggregate(&self, doc: &DocumentName, total_pages: usize) {
        let result = async {
            if self.cache.cursor(doc, total_pages).await? < total_pages {
                return Ok(false);
            }
            let joined = self.cache.join_pages(doc, total_pages).await?;
            self.cache.put_aggregate(doc, &joined).await?;
            Ok::<_, crate::cache::CacheError>(true)
        }
        .await;

        match result {
            Ok(true) => tracing::debug!(document = %doc, "Wrote document aggregate"),
            Ok(false) => {}
            Err(e) => tracing::warn!(document = %doc, error = %e, "Failed to write aggregate"),
        }
    }
}
