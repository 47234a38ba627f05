//! Content access
//!
//! Read/write entry point for the transport layer. Reads never extract;
//! saves never call the extractor. Extraction is requested explicitly through
//! [`ContentService::ensure`] and [`ContentService::force_extract`].

use serde::Serialize;

use crate::cache::PageCache;
use crate::error::{AppError, Result};
use crate::extract::{BatchExtractor, BatchProgress, DocumentLocks};
use crate::storage::{DocumentName, DocumentStore, StoredDocument};

/// Whether a page was served from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Found,
    NotFound,
}

/// Cached content of one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageContent {
    pub page: usize,
    pub content: String,
    pub status: PageStatus,
}

/// Extraction state of a document's cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub name: String,
    pub total_pages: usize,
    pub cursor: usize,
    pub is_complete: bool,
}

#[derive(Clone)]
pub struct ContentService {
    documents: DocumentStore,
    cache: PageCache,
    batch: BatchExtractor,
    locks: DocumentLocks,
}

impl ContentService {
    pub fn new(
        documents: DocumentStore,
        cache: PageCache,
        batch: BatchExtractor,
        locks: DocumentLocks,
    ) -> Self {
        Self {
            documents,
            cache,
            batch,
            locks,
        }
    }

    /// Cached content for a page, or an empty `not_found` answer
    pub async fn get_page(&self, doc: &DocumentName, page: usize) -> Result<PageContent> {
        if page == 0 {
            return Err(AppError::InvalidPayload("pages are numbered from 1".into()));
        }

        Ok(match self.cache.get(doc, page).await? {
            Some(content) => PageContent {
                page,
                content,
                status: PageStatus::Found,
            },
            None => PageContent {
                page,
                content: String::new(),
                status: PageStatus::NotFound,
            },
        })
    }

    /// Overwrite a page's cached content with an edit
    ///
    /// Edits are not protected: a later forced extraction replaces them.
    pub async fn save_page(&self, doc: &DocumentName, page: usize, content: &str) -> Result<()> {
        if page == 0 {
            return Err(AppError::InvalidPayload("pages are numbered from 1".into()));
        }

        let _guard = self.locks.lock(doc.cache_key()).await;

        let total = self.documents.page_count(doc).await?;
        if page > total {
            return Err(AppError::PageOutOfRange { page, total });
        }

        self.cache.put(doc, page, content).await?;
        tracing::info!(document = %doc, page, bytes = content.len(), "Saved page edit");
        Ok(())
    }

    /// Reset a document's cache and store its new bytes
    ///
    /// The cache is cleared first: if that fails the old bytes stay in place
    /// and still match whatever is cached.
    pub async fn upload(&self, doc: &DocumentName, data: &[u8]) -> Result<StoredDocument> {
        let _guard = self.locks.lock(doc.cache_key()).await;

        self.cache.clear(doc).await?;
        Ok(self.documents.save(doc, data).await?)
    }

    /// Reset a document's cache after its bytes changed out-of-band
    pub async fn on_upload(&self, doc: &DocumentName) -> Result<()> {
        let _guard = self.locks.lock(doc.cache_key()).await;
        self.cache.clear(doc).await?;
        Ok(())
    }

    pub async fn ensure(&self, doc: &DocumentName, requested_page: usize) -> Result<BatchProgress> {
        self.batch.ensure(doc, requested_page).await
    }

    pub async fn force_extract(&self, doc: &DocumentName, page: usize) -> Result<String> {
        self.batch.force_extract(doc, page).await
    }

    pub async fn status(&self, doc: &DocumentName) -> Result<CacheStatus> {
        let total_pages = self.documents.page_count(doc).await?;
        let cursor = self.cache.cursor(doc, total_pages).await?;

        Ok(CacheStatus {
            name: doc.to_string(),
            total_pages,
            cursor,
            is_complete: cursor >= total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PageStore;
    use crate::testing::{fake_document, FlakyStore, TestApp};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_page_never_extracts() {
        let app = TestApp::new(5).await;
        let doc = app.upload("book.pdf", 3).await;

        let page = app.state.content().get_page(&doc, 1).await.unwrap();
        assert_eq!(page.status, PageStatus::NotFound);
        assert_eq!(page.content, "");
        assert!(app.extractor.extracted_pages().is_empty());
    }

    #[tokio::test]
    async fn test_get_page_found_after_ensure() {
        let app = TestApp::new(5).await;
        let doc = app.upload("book.pdf", 3).await;
        let content = app.state.content();

        content.ensure(&doc, 1).await.unwrap();
        let page = content.get_page(&doc, 2).await.unwrap();
        assert_eq!(
            page,
            PageContent {
                page: 2,
                content: "page 2".into(),
                status: PageStatus::Found,
            }
        );
    }

    #[tokio::test]
    async fn test_miss_does_not_serve_other_pages() {
        let app = TestApp::new(5).await;
        let doc = app.upload("book.pdf", 3).await;
        let content = app.state.content();

        content.save_page(&doc, 1, "one").await.unwrap();
        let page = content.get_page(&doc, 2).await.unwrap();
        assert_eq!(page.status, PageStatus::NotFound);
        assert_eq!(page.content, "");
    }

    #[tokio::test]
    async fn test_save_then_get_returns_saved_content() {
        let app = TestApp::new(5).await;
        let doc = app.upload("book.pdf", 3).await;
        let content = app.state.content();

        // Regardless of prior extraction state
        content.save_page(&doc, 3, "draft").await.unwrap();
        assert_eq!(content.get_page(&doc, 3).await.unwrap().content, "draft");

        content.ensure(&doc, 1).await.unwrap();
        content.save_page(&doc, 1, "edited").await.unwrap();
        let page = content.get_page(&doc, 1).await.unwrap();
        assert_eq!(page.status, PageStatus::Found);
        assert_eq!(page.content, "edited");

        content.save_page(&doc, 2, "").await.unwrap();
        let page = content.get_page(&doc, 2).await.unwrap();
        assert_eq!(page.status, PageStatus::Found);
        assert_eq!(page.content, "");

        assert_eq!(app.extractor.extracted_pages(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_save_validation() {
        let app = TestApp::new(5).await;
        let doc = app.upload("book.pdf", 3).await;
        let content = app.state.content();

        assert!(matches!(
            content.save_page(&doc, 0, "x").await,
            Err(AppError::InvalidPayload(_))
        ));
        assert!(matches!(
            content.save_page(&doc, 4, "x").await,
            Err(AppError::PageOutOfRange { page: 4, total: 3 })
        ));

        let missing = DocumentName::parse("missing.pdf").unwrap();
        assert!(matches!(
            content.save_page(&missing, 1, "x").await,
            Err(AppError::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_force_extract_clobbers_manual_edit() {
        let app = TestApp::new(5).await;
        let doc = app.upload("book.pdf", 3).await;
        let content = app.state.content();

        content.save_page(&doc, 2, "my careful edit").await.unwrap();
        let fresh = content.force_extract(&doc, 2).await.unwrap();
        assert_eq!(fresh, "page 2");
        assert_eq!(content.get_page(&doc, 2).await.unwrap().content, "page 2");
    }

    #[tokio::test]
    async fn test_reupload_clears_cache() {
        let app = TestApp::new(5).await;
        let doc = app.upload("book.pdf", 4).await;
        let content = app.state.content();

        content.ensure(&doc, 1).await.unwrap();
        content.save_page(&doc, 2, "edit").await.unwrap();

        let doc = app.upload("book.pdf", 6).await;
        for page in 1..=6 {
            assert_eq!(
                content.get_page(&doc, page).await.unwrap().status,
                PageStatus::NotFound
            );
        }
        assert_eq!(app.state.cache().cursor(&doc, 6).await.unwrap(), 0);
        assert_eq!(app.state.cache().aggregate(&doc).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_on_upload_resets_cursor() {
        let app = TestApp::new(5).await;
        let doc = app.upload("book.pdf", 3).await;
        let content = app.state.content();

        content.ensure(&doc, 1).await.unwrap();
        content.on_upload(&doc).await.unwrap();
        assert_eq!(app.state.cache().cursor(&doc, 3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_status_tracks_cursor() {
        let app = TestApp::new(2).await;
        let doc = app.upload("book.pdf", 3).await;
        let content = app.state.content();

        let status = content.status(&doc).await.unwrap();
        assert_eq!(status.cursor, 0);
        assert!(!status.is_complete);

        content.ensure(&doc, 3).await.unwrap();
        let status = content.status(&doc).await.unwrap();
        assert_eq!(status.cursor, 0);
        assert!(!status.is_complete);

        content.ensure(&doc, 1).await.unwrap();
        let status = content.status(&doc).await.unwrap();
        assert_eq!(status.cursor, 3);
        assert!(status.is_complete);
    }

    #[tokio::test]
    async fn test_failed_cache_reset_keeps_old_bytes() {
        let store = Arc::new(FlakyStore::new());
        let app = TestApp::with_store(5, {
            let store = store.clone();
            move |_| -> Arc<dyn PageStore> { store }
        });
        let doc = app.upload("book.pdf", 3).await;
        let content = app.state.content();
        content.ensure(&doc, 1).await.unwrap();

        store.fail_clear(true);
        let result = content.upload(&doc, &fake_document(8)).await;
        assert!(matches!(result, Err(AppError::Cache(_))));

        let on_disk = app.state.documents().open(&doc).await.unwrap();
        assert_eq!(on_disk.as_slice(), fake_document(3).as_slice());
        let status = content.status(&doc).await.unwrap();
        assert_eq!((status.total_pages, status.cursor), (3, 3));

        store.fail_clear(false);
        content.upload(&doc, &fake_document(8)).await.unwrap();
        assert_eq!(
            content.get_page(&doc, 1).await.unwrap().status,
            PageStatus::NotFound
        );
        assert_eq!(content.status(&doc).await.unwrap().total_pages, 8);
    }

    #[tokio::test]
    async fn test_on_disk_extract_export_reupload() {
        let app = TestApp::on_disk(2).await;
        let doc = app.upload("book.pdf", 3).await;
        let content = app.state.content();
        let doc_dir = app.cache_dir().join("book");

        content.ensure(&doc, 1).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(doc_dir.join("2.txt")).unwrap(),
            "page 2"
        );
        assert!(!doc_dir.join("full.txt").exists());

        let progress = content.ensure(&doc, 1).await.unwrap();
        assert!(progress.is_complete);
        assert_eq!(
            std::fs::read_to_string(doc_dir.join("full.txt")).unwrap(),
            "page 1\n\npage 2\n\npage 3"
        );
        assert_eq!(
            app.state.export().export_all(&doc).await.unwrap(),
            "page 1\n\npage 2\n\npage 3"
        );

        content.save_page(&doc, 2, "edited").await.unwrap();
        assert!(!doc_dir.join("full.txt").exists());
        assert_eq!(
            app.state.export().export_all(&doc).await.unwrap(),
            "page 1\n\nedited\n\npage 3"
        );

        app.upload("book.pdf", 4).await;
        assert!(!doc_dir.exists());
        assert_eq!(content.status(&doc).await.unwrap().cursor, 0);
        assert_eq!(app.state.export().export_all(&doc).await.unwrap(), "");
    }
}
