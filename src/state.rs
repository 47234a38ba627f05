//! Application state management

use std::sync::Arc;

use tokio::time::Duration;

use crate::cache::{FsPageStore, PageCache, PageStore};
use crate::config::Config;
use crate::content::ContentService;
use crate::export::ExportService;
use crate::extract::{BatchExtractor, DocumentLocks, MupdfExtractor, PageExtractor};
use crate::storage::DocumentStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pub config: Config,
    pub documents: DocumentStore,
    pub cache: PageCache,
    pub batch: BatchExtractor,
    pub content: ContentService,
    pub export: ExportService,
}

impl AppState {
    /// Wire every component from explicit collaborators
    pub fn new(
        config: Config,
        extractor: Arc<dyn PageExtractor>,
        store: Arc<dyn PageStore>,
    ) -> Self {
        let timeout = Duration::from_secs(config.extraction.timeout_secs);
        let locks = DocumentLocks::new();
        let documents =
            DocumentStore::new(config.storage.upload_dir.clone(), extractor.clone(), timeout);
        let cache = PageCache::new(store);
        let batch = BatchExtractor::new(
            documents.clone(),
            cache.clone(),
            extractor,
            locks.clone(),
            config.extraction.batch_size,
            timeout,
        );
        let content = ContentService::new(documents.clone(), cache.clone(), batch.clone(), locks);
        let export = ExportService::new(documents.clone(), cache.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                documents,
                cache,
                batch,
                content,
                export,
            }),
        }
    }

    /// Production wiring: MuPDF extraction into an on-disk cache
    pub fn from_config(config: Config) -> Self {
        let format = config.extraction.format;
        let store = FsPageStore::new(config.storage.cache_dir.clone(), format.extension());
        Self::new(config, Arc::new(MupdfExtractor::new(format)), Arc::new(store))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the document store
    pub fn documents(&self) -> &DocumentStore {
        &self.inner.documents
    }

    /// Get the page cache
    pub fn cache(&self) -> &PageCache {
        &self.inner.cache
    }

    /// Get the batch extraction orchestrator
    pub fn batch(&self) -> &BatchExtractor {
        &self.inner.batch
    }

    /// Get the content access facade
    pub fn content(&self) -> &ContentService {
        &self.inner.content
    }

    /// Get the export aggregator
    pub fn export(&self) -> &ExportService {
        &self.inner.export
    }
}
