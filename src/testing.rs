//! Test doubles shared by unit tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use crate::cache::{CacheError, FsPageStore, MemoryPageStore, PageStore};
use crate::config::Config;
use crate::extract::{ContentFormat, ExtractorError, PageExtractor};
use crate::state::AppState;
use crate::storage::DocumentName;

/// Pages separated by form feeds, each reading "page N"
pub fn fake_document(pages: usize) -> Vec<u8> {
    (1..=pages)
        .map(|p| format!("page {}", p))
        .collect::<Vec<_>>()
        .join("\x0c")
        .into_bytes()
}

/// Extractor over [`fake_document`] bytes with scripted failures
#[derive(Default)]
pub struct ScriptedExtractor {
    failing_pages: Mutex<HashSet<usize>>,
    fail_count: AtomicBool,
    delay: Mutex<Option<Duration>>,
    extracted: Mutex<Vec<usize>>,
    count_calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, page: usize) {
        self.failing_pages.lock().insert(page);
    }

    pub fn clear_failures(&self) {
        self.failing_pages.lock().clear();
    }

    pub fn fail_page_count(&self) {
        self.fail_count.store(true, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Every attempted extraction, in call order
    pub fn extracted_pages(&self) -> Vec<usize> {
        self.extracted.lock().clone()
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    fn pages(data: &[u8]) -> Result<Vec<String>, ExtractorError> {
        let text = std::str::from_utf8(data).map_err(|e| ExtractorError::Open(e.to_string()))?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(text.split('\x0c').map(str::to_string).collect())
    }
}

impl PageExtractor for ScriptedExtractor {
    fn page_count(&self, data: &[u8]) -> Result<usize, ExtractorError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(ExtractorError::Open("scripted failure".into()));
        }
        Ok(Self::pages(data)?.len())
    }

    fn extract_page(&self, data: &[u8], page: usize) -> Result<String, ExtractorError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.extracted.lock().push(page);

        if self.failing_pages.lock().contains(&page) {
            return Err(ExtractorError::Page {
                page,
                message: "scripted failure".into(),
            });
        }

        let pages = Self::pages(data)?;
        let total = pages.len();
        page.checked_sub(1)
            .and_then(|i| pages.into_iter().nth(i))
            .ok_or(ExtractorError::NoSuchPage { page, total })
    }
}

/// In-memory store whose `clear` and aggregate writes can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryPageStore,
    fail_clear: AtomicBool,
    fail_aggregate: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_clear(&self, fail: bool) {
        self.fail_clear.store(fail, Ordering::SeqCst);
    }

    pub fn fail_aggregate(&self, fail: bool) {
        self.fail_aggregate.store(fail, Ordering::SeqCst);
    }

    fn injected(key: &str) -> CacheError {
        CacheError::Io {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "injected"),
        }
    }
}

#[async_trait]
impl PageStore for FlakyStore {
    async fn has(&self, doc: &str, page: usize) -> crate::cache::Result<bool> {
        self.inner.has(doc, page).await
    }

    async fn get(&self, doc: &str, page: usize) -> crate::cache::Result<Option<String>> {
        self.inner.get(doc, page).await
    }

    async fn put(&self, doc: &str, page: usize, content: &str) -> crate::cache::Result<()> {
        self.inner.put(doc, page, content).await
    }

    async fn clear(&self, doc: &str) -> crate::cache::Result<()> {
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(Self::injected(doc));
        }
        self.inner.clear(doc).await
    }

    async fn get_aggregate(&self, doc: &str) -> crate::cache::Result<Option<String>> {
        self.inner.get_aggregate(doc).await
    }

    async fn put_aggregate(&self, doc: &str, content: &str) -> crate::cache::Result<()> {
        if self.fail_aggregate.load(Ordering::SeqCst) {
            return Err(Self::injected(doc));
        }
        self.inner.put_aggregate(doc, content).await
    }

    async fn remove_aggregate(&self, doc: &str) -> crate::cache::Result<()> {
        self.inner.remove_aggregate(doc).await
    }
}

/// Fully wired state over a temp upload directory
pub struct TestApp {
    pub state: AppState,
    pub extractor: Arc<ScriptedExtractor>,
    dir: TempDir,
}

impl TestApp {
    /// In-memory page cache
    pub async fn new(batch_size: usize) -> Self {
        Self::with_store(batch_size, |_| -> Arc<dyn PageStore> {
            Arc::new(MemoryPageStore::new())
        })
    }

    /// Production filesystem page cache under `<tmp>/extracted`
    pub async fn on_disk(batch_size: usize) -> Self {
        Self::with_store(batch_size, |config| -> Arc<dyn PageStore> {
            Arc::new(FsPageStore::new(
                config.storage.cache_dir.clone(),
                config.extraction.format.extension(),
            ))
        })
    }

    pub fn with_store(
        batch_size: usize,
        store: impl FnOnce(&Config) -> Arc<dyn PageStore>,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.upload_dir = dir.path().join("uploads");
        config.storage.cache_dir = dir.path().join("extracted");
        config.extraction.batch_size = batch_size;
        config.extraction.format = ContentFormat::Text;
        config.extraction.timeout_secs = 5;

        let extractor = Arc::new(ScriptedExtractor::new());
        let store = store(&config);
        let state = AppState::new(config, extractor.clone(), store);

        Self {
            state,
            extractor,
            dir,
        }
    }

    /// Directory the filesystem cache writes to
    pub fn cache_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("extracted")
    }

    /// Upload a fake document through the content facade
    pub async fn upload(&self, name: &str, pages: usize) -> DocumentName {
        let doc = DocumentName::parse(name).unwrap();
        self.state
            .content()
            .upload(&doc, &fake_document(pages))
            .await
            .unwrap();
        doc
    }
}
