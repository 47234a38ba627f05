//! Durable per-page content cache
//!
//! Presence of an entry means "extracted" (an empty string is a blank page,
//! not a missing one). Entries live until the document is re-uploaded; there
//! is no eviction.
//!
//! Backends implement [`PageStore`]; [`PageCache`] adds the derived cursor
//! and aggregate handling on top of any backend.

mod fs;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use fs::FsPageStore;
pub use memory::MemoryPageStore;

use crate::storage::DocumentName;

/// Separator placed between pages in exports and aggregates
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Cache storage errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache entry {0} is not valid UTF-8")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Key-value storage for cached pages
///
/// `doc` is the document's cache key. Implementations must allow concurrent
/// writes to different keys; same-key writes are last-writer-wins.
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn has(&self, doc: &str, page: usize) -> Result<bool>;

    /// `None` means "not yet computed"
    async fn get(&self, doc: &str, page: usize) -> Result<Option<String>>;

    /// Overwrite an entry; never reports success for a partial write
    async fn put(&self, doc: &str, page: usize, content: &str) -> Result<()>;

    /// Remove every entry and the aggregate for a document
    async fn clear(&self, doc: &str) -> Result<()>;

    async fn get_aggregate(&self, doc: &str) -> Result<Option<String>>;

    async fn put_aggregate(&self, doc: &str, content: &str) -> Result<()>;

    async fn remove_aggregate(&self, doc: &str) -> Result<()>;
}

/// Page cache over a pluggable store
#[derive(Clone)]
pub struct PageCache {
    store: Arc<dyn PageStore>,
}

impl PageCache {
    pub fn new(store: Arc<dyn PageStore>) -> Self {
        Self { store }
    }

    pub async fn has(&self, doc: &DocumentName, page: usize) -> Result<bool> {
        self.store.has(doc.cache_key(), page).await
    }

    pub async fn get(&self, doc: &DocumentName, page: usize) -> Result<Option<String>> {
        self.store.get(doc.cache_key(), page).await
    }

    /// Write a page and drop the now-stale aggregate
    ///
    /// The aggregate goes first: a reader may see the old aggregate only
    /// while the old page is still in place.
    pub async fn put(&self, doc: &DocumentName, page: usize, content: &str) -> Result<()> {
        self.store.remove_aggregate(doc.cache_key()).await?;
        self.store.put(doc.cache_key(), page, content).await
    }

    pub async fn clear(&self, doc: &DocumentName) -> Result<()> {
        self.store.clear(doc.cache_key()).await?;
        tracing::info!(document = %doc, "Cleared page cache");
        Ok(())
    }

    /// Largest `h` such that pages `1..=h` are all present
    ///
    /// Stops at the first gap; pages present after a gap do not count.
    pub async fn cursor(&self, doc: &DocumentName, total_pages: usize) -> Result<usize> {
        let mut h = 0;
        for page in 1..=total_pages {
            if !self.store.has(doc.cache_key(), page).await? {
                break;
            }
            h = page;
        }
        Ok(h)
    }

    /// Present pages in ascending order, joined by [`PAGE_SEPARATOR`]
    pub async fn join_pages(&self, doc: &DocumentName, total_pages: usize) -> Result<String> {
        let mut parts = Vec::new();
        for page in 1..=total_pages {
            if let Some(content) = self.store.get(doc.cache_key(), page).await? {
                parts.push(content);
            }
        }
        Ok(parts.join(PAGE_SEPARATOR))
    }

    pub async fn aggregate(&self, doc: &DocumentName) -> Result<Option<String>> {
        self.store.get_aggregate(doc.cache_key()).await
    }

    pub async fn put_aggregate(&self, doc: &DocumentName, content: &str) -> Result<()> {
        self.store.put_aggregate(doc.cache_key(), content).await
    }
}
