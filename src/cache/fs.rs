//! Filesystem page store
//!
//! ```text
//! <root>/<doc>/<page>.<ext>     one file per page
//! <root>/<doc>/full.<ext>       aggregate
//! ```
//!
//! Writes go to a hidden temporary file in the same directory and are renamed
//! into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use super::{CacheError, PageStore, Result};

const AGGREGATE_STEM: &str = "full";

/// Filesystem-backed page store
#[derive(Debug, Clone)]
pub struct FsPageStore {
    root: PathBuf,
    extension: &'static str,
}

impl FsPageStore {
    pub fn new(root: PathBuf, extension: &'static str) -> Self {
        Self { root, extension }
    }

    fn doc_dir(&self, doc: &str) -> PathBuf {
        self.root.join(doc)
    }

    fn page_path(&self, doc: &str, page: usize) -> PathBuf {
        self.doc_dir(doc).join(format!("{}.{}", page, self.extension))
    }

    fn aggregate_path(&self, doc: &str) -> PathBuf {
        self.doc_dir(doc)
            .join(format!("{}.{}", AGGREGATE_STEM, self.extension))
    }

    async fn read(&self, path: &Path) -> Result<Option<String>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| CacheError::Encoding(path.display().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, e)),
        }
    }

    async fn write_atomic(&self, doc: &str, path: &Path, content: &str) -> Result<()> {
        let dir = self.doc_dir(doc);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        let tmp_path = dir.join(format!(".{}.tmp", Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&tmp_path, content).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(io_error(path, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(io_error(path, e));
        }
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        key: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl PageStore for FsPageStore {
    async fn has(&self, doc: &str, page: usize) -> Result<bool> {
        let path = self.page_path(doc, page);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error(&path, e))
    }

    async fn get(&self, doc: &str, page: usize) -> Result<Option<String>> {
        self.read(&self.page_path(doc, page)).await
    }

    async fn put(&self, doc: &str, page: usize, content: &str) -> Result<()> {
        let path = self.page_path(doc, page);
        self.write_atomic(doc, &path, content).await?;
        tracing::debug!(document = doc, page, bytes = content.len(), "Cached page");
        Ok(())
    }

    async fn clear(&self, doc: &str) -> Result<()> {
        let dir = self.doc_dir(doc);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&dir, e)),
        }
    }

    async fn get_aggregate(&self, doc: &str) -> Result<Option<String>> {
        self.read(&self.aggregate_path(doc)).await
    }

    async fn put_aggregate(&self, doc: &str, content: &str) -> Result<()> {
        let path = self.aggregate_path(doc);
        self.write_atomic(doc, &path, content).await
    }

    async fn remove_aggregate(&self, doc: &str) -> Result<()> {
        let path = self.aggregate_path(doc);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}
