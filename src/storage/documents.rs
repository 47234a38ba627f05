//! Document Store
//!
//! Local filesystem storage for uploaded source documents.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::types::{DocumentInfo, DocumentName, StorageError, StoredDocument};
use crate::extract::{run_blocking, PageExtractor};

/// Page count remembered for a specific on-disk version of a document
#[derive(Debug, Clone, Copy)]
struct CountedVersion {
    size: u64,
    modified: Option<SystemTime>,
    pages: usize,
}

/// Flat-directory document store
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<DocumentStoreInner>,
}

struct DocumentStoreInner {
    root: PathBuf,
    extractor: Arc<dyn PageExtractor>,
    timeout: Duration,
    page_counts: RwLock<HashMap<String, CountedVersion>>,
}

impl DocumentStore {
    pub fn new(root: PathBuf, extractor: Arc<dyn PageExtractor>, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(DocumentStoreInner {
                root,
                extractor,
                timeout,
                page_counts: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Path of a document's bytes on disk
    pub fn path(&self, name: &DocumentName) -> PathBuf {
        self.inner.root.join(name.as_str())
    }

    /// Check whether a document has been uploaded
    pub async fn exists(&self, name: &DocumentName) -> Result<bool, StorageError> {
        match tokio::fs::metadata(self.path(name)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(name.as_str(), e)),
        }
    }

    /// Read a document's bytes
    pub async fn open(&self, name: &DocumentName) -> Result<Arc<Vec<u8>>, StorageError> {
        match tokio::fs::read(self.path(name)).await {
            Ok(data) => Ok(Arc::new(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(StorageError::io(name.as_str(), e)),
        }
    }

    /// Number of pages in a document
    ///
    /// Counts are remembered per (size, mtime) so a replaced upload is
    /// re-counted.
    pub async fn page_count(&self, name: &DocumentName) -> Result<usize, StorageError> {
        let meta = match tokio::fs::metadata(self.path(name)).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(StorageError::NotFound(name.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => return Err(StorageError::io(name.as_str(), e)),
        };
        let size = meta.len();
        let modified = meta.modified().ok();

        if let Some(counted) = self.inner.page_counts.read().get(name.as_str()) {
            if counted.size == size && counted.modified == modified {
                return Ok(counted.pages);
            }
        }

        let data = self.open(name).await?;
        let extractor = Arc::clone(&self.inner.extractor);
        let pages = run_blocking(self.inner.timeout, move || extractor.page_count(&data))
            .await
            .map_err(|source| StorageError::Unreadable {
                name: name.to_string(),
                source,
            })?;

        self.inner.page_counts.write().insert(
            name.as_str().to_string(),
            CountedVersion {
                size,
                modified,
                pages,
            },
        );

        tracing::debug!(document = %name, pages, "Counted document pages");
        Ok(pages)
    }

    /// Store (or replace) a document's bytes
    ///
    /// Bytes are written to a temporary file and renamed into place, so a
    /// reader never observes a half-written upload.
    pub async fn save(
        &self,
        name: &DocumentName,
        data: &[u8],
    ) -> Result<StoredDocument, StorageError> {
        tokio::fs::create_dir_all(&self.inner.root)
            .await
            .map_err(|e| StorageError::io(name.as_str(), e))?;

        let tmp_path = self.inner.root.join(format!(".{}.upload", Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&tmp_path, data).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StorageError::io(name.as_str(), e));
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, self.path(name)).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StorageError::io(name.as_str(), e));
        }

        self.inner.page_counts.write().remove(name.as_str());

        let sha256 = compute_hash(data);
        tracing::info!(
            document = %name,
            size = data.len(),
            sha256 = %sha256,
            "Stored document"
        );

        Ok(StoredDocument {
            name: name.to_string(),
            size: data.len() as u64,
            sha256,
        })
    }

    /// List uploaded documents, sorted by name
    pub async fn list(&self) -> Result<Vec<DocumentInfo>, StorageError> {
        let root = self.inner.root.display().to_string();
        let mut entries = match tokio::fs::read_dir(&self.inner.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(root, e)),
        };

        let mut documents = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(root.clone(), e))?
        {
            let file_name = entry.file_name().to_string_lossy().to_string();
            // Skips in-flight uploads and anything that is not a valid name
            if DocumentName::parse(&file_name).is_err() {
                continue;
            }

            let meta = entry
                .metadata()
                .await
                .map_err(|e| StorageError::io(file_name.clone(), e))?;
            if !meta.is_file() {
                continue;
            }

            documents.push(DocumentInfo {
                name: file_name,
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        documents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(documents)
    }
}

/// Compute SHA-256 hash of data
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
