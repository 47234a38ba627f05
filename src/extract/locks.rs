//! Per-document serialization
//!
//! One async mutex per cache key. Writers of a document's cache (batch
//! extraction, forced extraction, saves, upload resets) hold it for their
//! whole operation; different documents never contend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of per-document locks
#[derive(Clone, Default)]
pub struct DocumentLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a document
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.inner.lock();
            // Entries only referenced by the registry are idle
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        mutex.lock_owned().await
    }

    /// Number of documents with a held or awaited lock
    #[cfg(test)]
    pub fn active(&self) -> usize {
        let mut locks = self.inner.lock();
        locks.retain(|_, m| Arc::strong_count(m) > 1);
        locks.len()
    }
}
