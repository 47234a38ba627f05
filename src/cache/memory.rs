//! In-memory page store

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{PageStore, Result};

#[derive(Default)]
struct DocumentPages {
    pages: BTreeMap<usize, String>,
    aggregate: Option<String>,
}

/// Volatile page store, for tests and throwaway instances
#[derive(Default)]
pub struct MemoryPageStore {
    documents: RwLock<HashMap<String, DocumentPages>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn has(&self, doc: &str, page: usize) -> Result<bool> {
        Ok(self
            .documents
            .read()
            .get(doc)
            .is_some_and(|d| d.pages.contains_key(&page)))
    }

    async fn get(&self, doc: &str, page: usize) -> Result<Option<String>> {
        Ok(self
            .documents
            .read()
            .get(doc)
            .and_then(|d| d.pages.get(&page).cloned()))
    }

    async fn put(&self, doc: &str, page: usize, content: &str) -> Result<()> {
        self.documents
            .write()
            .entry(doc.to_string())
            .or_default()
            .pages
            .insert(page, content.to_string());
        Ok(())
    }

    async fn clear(&self, doc: &str) -> Result<()> {
        self.documents.write().remove(doc);
        Ok(())
    }

    async fn get_aggregate(&self, doc: &str) -> Result<Option<String>> {
        Ok(self
            .documents
            .read()
            .get(doc)
            .and_then(|d| d.aggregate.clone()))
    }

    async fn put_aggregate(&self, doc: &str, content: &str) -> Result<()> {
        self.documents
            .write()
            .entry(doc.to_string())
            .or_default()
            .aggregate = Some(content.to_string());
        Ok(())
    }

    async fn remove_aggregate(&self, doc: &str) -> Result<()> {
        if let Some(d) = self.documents.write().get_mut(doc) {
            d.aggregate = None;
        }
        Ok(())
    }
}
