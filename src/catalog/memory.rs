/*!
 * In-memory catalog store.
 *
 * Documents live in ordered maps so enumeration order is deterministic.
 * Writes can be made to fail for chosen document ids to exercise the
 * per-document persistence failure path.
 */

use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{CatalogStore, Document, DocumentFilter, PartialUpdate};
use crate::errors::StoreError;

/// Catalog store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    /// collection -> id -> document
    collections: RwLock<BTreeMap<String, BTreeMap<String, Document>>>,

    /// Ids whose writes are rejected
    failing_writes: RwLock<HashSet<String>>,

    /// Number of successful writes
    writes: AtomicUsize,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one collection
    pub fn with_collection(name: &str, documents: impl IntoIterator<Item = Document>) -> Self {
        let store = Self::new();
        store.insert_all(name, documents);
        store
    }

    /// Insert or replace a document
    pub fn insert(&self, collection: &str, document: Document) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(document.id.clone(), document);
    }

    /// Insert or replace many documents
    pub fn insert_all(&self, collection: &str, documents: impl IntoIterator<Item = Document>) {
        let mut collections = self.collections.write();
        let target = collections.entry(collection.to_string()).or_default();
        for document in documents {
            target.insert(document.id.clone(), document);
        }
    }

    /// Read back a document
    pub fn get(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Make every write to `id` fail
    pub fn fail_writes_for(&self, id: &str) {
        self.failing_writes.write().insert(id.to_string());
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn count(&self, collection: &str, filter: &DocumentFilter) -> Result<usize, StoreError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|docs| docs.values().filter(|doc| filter.matches(doc)).count())
            .unwrap_or(0))
    }

    async fn ids(&self, collection: &str, filter: &DocumentFilter) -> Result<Vec<String>, StoreError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| filter.matches(doc))
                    .map(|doc| doc.id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_by_ids(&self, collection: &str, ids: &[String]) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| docs.get(id).cloned()).collect())
    }

    async fn apply_update(
        &self,
        collection: &str,
        id: &str,
        update: &PartialUpdate,
    ) -> Result<(), StoreError> {
        if self.failing_writes.read().contains(id) {
            return Err(StoreError::WriteRejected(id.to_string()));
        }

        let mut collections = self.collections.write();
        let document = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        document.apply(update);
        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!("Updated {} field(s) of {}/{}", update.len(), collection, id);
        Ok(())
    }
}
