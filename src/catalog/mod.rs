/*!
 * Catalog data model and store abstraction.
 *
 * The pipeline treats the media catalog as a generic keyed-document store.
 * It only needs four operations from it:
 * - count documents matching a filter
 * - enumerate the ids of documents matching a filter
 * - fetch documents by an id set
 * - apply a per-document partial update
 *
 * Two stores are provided:
 * - `memory`: an in-process store used by tests and dry runs
 * - `sqlite`: a SQLite-backed store holding documents as JSON bodies
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::errors::StoreError;

pub mod memory;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryCatalogStore;
pub use sqlite::SqliteCatalogStore;

/// A catalog record: a stable identifier plus an opaque JSON body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier, immutable and unique within its collection
    #[serde(rename = "_id")]
    pub id: String,

    /// Every other field of the record
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Create an empty document with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a raw field value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a field as text, if it is a JSON string
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Overwrite the named top-level fields with the values of an update
    pub fn apply(&mut self, update: &PartialUpdate) {
        for (name, value) in update.iter() {
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

/// New values for some top-level fields of one document.
///
/// Nested structures are always carried whole: applying an update replaces
/// each named field wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialUpdate {
    fields: BTreeMap<String, Value>,
}

impl PartialUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a new value for a field
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

/// Selection of documents for count and enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFilter {
    /// Every document of the collection
    All,
    /// Documents that do not carry the named field (or carry it as null)
    MissingField(String),
}

impl DocumentFilter {
    /// Whether a document is selected by this filter
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::All => true,
            Self::MissingField(name) => document.get(name).is_none_or(Value::is_null),
        }
    }
}

/// Keyed-document store consumed by the pipeline
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Count the documents of a collection matching a filter
    async fn count(&self, collection: &str, filter: &DocumentFilter) -> Result<usize, StoreError>;

    /// Enumerate document ids matching a filter, in a deterministic order
    async fn ids(&self, collection: &str, filter: &DocumentFilter) -> Result<Vec<String>, StoreError>;

    /// Fetch documents by id, in the order of `ids`; unknown ids are skipped
    async fn find_by_ids(&self, collection: &str, ids: &[String]) -> Result<Vec<Document>, StoreError>;

    /// Replace the named top-level fields of one document.
    ///
    /// There is no optimistic-concurrency check: a concurrent writer of the
    /// same field loses its update.
    async fn apply_update(
        &self,
        collection: &str,
        id: &str,
        update: &PartialUpdate,
    ) -> Result<(), StoreError>;
}
