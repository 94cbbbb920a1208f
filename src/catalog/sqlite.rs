/*!
 * SQLite-backed catalog store.
 *
 * Documents are stored as JSON bodies. Every operation runs on the blocking
 * thread pool through `spawn_blocking` so the async coordinator never stalls
 * on disk I/O.
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::schema;
use super::{CatalogStore, Document, DocumentFilter, PartialUpdate};
use crate::errors::StoreError;

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "catalog.db";

/// Default database directory name under user's data directory
const DEFAULT_DB_DIRNAME: &str = "catalogtl";

/// Catalog store over a single SQLite connection
#[derive(Clone)]
pub struct SqliteCatalogStore {
    /// Path to the database file
    db_path: PathBuf,
    /// Thread-safe connection wrapped in Arc<Mutex>
    connection: Arc<Mutex<Connection>>,
}

impl SqliteCatalogStore {
    /// Open (or create) a catalog database at the specified path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
            }
        }

        info!("Opening catalog at: {:?}", db_path);

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;
        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory catalog (for testing)
    pub fn open_in_memory() -> Result<Self> {
        debug!("Creating in-memory catalog");

        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the default database path
    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Insert or replace documents in one transaction
    pub async fn import(&self, collection: &str, documents: Vec<Document>) -> Result<usize, StoreError> {
        let collection = collection.to_string();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO documents (collection, id, body, updated_at) \
                     VALUES (?1, ?2, ?3, datetime('now'))",
                )?;
                for document in &documents {
                    let body = serde_json::to_string(&document.fields)?;
                    stmt.execute(params![collection, document.id, body])?;
                }
            }
            tx.commit()?;
            Ok(documents.len())
        })
        .await
    }

    /// Run a closure against the connection on the blocking pool
    async fn with_connection<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Database(format!("Failed to acquire database lock: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Database(format!("Database task panicked: {}", e)))?
    }
}

/// JSON path addressing a top-level field
fn field_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

fn decode_body(id: String, body: &str) -> Result<Document, StoreError> {
    let fields: Map<String, Value> = serde_json::from_str(body)?;
    Ok(Document { id, fields })
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn count(&self, collection: &str, filter: &DocumentFilter) -> Result<usize, StoreError> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.with_connection(move |conn| {
            let count: i64 = match &filter {
                DocumentFilter::All => conn.query_row(
                    "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                    params![collection],
                    |row| row.get(0),
                )?,
                DocumentFilter::MissingField(field) => conn.query_row(
                    "SELECT COUNT(*) FROM documents WHERE collection = ?1 AND json_extract(body, ?2) IS NULL",
                    params![collection, field_path(field)],
                    |row| row.get(0),
                )?,
            };
            Ok(count.max(0) as usize)
        })
        .await
    }

    async fn ids(&self, collection: &str, filter: &DocumentFilter) -> Result<Vec<String>, StoreError> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.with_connection(move |conn| {
            let ids = match &filter {
                DocumentFilter::All => {
                    let mut stmt =
                        conn.prepare("SELECT id FROM documents WHERE collection = ?1 ORDER BY id")?;
                    let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                }
                DocumentFilter::MissingField(field) => {
                    let mut stmt = conn.prepare(
                        "SELECT id FROM documents WHERE collection = ?1 \
                         AND json_extract(body, ?2) IS NULL ORDER BY id",
                    )?;
                    let rows = stmt.query_map(params![collection, field_path(field)], |row| {
                        row.get::<_, String>(0)
                    })?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                }
            };
            Ok(ids)
        })
        .await
    }

    async fn find_by_ids(&self, collection: &str, ids: &[String]) -> Result<Vec<Document>, StoreError> {
        let collection = collection.to_string();
        let ids = ids.to_vec();
        self.with_connection(move |conn| {
            let mut stmt =
                conn.prepare("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")?;
            let mut documents = Vec::with_capacity(ids.len());
            for id in ids {
                let body: Option<String> = stmt
                    .query_row(params![collection, id], |row| row.get(0))
                    .optional()?;
                if let Some(body) = body {
                    documents.push(decode_body(id, &body)?);
                }
            }
            Ok(documents)
        })
        .await
    }

    async fn apply_update(
        &self,
        collection: &str,
        id: &str,
        update: &PartialUpdate,
    ) -> Result<(), StoreError> {
        let collection = collection.to_string();
        let id = id.to_string();
        let update = update.clone();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            let body: Option<String> = tx
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(body) = body else {
                return Err(StoreError::NotFound { collection, id });
            };

            let mut document = decode_body(id, &body)?;
            document.apply(&update);
            let body = serde_json::to_string(&document.fields)?;

            tx.execute(
                "UPDATE documents SET body = ?3, updated_at = datetime('now') \
                 WHERE collection = ?1 AND id = ?2",
                params![collection, document.id, body],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
