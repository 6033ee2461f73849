use crate::store::document_store::DocumentStore;
use crate::store::error::StoreError;
use crate::store::listeners::{notify, read_snapshot, ListenerRegistry};
use crate::store::models::{
    check_collection_path, merge_fields, record_path, split_record_path, Document, Fields,
    Subscription, WatchTarget,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::task;
use tracing::{debug, error, info};
use uuid::Uuid;

/// A SQLite implementation of the DocumentStore trait
///
/// Every record is one row keyed by its full path, with its fields stored as JSON.
/// Subscriptions are served in-process: only writes made through this instance are pushed.
pub struct SqliteDocumentStore {
    connection: Arc<Mutex<Connection>>,
    listeners: ListenerRegistry,
}

impl SqliteDocumentStore {
    /// Create a new SqliteDocumentStore with the given database path
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        info!("Creating SQLite document store at path: {db_path}");

        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).map_err(|e| {
                    error!("Failed to create directory {parent:?}: {e}");
                    StoreError::OpenError(format!("Failed to create directory: {e}"))
                })?;
            }
        }

        let connection = Connection::open(db_path).map_err(|e| {
            error!("Failed to open SQLite database at {db_path}: {e}");
            StoreError::OpenError(format!("Failed to open SQLite database: {e}"))
        })?;

        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS documents (
                    path TEXT PRIMARY KEY,
                    collection TEXT NOT NULL,
                    doc_id TEXT NOT NULL,
                    fields TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                [],
            )
            .map_err(|e| {
                error!("Failed to create documents table: {e}");
                StoreError::OpenError(format!("Failed to create documents table: {e}"))
            })?;

        connection
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection)",
                [],
            )
            .map_err(|e| {
                error!("Failed to create collection index: {e}");
                StoreError::OpenError(format!("Failed to create collection index: {e}"))
            })?;

        info!("SQLite document store initialized successfully at: {db_path}");
        Ok(SqliteDocumentStore {
            connection: Arc::new(Mutex::new(connection)),
            listeners: ListenerRegistry::new(),
        })
    }

    fn encode_fields(path: &str, fields: &Fields) -> Result<String, StoreError> {
        serde_json::to_string(fields)
            .map_err(|e| StoreError::DecodeError(path.to_string(), e.to_string()))
    }

    fn decode_fields(path: &str, text: &str) -> Result<Fields, StoreError> {
        serde_json::from_str(text).map_err(|e| {
            error!("Corrupt fields stored for {path}: {e}");
            StoreError::DecodeError(path.to_string(), e.to_string())
        })
    }

    fn read_fields(conn: &Connection, path: &str) -> Result<Option<Fields>, StoreError> {
        let stored: Option<String> = conn
            .query_row(
                "SELECT fields FROM documents WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| {
                error!("Failed to read record {path}: {e}");
                StoreError::OperationError(format!("Failed to read record: {e}"))
            })?;

        stored
            .map(|text| Self::decode_fields(path, &text))
            .transpose()
    }

    /// Run a blocking closure against the connection on the blocking pool
    async fn with_connection<T, F>(&self, operation: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);

        task::spawn_blocking(move || {
            let conn = match connection.lock() {
                Ok(conn) => conn,
                Err(_) => {
                    error!("Failed to acquire database lock");
                    return Err(StoreError::Locked);
                }
            };
            f(&conn)
        })
        .await
        .map_err(|e| {
            error!("Task panic while running {operation}: {e}");
            StoreError::OperationError(format!("Task panic: {e}"))
        })?
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create_record(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        check_collection_path(collection)?;

        let id = Uuid::new_v4().simple().to_string();
        let path = record_path(collection, &id);
        let mut initial = Fields::new();
        merge_fields(&mut initial, fields);
        let encoded = Self::encode_fields(&path, &initial)?;

        let collection_str = collection.to_string();
        let path_str = path.clone();
        let id_str = id.clone();
        self.with_connection("create_record", move |conn| {
            conn.execute(
                "INSERT INTO documents (path, collection, doc_id, fields) VALUES (?1, ?2, ?3, ?4)",
                params![path_str, collection_str, id_str, encoded],
            )
            .map_err(|e| {
                error!("Failed to insert record {path_str}: {e}");
                StoreError::OperationError(format!("Failed to insert record: {e}"))
            })?;

            debug!("Created record {path_str}");
            Ok(())
        })
        .await?;

        notify(self, &self.listeners, &path).await;
        Ok(id)
    }

    async fn merge_write_record(&self, path: &str, fields: Fields) -> Result<(), StoreError> {
        let (collection, id) = split_record_path(path)?;

        let path_str = path.to_string();
        let collection_str = collection.to_string();
        let id_str = id.to_string();
        self.with_connection("merge_write_record", move |conn| {
            let existing = Self::read_fields(conn, &path_str)?;
            let exists = existing.is_some();
            let mut merged = existing.unwrap_or_default();
            merge_fields(&mut merged, fields);
            let encoded = Self::encode_fields(&path_str, &merged)?;

            // UPDATE keeps the rowid, so listing order is creation order
            let result = if exists {
                conn.execute(
                    "UPDATE documents SET fields = ?1 WHERE path = ?2",
                    params![encoded, path_str],
                )
            } else {
                conn.execute(
                    "INSERT INTO documents (path, collection, doc_id, fields) VALUES (?1, ?2, ?3, ?4)",
                    params![path_str, collection_str, id_str, encoded],
                )
            };
            result.map_err(|e| {
                error!("Failed to merge-write record {path_str}: {e}");
                StoreError::OperationError(format!("Failed to write record: {e}"))
            })?;

            debug!("Merge-wrote record {path_str}");
            Ok(())
        })
        .await?;

        notify(self, &self.listeners, path).await;
        Ok(())
    }

    async fn delete_record(&self, path: &str) -> Result<(), StoreError> {
        split_record_path(path)?;

        let path_str = path.to_string();
        self.with_connection("delete_record", move |conn| {
            let removed = conn
                .execute("DELETE FROM documents WHERE path = ?1", params![path_str])
                .map_err(|e| {
                    error!("Failed to delete record {path_str}: {e}");
                    StoreError::OperationError(format!("Failed to delete record: {e}"))
                })?;

            debug!("Deleted record {path_str} ({removed} rows)");
            Ok(())
        })
        .await?;

        notify(self, &self.listeners, path).await;
        Ok(())
    }

    async fn get_record(&self, path: &str) -> Result<Option<Document>, StoreError> {
        split_record_path(path)?;

        let path_str = path.to_string();
        self.with_connection("get_record", move |conn| {
            Self::read_fields(conn, &path_str)?
                .map(|fields| Document::new(&path_str, fields))
                .transpose()
        })
        .await
    }

    async fn list_records(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        check_collection_path(collection)?;

        let collection_str = collection.to_string();
        self.with_connection("list_records", move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT path, doc_id, fields FROM documents WHERE collection = ?1 ORDER BY rowid",
                )
                .map_err(|e| {
                    error!("Failed to prepare listing of {collection_str}: {e}");
                    StoreError::OperationError(format!("Failed to prepare statement: {e}"))
                })?;

            let rows = stmt
                .query_map(params![collection_str], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(|e| {
                    error!("Failed to list {collection_str}: {e}");
                    StoreError::OperationError(format!("Failed to list records: {e}"))
                })?;

            let mut documents = Vec::new();
            for row in rows {
                let (path, id, fields) = row.map_err(|e| {
                    StoreError::OperationError(format!("Failed to read row: {e}"))
                })?;
                let fields = Self::decode_fields(&path, &fields)?;
                documents.push(Document { id, path, fields });
            }
            Ok(documents)
        })
        .await
    }

    async fn subscribe(&self, target: WatchTarget) -> Result<Subscription, StoreError> {
        let initial = read_snapshot(self, &target).await?;
        self.listeners.register(target, initial)
    }
}
