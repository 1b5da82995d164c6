//! Key-value stores backing the dedup guard.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rusqlite::params;
use tokio_rusqlite::Connection;
use tracing::debug;

use artifact_sync_protocols::{KeyValueStore, StoreError};

use crate::schema::init_schema;

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// SQLite-backed store.
pub struct SqliteKvStore {
    conn: Connection,
}

impl SqliteKvStore {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(Self { conn })
    }

    /// Open (or create) a file-backed database. Missing parent directories
    /// are created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?;
        }
        debug!("Opening state database: {:?}", path);

        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| {
                let value = conn.query_row("SELECT value FROM kv WHERE key = ?1", [&key], |row| {
                    row.get::<_, String>(0)
                });
                match value {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        let value = value.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![key, value, now],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }
}
