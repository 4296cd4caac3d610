//! SQLite-backed storage for vidmark.
//!
//! Provides the [`SqliteStorage`] struct that wraps a `rusqlite::Connection`
//! and automatically runs table migrations on open.

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use super::area::{ContextProbe, StorageArea, StorageMap};
use super::migrations;
use crate::types::errors::StorageError;

/// Durable key-value storage, one row per key in the `kv_store` table.
///
/// Multi-key writes run inside a single transaction, so a `set` either lands
/// completely or not at all.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (or creates) a SQLite database at the given file path and runs migrations.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the connection cannot be established or migrations fail.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory SQLite database and runs migrations.
    ///
    /// The data is discarded when the `SqliteStorage` is dropped.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Returns the applied table schema version.
    pub fn table_version(&self) -> Result<i32, StorageError> {
        let conn = self.connection()?;
        Ok(migrations::get_table_version(&conn))
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Backend(format!("connection lock poisoned: {}", e)))
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    fn decode(key: &str, raw: &str) -> Result<serde_json::Value, StorageError> {
        serde_json::from_str(raw)
            .map_err(|e| StorageError::Serialization(format!("value for '{}': {}", key, e)))
    }
}

impl StorageArea for SqliteStorage {
    async fn get(&self, keys: &[&str]) -> Result<StorageMap, StorageError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT value FROM kv_store WHERE key = ?1")?;
        let mut result = StorageMap::new();
        for key in keys {
            let mut rows = stmt.query(params![key])?;
            if let Some(row) = rows.next()? {
                let raw: String = row.get(0)?;
                result.insert((*key).to_string(), Self::decode(key, &raw)?);
            }
        }
        Ok(result)
    }

    async fn get_all(&self) -> Result<StorageMap, StorageError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT key, value FROM kv_store ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut result = StorageMap::new();
        for row in rows {
            let (key, raw) = row?;
            let value = Self::decode(&key, &raw)?;
            result.insert(key, value);
        }
        Ok(result)
    }

    async fn set(&self, items: StorageMap) -> Result<(), StorageError> {
        let mut conn = self.connection()?;
        let now = Self::now();
        let tx = conn.transaction()?;
        for (key, value) in &items {
            let raw = serde_json::to_string(value)?;
            tx.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, raw, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.connection()?.execute("DELETE FROM kv_store", [])?;
        Ok(())
    }
}

impl ContextProbe for SqliteStorage {
    fn is_reachable(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn
                .query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
                .is_ok(),
            Err(_) => false,
        }
    }
}
