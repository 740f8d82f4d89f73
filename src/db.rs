//! Key-value persistence for profiles and preferences

use crate::error::AppResult;
use crate::paths::{ensure_parent_dir, get_store_path};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed string store with `localStorage` semantics
pub struct KvStore {
    conn: Mutex<Connection>,
}

impl KvStore {
    /// Opens the store in the application data directory
    pub fn open_default() -> AppResult<Self> {
        let path = get_store_path().map_err(crate::error::AppError::Storage)?;
        Self::open(&path)
    }

    /// Opens the store at `path`, creating tables if needed
    pub fn open(path: &Path) -> AppResult<Self> {
        ensure_parent_dir(path).map_err(crate::error::AppError::Storage)?;
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.lock();
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, timestamp],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> AppResult<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Reads a JSON value; unparsable content is treated as absent
    pub fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    log::warn!("[store] Ignoring unparsable value for {}: {}", key, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }
}
