//! Remote document tier.
//!
//! The remote tier is shared across hosts/processes and may be slow or
//! unavailable; its consistency model (eventual, best-effort) is
//! inherited as-is by the store. `SqliteRemoteTier` is the shipped
//! implementation, a single-table document store in the same spirit as
//! the hosted backends it stands in for.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::Value;
use tracing::info;

use crate::error::CacheError;

/// A keyed document store holding persisted cache records.
///
/// Implementations must not panic on backend failure; every operation
/// returns `CacheError::Remote` instead, and the store treats that as a
/// degraded tier.
#[async_trait]
pub trait RemoteTier: Send + Sync {
    /// Fetch the record for a key, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Write (or replace) the record for a key.
    async fn put(&self, key: &str, record: &Value) -> Result<(), CacheError>;

    /// Remove the record for a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// List all (key, record) pairs, for sweeps and stats.
    async fn list(&self) -> Result<Vec<(String, Value)>, CacheError>;
}

/// SQLite-backed document tier.
///
/// One row per canonical city key, record stored as a JSON blob. The
/// connection is wrapped in a Mutex since rusqlite Connection is not
/// Sync; every operation is a single short statement so the lock is
/// never held across unbounded I/O.
pub struct SqliteRemoteTier {
    conn: Mutex<Connection>,
}

impl SqliteRemoteTier {
    /// Open (or create) the document store at the given path.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Remote(e.to_string()))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| CacheError::Remote(format!("failed to open document store: {}", e)))?;
        let tier = Self::init(conn)?;
        info!("Remote cache tier opened at {}", path.display());
        Ok(tier)
    }

    /// Open an in-memory document store (for testing).
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CacheError::Remote(format!("failed to open in-memory store: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             CREATE TABLE IF NOT EXISTS event_cache (
                 key TEXT PRIMARY KEY,
                 record TEXT NOT NULL
             );",
        )
        .map_err(|e| CacheError::Remote(format!("failed to initialize schema: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, CacheError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CacheError::Remote(format!("connection lock poisoned: {}", e)))?;
        f(&conn).map_err(|e| CacheError::Remote(e.to_string()))
    }
}

#[async_trait]
impl RemoteTier for SqliteRemoteTier {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let raw: Option<String> = self.with_conn(|conn| {
            match conn.query_row(
                "SELECT record FROM event_cache WHERE key = ?1",
                [key],
                |row| row.get(0),
            ) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, record: &Value) -> Result<(), CacheError> {
        let text = serde_json::to_string(record)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO event_cache (key, record) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET record = excluded.record",
                rusqlite::params![key, text],
            )
        })?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.with_conn(|conn| conn.execute("DELETE FROM event_cache WHERE key = ?1", [key]))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(String, Value)>, CacheError> {
        let rows: Vec<(String, String)> = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, record FROM event_cache")?;
            let mapped = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            mapped.collect()
        })?;

        // Unparseable documents are surfaced as Null so sweeps can remove them.
        Ok(rows
            .into_iter()
            .map(|(key, text)| {
                let value = serde_json::from_str(&text).unwrap_or(Value::Null);
                (key, value)
            })
            .collect())
    }
}
