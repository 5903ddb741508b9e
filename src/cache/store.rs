//! Key-value stores backing the channel cache.
//!
//! Stores hold opaque text payloads and know nothing about freshness: the
//! channel cache keeps its own timestamp inside the payload.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use rusqlite::{Connection, OptionalExtension, params};

/// Plain get/set by key. No transactions and no expiry.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// SQLite-backed store, one row per key.
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    /// Opens (and if necessary creates) the cache DB. WAL mode keeps the cache
    /// warmer from blocking API readers.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating cache directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening cache DB {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("enabling WAL mode for cache DB")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("setting cache DB synchronous mode")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )
        .context("creating cache_entries table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM cache_entries WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("reading cache key {key}"))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO cache_entries (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )
        .with_context(|| format!("writing cache key {key}"))?;
        Ok(())
    }
}

/// In-process store used when no cache DB is configured.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
