//! Database module
//!
//! A small SQLite-backed key-value table holding cached conversation
//! snapshots, one row per storage key.

mod schema;

use schema::SCHEMA;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and ephemeral hosts)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the value stored under `key`
    pub fn get_entry(&self, key: &str) -> DbResult<Option<String>> {
        let conn = self.conn();
        let value = conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or replace the value stored under `key`
    pub fn put_entry(&self, key: &str, value: &str) -> DbResult<()> {
        let now = Utc::now();
        self.conn().execute(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Delete `key`, returning whether a row existed
    pub fn delete_entry(&self, key: &str) -> DbResult<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
        Ok(deleted > 0)
    }
}
