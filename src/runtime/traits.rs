//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::db::{Database, DbError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<DbError> for StorageError {
    fn from(err: DbError) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Key-value persistence for conversation snapshots
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the blob stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a key-value store
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for DatabaseStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.db.get_entry(key)?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.db.put_entry(key, value)?)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.db.delete_entry(key)?;
        Ok(())
    }
}
