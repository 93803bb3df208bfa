// Snapshot Store - Durable home of the shared state in snapshot mode
//
// Snapshot replication writes the whole state as one JSON string under a
// fixed key, then peers read it back. Any key-value store reachable by every
// node can play this part.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Key the shared state is stored under unless configured otherwise
pub const DEFAULT_SNAPSHOT_KEY: &str = "gameArray:data";

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    OpenFailed(String),

    #[error("Store operation failed: {0}")]
    DatabaseError(String),

    #[error("Stored value is not valid UTF-8: {0}")]
    InvalidEncoding(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Key-value store holding JSON snapshots
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Store a JSON string under `key`
    async fn set(&self, key: &str, json: &str) -> Result<(), StoreError>;

    /// Read the JSON string under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Snapshot store on an embedded sled database
///
/// Only nodes sharing the same `sled::Db` handle see each other's writes,
/// which makes this the store for single-process meshes and tests.
#[derive(Clone)]
pub struct SledSnapshotStore {
    db: sled::Db,
}

impl SledSnapshotStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// Wrap an open database
    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    /// Delete a key
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.db.remove(key.as_bytes())?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for SledSnapshotStore {
    async fn set(&self, key: &str, json: &str) -> Result<(), StoreError> {
        self.db.insert(key.as_bytes(), json.as_bytes())?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => {
                let json = String::from_utf8(bytes.to_vec())
                    .map_err(|e| StoreError::InvalidEncoding(e.to_string()))?;
                Ok(Some(json))
            }
            None => Ok(None),
        }
    }
}
