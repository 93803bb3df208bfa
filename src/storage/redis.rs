// Redis Snapshot Store
// SET/GET of the shared-state snapshot on the same Redis the mesh publishes through

use crate::storage::store::{SnapshotStore, StoreError};
use async_trait::async_trait;
use fred::prelude::*;

impl From<fred::error::Error> for StoreError {
    fn from(err: fred::error::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Snapshot store on a Redis-compatible server
#[derive(Clone)]
pub struct RedisSnapshotStore {
    client: Client,
}

impl RedisSnapshotStore {
    /// Connect to the server at `url` (`redis://host:port[/db]`)
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::OpenFailed(format!("invalid Redis URL {url}: {e}")))?;
        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("snapshot store connected");
        Ok(Self { client })
    }

    /// Reuse an already-initialized client (e.g. the publisher's)
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SnapshotStore for RedisSnapshotStore {
    async fn set(&self, key: &str, json: &str) -> Result<(), StoreError> {
        let _: () = self.client.set(key, json, None, None, false).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = self.client.get(key).await?;
        Ok(value)
    }
}
