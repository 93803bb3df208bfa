// Storage module - PERSISTENCE
// Durable snapshot stores used by snapshot-mode replication

mod redis;
mod store;

pub use redis::RedisSnapshotStore;
pub use store::{SledSnapshotStore, SnapshotStore, StoreError, DEFAULT_SNAPSHOT_KEY};
