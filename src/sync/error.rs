use crate::codec::CodecError;
use crate::state::StateError;
use crate::storage::StoreError;
use crate::sync::config::ConfigError;
use crate::transport::TransportError;
use thiserror::Error;

/// Replication-related errors
#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("Snapshot store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to decode shared state: {0}")]
    Decode(String),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// Errors surfaced by a namespace adapter
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Replication error: {0}")]
    Replication(#[from] ReplicationError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
