// Sync module - HOW NODES TALK
// Fan-out of client events, state replication, and the adapters tying them to a host

mod adapter;
mod config;
mod error;
mod fanout;
mod host;
mod node;
mod replication;

pub use adapter::{AdapterStats, Dispatch, NamespaceAdapter};
pub use config::{ConfigError, MeshConfig, ReplicationMode};
pub use error::{AdapterError, ReplicationError};
pub use fanout::{outbound, FanoutRouter, Route};
pub use host::{ChannelHost, HostEvent, HostNamespace};
pub use node::{replicator_for, MeshNode};
pub use replication::{MergeReplicator, Replicator, SnapshotReplicator, SyncOutcome};
