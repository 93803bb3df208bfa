// State Replication - Two ways of converging shared state
//
// Both strategies share one trigger (`sync` after a local mutation) and one
// framing (an envelope whose options carry `shared: true`):
// - Merge: the packet carries the whole state, peers deep-merge it
// - Snapshot: the state goes to a durable store, the packet is a bare
//   marker, peers replace their state with what the store holds

use crate::codec::{BroadcastOptions, Envelope, Packet};
use crate::state::{MergeResult, SharedState, SharedStateHandle};
use crate::storage::SnapshotStore;
use crate::sync::config::ReplicationMode;
use crate::sync::error::ReplicationError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// What applying a sync message did to local state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote state was merged in
    Merged(MergeResult),
    /// Local state was replaced by the stored snapshot
    Replaced { games: usize },
    /// Nothing to apply
    Ignored,
}

/// A replication strategy
#[async_trait]
pub trait Replicator: Send + Sync {
    /// Which strategy this is
    fn mode(&self) -> ReplicationMode;

    /// Prepare the envelope announcing the current state to peers
    ///
    /// Any side effect that must precede publishing (the snapshot write)
    /// happens here; an error means nothing should be published.
    async fn outbound(
        &self,
        namespace: &str,
        state: &SharedStateHandle,
    ) -> Result<Envelope, ReplicationError>;

    /// Apply a sync packet received from a peer
    async fn inbound(
        &self,
        packet: Packet,
        state: &SharedStateHandle,
    ) -> Result<SyncOutcome, ReplicationError>;

    /// Pull state on demand, independently of any peer message
    async fn fetch(&self, _state: &SharedStateHandle) -> Result<SyncOutcome, ReplicationError> {
        Ok(SyncOutcome::Ignored)
    }
}

// ============================================================================
// MERGE STRATEGY
// ============================================================================

/// Publishes the full state; receivers deep-merge it
#[derive(Clone, Copy, Debug, Default)]
pub struct MergeReplicator;

impl MergeReplicator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Replicator for MergeReplicator {
    fn mode(&self) -> ReplicationMode {
        ReplicationMode::Merge
    }

    async fn outbound(
        &self,
        namespace: &str,
        state: &SharedStateHandle,
    ) -> Result<Envelope, ReplicationError> {
        let data = state.read().to_value();
        Ok(Envelope::new(
            Packet::new(namespace, data),
            BroadcastOptions::shared(),
        ))
    }

    async fn inbound(
        &self,
        packet: Packet,
        state: &SharedStateHandle,
    ) -> Result<SyncOutcome, ReplicationError> {
        let Some(data) = packet.data else {
            debug!("sync without data, nothing to merge");
            return Ok(SyncOutcome::Ignored);
        };

        let result = state.write().merge_value(&data)?;
        debug!(
            new_games = result.new_games,
            updated_games = result.updated_games,
            total = result.total_after_merge,
            "merged remote state"
        );
        Ok(SyncOutcome::Merged(result))
    }
}

// ============================================================================
// SNAPSHOT STRATEGY
// ============================================================================

/// Stores the full state externally; receivers re-read and replace
pub struct SnapshotReplicator {
    store: Arc<dyn SnapshotStore>,
    key: String,
}

impl SnapshotReplicator {
    pub fn new(store: Arc<dyn SnapshotStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Key the state is stored under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write the current state to the store
    pub async fn set_shared(&self, state: &SharedStateHandle) -> Result<(), ReplicationError> {
        // Serialize under the lock, write without it
        let json = state.read().to_json()?;
        self.store.set(&self.key, &json).await?;
        debug!(key = %self.key, bytes = json.len(), "snapshot stored");
        Ok(())
    }

    /// Replace local state with the stored snapshot, returning the game count
    pub async fn get_shared(&self, state: &SharedStateHandle) -> Result<usize, ReplicationError> {
        let json = self.store.get(&self.key).await?.unwrap_or_default();
        let fetched = SharedState::from_json(&json)
            .map_err(|e| ReplicationError::Decode(e.to_string()))?;

        let games = fetched.len();
        state.write().replace(fetched);
        info!(key = %self.key, games, "replaced state from snapshot");
        Ok(games)
    }
}

#[async_trait]
impl Replicator for SnapshotReplicator {
    fn mode(&self) -> ReplicationMode {
        ReplicationMode::Snapshot
    }

    async fn outbound(
        &self,
        namespace: &str,
        state: &SharedStateHandle,
    ) -> Result<Envelope, ReplicationError> {
        self.set_shared(state).await?;
        Ok(Envelope::new(Packet::marker(namespace), BroadcastOptions::shared()))
    }

    async fn inbound(
        &self,
        _packet: Packet,
        state: &SharedStateHandle,
    ) -> Result<SyncOutcome, ReplicationError> {
        // The marker's payload is irrelevant: the store is the source of truth
        self.fetch(state).await
    }

    async fn fetch(&self, state: &SharedStateHandle) -> Result<SyncOutcome, ReplicationError> {
        let games = self.get_shared(state).await?;
        Ok(SyncOutcome::Replaced { games })
    }
}
