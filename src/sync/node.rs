// Mesh Node - One process's identity and transport handles
//
// A node is created once per process. Each host namespace gets its own
// adapter from `bind`, but every adapter shares the node's id, topics,
// publisher, state and replication strategy.

use crate::codec::{Codec, PostcardCodec};
use crate::identity::{NodeId, TopicNamer};
use crate::state::SharedStateHandle;
use crate::storage::SnapshotStore;
use crate::sync::adapter::NamespaceAdapter;
use crate::sync::config::{MeshConfig, ReplicationMode};
use crate::sync::error::AdapterError;
use crate::sync::host::HostNamespace;
use crate::sync::replication::{MergeReplicator, Replicator, SnapshotReplicator};
use crate::transport::{Publisher, Subscriber};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the replicator a config asks for
///
/// Snapshot mode needs a store; without one the node falls back to merge.
pub fn replicator_for(
    config: &MeshConfig,
    store: Option<Arc<dyn SnapshotStore>>,
) -> Arc<dyn Replicator> {
    match (config.mode, store) {
        (ReplicationMode::Merge, _) => Arc::new(MergeReplicator::new()),
        (ReplicationMode::Snapshot, Some(store)) => {
            Arc::new(SnapshotReplicator::new(store, config.snapshot_key.clone()))
        }
        (ReplicationMode::Snapshot, None) => {
            warn!("snapshot mode without a snapshot store, using merge replication");
            Arc::new(MergeReplicator::new())
        }
    }
}

/// A process's membership in the mesh
pub struct MeshNode<P: Publisher, S: Subscriber> {
    id: NodeId,
    topics: TopicNamer,
    publisher: P,
    subscriber: S,
    codec: Arc<dyn Codec>,
    state: SharedStateHandle,
    replicator: Arc<dyn Replicator>,
}

impl<P: Publisher, S: Subscriber> MeshNode<P, S> {
    /// Create a node over pre-built transport handles
    pub fn new(
        config: &MeshConfig,
        publisher: P,
        subscriber: S,
        state: SharedStateHandle,
        replicator: Arc<dyn Replicator>,
    ) -> Result<Self, AdapterError> {
        config.validate()?;

        let id = NodeId::generate();
        let topics = TopicNamer::new(config.topic_prefix.clone());
        info!(
            node_id = %id,
            topic = %topics.node_topic(&id),
            mode = %replicator.mode(),
            "mesh node created"
        );

        Ok(Self {
            id,
            topics,
            publisher,
            subscriber,
            codec: Arc::new(PostcardCodec::new()),
            state,
            replicator,
        })
    }

    /// Swap the wire codec (every node of a mesh must use the same one)
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn topics(&self) -> &TopicNamer {
        &self.topics
    }

    /// Topic this node publishes on
    pub fn self_topic(&self) -> String {
        self.topics.node_topic(&self.id)
    }

    pub fn state(&self) -> &SharedStateHandle {
        &self.state
    }

    pub fn replication_mode(&self) -> ReplicationMode {
        self.replicator.mode()
    }

    /// Attach a host namespace to the mesh
    ///
    /// A failed subscription does not fail the bind: the error goes to the
    /// host and the adapter keeps serving local clients without replication.
    pub async fn bind<H: HostNamespace>(&self, host: H) -> NamespaceAdapter<P, H> {
        let pattern = self.topics.pattern();

        let inbound = match self.subscriber.psubscribe(&pattern).await {
            Ok(subscription) => {
                info!(node_id = %self.id, namespace = host.name(), pattern = %pattern, "bound namespace");
                Some(subscription)
            }
            Err(e) => {
                warn!(node_id = %self.id, namespace = host.name(), error = %e, "subscribe failed, running without replication");
                host.on_error(&AdapterError::Transport(e));
                None
            }
        };

        NamespaceAdapter::new(
            self.id.clone(),
            self.topics.clone(),
            self.publisher.clone(),
            Arc::clone(&self.codec),
            host,
            self.state.clone(),
            Arc::clone(&self.replicator),
            inbound,
        )
    }
}
