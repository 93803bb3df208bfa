// Namespace Adapter - The heart of the mesh
//
// Plugs one host namespace into the mesh:
// - broadcast: deliver locally, then publish for every other node
// - handle_message: route inbound traffic to local delivery or replication
// - sync: announce local state changes to peers

use crate::codec::{BroadcastOptions, Codec, Envelope, Packet};
use crate::identity::{NodeId, TopicNamer};
use crate::state::SharedStateHandle;
use crate::sync::error::AdapterError;
use crate::sync::fanout::{outbound, FanoutRouter, Route};
use crate::sync::host::HostNamespace;
use crate::sync::replication::{Replicator, SyncOutcome};
use crate::transport::{InboundMessage, Publisher, Subscription};
use std::sync::Arc;
use tracing::{debug, warn};

/// What happened to an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Our own message coming back
    Loopback,
    /// Undecodable payload
    Malformed,
    /// Addressed to a different namespace
    ForeignNamespace,
    /// Remote event handed to local clients
    Delivered,
    /// Sync message applied
    Synced(SyncOutcome),
    /// Sync message could not be applied
    SyncFailed,
}

/// Statistics about an adapter
#[derive(Clone, Debug, Default)]
pub struct AdapterStats {
    pub messages_received: u64,
    pub loopback_dropped: u64,
    pub namespace_filtered: u64,
    pub malformed_dropped: u64,
    pub remote_delivered: u64,
    pub published: u64,
    pub publish_errors: u64,
    pub syncs_sent: u64,
    pub syncs_applied: u64,
    pub syncs_ignored: u64,
    pub sync_errors: u64,
}

/// One host namespace attached to the mesh
pub struct NamespaceAdapter<P: Publisher, H: HostNamespace> {
    node_id: NodeId,
    topics: TopicNamer,
    namespace: String,
    publisher: P,
    codec: Arc<dyn Codec>,
    host: H,
    state: SharedStateHandle,
    replicator: Arc<dyn Replicator>,
    inbound: Option<Subscription>,
    stats: AdapterStats,
}

impl<P: Publisher, H: HostNamespace> NamespaceAdapter<P, H> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        node_id: NodeId,
        topics: TopicNamer,
        publisher: P,
        codec: Arc<dyn Codec>,
        host: H,
        state: SharedStateHandle,
        replicator: Arc<dyn Replicator>,
        inbound: Option<Subscription>,
    ) -> Self {
        Self {
            node_id,
            topics,
            namespace: host.name().to_string(),
            publisher,
            codec,
            host,
            state,
            replicator,
            inbound,
            stats: AdapterStats::default(),
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Topic this adapter publishes on
    pub fn self_topic(&self) -> String {
        self.topics.node_topic(&self.node_id)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// The shared state this adapter replicates
    pub fn state(&self) -> &SharedStateHandle {
        &self.state
    }

    pub fn stats(&self) -> &AdapterStats {
        &self.stats
    }

    /// Whether inbound traffic is flowing (false after a failed subscribe)
    pub fn is_replicating(&self) -> bool {
        self.inbound.is_some()
    }

    // ========================================================================
    // FAN-OUT
    // ========================================================================

    /// Broadcast a locally emitted packet
    ///
    /// Local clients always receive it, even if publishing to the mesh
    /// then fails.
    pub async fn broadcast(
        &mut self,
        packet: Packet,
        options: BroadcastOptions,
    ) -> Result<(), AdapterError> {
        self.broadcast_from(packet, options, false).await
    }

    async fn broadcast_from(
        &mut self,
        packet: Packet,
        options: BroadcastOptions,
        remote: bool,
    ) -> Result<(), AdapterError> {
        self.host.deliver(&packet, &options);

        match outbound(&packet, &options, remote) {
            Some(envelope) => self.publish(&envelope).await,
            None => Ok(()),
        }
    }

    async fn publish(&mut self, envelope: &Envelope) -> Result<(), AdapterError> {
        let payload = self.codec.encode(envelope)?;
        let topic = self.self_topic();

        match self.publisher.publish(&topic, payload).await {
            Ok(()) => {
                self.stats.published += 1;
                Ok(())
            }
            Err(e) => {
                self.stats.publish_errors += 1;
                warn!(node_id = %self.node_id, topic = %topic, error = %e, "publish failed");
                let error = AdapterError::Transport(e);
                self.host.on_error(&error);
                Err(error)
            }
        }
    }

    // ========================================================================
    // INBOUND
    // ========================================================================

    /// Route one inbound message
    pub async fn handle_message(&mut self, message: InboundMessage) -> Dispatch {
        self.stats.messages_received += 1;

        let route = FanoutRouter::new(
            &self.node_id,
            &self.topics,
            &self.namespace,
            self.codec.as_ref(),
        )
        .route(&message);

        match route {
            Route::Loopback => {
                self.stats.loopback_dropped += 1;
                debug!(topic = %message.topic, "ignore same node id");
                Dispatch::Loopback
            }
            Route::Malformed(e) => {
                self.stats.malformed_dropped += 1;
                warn!(topic = %message.topic, codec = self.codec.name(), error = %e, "dropping undecodable message");
                Dispatch::Malformed
            }
            Route::ForeignNamespace(namespace) => {
                self.stats.namespace_filtered += 1;
                debug!(namespace = %namespace, "ignore different namespace");
                Dispatch::ForeignNamespace
            }
            Route::Sync(packet) => self.apply_sync(packet).await,
            Route::Event { packet, options } => {
                // Remote origin: deliver only, re-publishing would relay forever
                if let Err(e) = self.broadcast_from(packet, options, true).await {
                    warn!(error = %e, "remote delivery failed");
                }
                self.stats.remote_delivered += 1;
                Dispatch::Delivered
            }
        }
    }

    async fn apply_sync(&mut self, packet: Packet) -> Dispatch {
        match self.replicator.inbound(packet, &self.state).await {
            Ok(SyncOutcome::Ignored) => {
                self.stats.syncs_ignored += 1;
                Dispatch::Synced(SyncOutcome::Ignored)
            }
            Ok(outcome) => {
                self.stats.syncs_applied += 1;
                Dispatch::Synced(outcome)
            }
            Err(e) => {
                self.stats.sync_errors += 1;
                warn!(namespace = %self.namespace, error = %e, "failed to apply sync");
                Dispatch::SyncFailed
            }
        }
    }

    /// Wait for the next inbound message; `None` once the subscription ends
    /// or if there never was one
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        self.inbound.as_mut()?.recv().await
    }

    /// Handle every message already queued, without waiting
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(message) = self.inbound.as_mut().and_then(|rx| rx.try_recv().ok()) {
            self.handle_message(message).await;
            handled += 1;
        }
        handled
    }

    /// Handle inbound messages until the subscription closes
    pub async fn run(&mut self) {
        while let Some(message) = self.recv().await {
            self.handle_message(message).await;
        }
        debug!(namespace = %self.namespace, "inbound subscription closed");
    }

    // ========================================================================
    // REPLICATION
    // ========================================================================

    /// Announce local state to peers; call after every local mutation
    pub async fn sync(&mut self) -> Result<(), AdapterError> {
        let envelope = match self.replicator.outbound(&self.namespace, &self.state).await {
            Ok(envelope) => envelope,
            Err(e) => {
                self.stats.sync_errors += 1;
                warn!(namespace = %self.namespace, error = %e, "sync aborted before publish");
                return Err(e.into());
            }
        };

        self.publish(&envelope).await?;
        self.stats.syncs_sent += 1;
        Ok(())
    }

    /// Pull shared state on demand (snapshot mode); a no-op under merge
    pub async fn fetch_shared(&mut self) -> Result<SyncOutcome, AdapterError> {
        Ok(self.replicator.fetch(&self.state).await?)
    }
}
