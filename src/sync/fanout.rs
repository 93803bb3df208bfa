// Fan-out routing
//
// Every node hears every node's traffic on the shared pattern, so each
// inbound message is classified locally:
// - Loopback: published by this node, dropped
// - Malformed: could not be decoded, dropped with a diagnostic
// - ForeignNamespace: meant for another namespace, dropped
// - Sync: state replication, handed to the replicator
// - Event: a remote client event, delivered locally and never re-published

use crate::codec::{BroadcastOptions, Codec, CodecError, Envelope, Packet};
use crate::identity::{NodeId, TopicNamer};
use crate::transport::InboundMessage;

/// Classification of an inbound message
#[derive(Debug)]
pub enum Route {
    Loopback,
    Malformed(CodecError),
    ForeignNamespace(String),
    Sync(Packet),
    Event {
        packet: Packet,
        options: BroadcastOptions,
    },
}

/// Decides what happens to inbound traffic for one namespace
pub struct FanoutRouter<'a> {
    node_id: &'a NodeId,
    topics: &'a TopicNamer,
    namespace: &'a str,
    codec: &'a dyn Codec,
}

impl<'a> FanoutRouter<'a> {
    pub fn new(
        node_id: &'a NodeId,
        topics: &'a TopicNamer,
        namespace: &'a str,
        codec: &'a dyn Codec,
    ) -> Self {
        Self {
            node_id,
            topics,
            namespace,
            codec,
        }
    }

    /// Classify an inbound message
    pub fn route(&self, message: &InboundMessage) -> Route {
        // Checked before decoding: our own traffic is never worth the work
        if self.topics.is_own_topic(&message.topic, self.node_id) {
            return Route::Loopback;
        }

        let Envelope {
            mut packet,
            options,
        } = match self.codec.decode(&message.payload) {
            Ok(envelope) => envelope,
            Err(e) => return Route::Malformed(e),
        };

        packet.normalize();
        if packet.namespace() != self.namespace {
            return Route::ForeignNamespace(packet.namespace().to_string());
        }

        if options.shared {
            Route::Sync(packet)
        } else {
            Route::Event { packet, options }
        }
    }
}

/// Envelope to publish for a local broadcast, or `None` for remote-origin packets
pub fn outbound(packet: &Packet, options: &BroadcastOptions, remote: bool) -> Option<Envelope> {
    if remote {
        return None;
    }
    Some(Envelope::new(packet.clone(), options.clone()))
}
