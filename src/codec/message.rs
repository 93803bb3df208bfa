// Wire Messages - The envelope every node publishes
//
// An envelope is the `[Packet, BroadcastOptions]` pair:
// - Packet: namespace tag plus the opaque application payload
// - BroadcastOptions: routing hints passed through untouched, plus the
//   `shared` framing bit that marks a state-sync message

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Namespace assumed when a packet arrives without one
pub const DEFAULT_NAMESPACE: &str = "/";

/// An application event as emitted by the host
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Logical channel group; `None` on the wire means [`DEFAULT_NAMESPACE`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Opaque event payload (or the shared state, for merge syncs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Packet {
    /// Create a packet for a namespace carrying `data`
    pub fn new(namespace: impl Into<String>, data: Value) -> Self {
        Self {
            namespace: Some(namespace.into()),
            data: Some(data),
        }
    }

    /// Create a packet with no payload (used for snapshot sync markers)
    pub fn marker(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            data: None,
        }
    }

    /// The namespace, falling back to `"/"` when absent
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Fill in the default namespace if the packet has none
    pub fn normalize(&mut self) {
        if self.namespace.is_none() {
            self.namespace = Some(DEFAULT_NAMESPACE.to_string());
        }
    }
}

/// Routing hints for a broadcast
///
/// The core never interprets `rooms`, `except` or `flags`; they are carried
/// to the host on every node. `shared` is protocol framing, not an
/// application option.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BroadcastOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rooms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub flags: Map<String, Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub shared: bool,
}

impl BroadcastOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options marking a state-sync message
    pub fn shared() -> Self {
        Self {
            shared: true,
            ..Self::default()
        }
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.rooms.push(room.into());
        self
    }

    pub fn with_except(mut self, room: impl Into<String>) -> Self {
        self.except.push(room.into());
        self
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: Value) -> Self {
        self.flags.insert(name.into(), value);
        self
    }
}

/// The `[Packet, BroadcastOptions]` pair exchanged between nodes
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "EnvelopePair", into = "EnvelopePair")]
pub struct Envelope {
    pub packet: Packet,
    pub options: BroadcastOptions,
}

impl Envelope {
    pub fn new(packet: Packet, options: BroadcastOptions) -> Self {
        Self { packet, options }
    }

    /// Whether this envelope carries a state sync rather than a client event
    pub fn is_sync(&self) -> bool {
        self.options.shared
    }
}

/// Positional form of an envelope; a bare `[packet]` reads as empty options
#[derive(Clone, Serialize, Deserialize)]
struct EnvelopePair(Packet, #[serde(default)] BroadcastOptions);

impl From<EnvelopePair> for Envelope {
    fn from(EnvelopePair(packet, options): EnvelopePair) -> Self {
        Self { packet, options }
    }
}

impl From<Envelope> for EnvelopePair {
    fn from(envelope: Envelope) -> Self {
        EnvelopePair(envelope.packet, envelope.options)
    }
}
