// Host Namespace - Where events meet connected clients
//
// The event-bus host owns client connections. An adapter only needs three
// things from it: the namespace it serves, a way to fan a packet out to
// local clients, and somewhere to report errors.

use crate::codec::{BroadcastOptions, Packet};
use crate::sync::error::AdapterError;
use tokio::sync::mpsc;
use tracing::error;

/// Capabilities an adapter needs from the host's per-namespace context
pub trait HostNamespace {
    /// Namespace this context serves (e.g. `"/"` or `"/chat"`)
    fn name(&self) -> &str;

    /// Push a packet to every locally connected client matching `options`
    fn deliver(&self, packet: &Packet, options: &BroadcastOptions);

    /// Non-fatal adapter error (failed subscribe or publish)
    fn on_error(&self, error: &AdapterError) {
        error!(namespace = self.name(), error = %error, "adapter error");
    }
}

/// What a [`ChannelHost`] forwards
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Delivered {
        packet: Packet,
        options: BroadcastOptions,
    },
    Error(String),
}

/// Host that forwards deliveries and errors into a channel
///
/// Lets the host drain deliveries on its own task, and lets tests observe
/// exactly what reached "local clients".
#[derive(Clone)]
pub struct ChannelHost {
    name: String,
    events: mpsc::UnboundedSender<HostEvent>,
}

impl ChannelHost {
    pub fn new(name: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let host = Self {
            name: name.into(),
            events,
        };
        (host, receiver)
    }
}

impl HostNamespace for ChannelHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, packet: &Packet, options: &BroadcastOptions) {
        // The host side may have shut down; delivery is best-effort
        let _ = self.events.send(HostEvent::Delivered {
            packet: packet.clone(),
            options: options.clone(),
        });
    }

    fn on_error(&self, error: &AdapterError) {
        error!(namespace = %self.name, error = %error, "adapter error");
        let _ = self.events.send(HostEvent::Error(error.to_string()));
    }
}
