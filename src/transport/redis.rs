// Redis Transport
// Publisher and pattern subscriber backed by a Redis-compatible server through fred

use crate::transport::traits::{
    pattern_matches, InboundMessage, Publisher, Subscriber, Subscription, TransportError,
};
use fred::clients::SubscriberClient;
use fred::prelude::*;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

impl From<fred::error::Error> for TransportError {
    fn from(err: fred::error::Error) -> Self {
        TransportError::ConnectionFailed(err.to_string())
    }
}

/// Publishing connection
#[derive(Clone)]
pub struct RedisPublisher {
    client: Client,
}

impl RedisPublisher {
    /// Wrap an already-initialized client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// The underlying client, e.g. to share it with a snapshot store
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Publisher for RedisPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let receivers: i64 = self
            .client
            .publish(topic, Value::Bytes(payload.into()))
            .await
            .map_err(|e| TransportError::PublishFailed(format!("{topic}: {e}")))?;
        debug!(topic, receivers, "published");
        Ok(())
    }
}

/// Subscribing connection
///
/// Redis puts a connection into subscriber mode once it subscribes, so this
/// is always a separate connection from the publisher.
#[derive(Clone)]
pub struct RedisSubscriber {
    client: SubscriberClient,
}

impl RedisSubscriber {
    /// Wrap an already-initialized subscriber client
    pub fn from_client(client: SubscriberClient) -> Self {
        Self { client }
    }
}

impl Subscriber for RedisSubscriber {
    async fn psubscribe(&self, pattern: &str) -> Result<Subscription, TransportError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut messages = self.client.message_rx();

        self.client
            .psubscribe(pattern)
            .await
            .map_err(|e| TransportError::SubscribeFailed(format!("{pattern}: {e}")))?;
        info!(pattern, "pattern subscription active");

        let pattern = pattern.to_string();
        tokio::spawn(async move {
            loop {
                match messages.recv().await {
                    Ok(message) => {
                        let topic = message.channel.to_string();
                        if !pattern_matches(&pattern, &topic) {
                            continue;
                        }
                        let Some(payload) = message.value.as_bytes().map(<[u8]>::to_vec) else {
                            warn!(topic, "dropping non-binary pub/sub payload");
                            continue;
                        };
                        if sender.send(InboundMessage::new(&pattern, topic, payload)).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(pattern, skipped, "subscriber lagged, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!(pattern, "pattern subscription closed");
        });

        Ok(receiver)
    }
}

/// Normalize `host:port` or a full URL into a Redis URL
pub fn redis_url(target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("redis://{target}")
    }
}

/// Open the publisher and subscriber connections for a Redis target
pub async fn connect_redis(target: &str) -> Result<(RedisPublisher, RedisSubscriber), TransportError> {
    let url = redis_url(target);
    let config = Config::from_url(&url)
        .map_err(|e| TransportError::InvalidConfig(format!("invalid Redis URL {url}: {e}")))?;

    let publisher = Builder::from_config(config.clone()).build()?;
    publisher.init().await?;

    let subscriber = Builder::from_config(config).build_subscriber_client()?;
    subscriber.init().await?;
    // Re-issue subscriptions after a reconnect
    let _ = subscriber.manage_subscriptions();

    info!(url = %url, "connected to Redis");
    Ok((
        RedisPublisher::from_client(publisher),
        RedisSubscriber::from_client(subscriber),
    ))
}
