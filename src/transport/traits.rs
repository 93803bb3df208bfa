// Transport Traits and Core Types
// Defines the abstract publish / pattern-subscribe seam every transport binding implements

use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// INBOUND MESSAGE
// ============================================================================

/// A message delivered by a pattern subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// The pattern that matched
    pub pattern: String,
    /// The concrete topic the message was published on
    pub topic: String,
    /// Encoded envelope
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(pattern: impl Into<String>, topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            pattern: pattern.into(),
            topic: topic.into(),
            payload,
        }
    }
}

/// Stream of messages for one pattern subscription
pub type Subscription = mpsc::UnboundedReceiver<InboundMessage>;

// ============================================================================
// TRANSPORT ERRORS
// ============================================================================

/// Errors that can occur in the transport layer
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Subscribe failed: {0}")]
    SubscribeFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// ============================================================================
// TRANSPORT TRAITS
// ============================================================================

/// Publishing half of a pub/sub transport
#[allow(async_fn_in_trait)]
pub trait Publisher: Clone {
    /// Publish an encoded message on a topic
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;
}

/// Subscribing half of a pub/sub transport
#[allow(async_fn_in_trait)]
pub trait Subscriber {
    /// Subscribe to every topic matching a glob pattern
    async fn psubscribe(&self, pattern: &str) -> Result<Subscription, TransportError>;
}

// ============================================================================
// PATTERN MATCHING
// ============================================================================

/// Glob match in the style of Redis `PSUBSCRIBE`: `*` matches any run of
/// characters, `?` exactly one, `\` escapes the next character.
pub fn pattern_matches(pattern: &str, topic: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let topic: Vec<char> = topic.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position after the last `*` and the topic index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while t < topic.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p + 1, t));
                p += 1;
                continue;
            }
            Some('?') => {
                p += 1;
                t += 1;
                continue;
            }
            Some('\\') if pattern.get(p + 1) == topic.get(t) && p + 1 < pattern.len() => {
                p += 2;
                t += 1;
                continue;
            }
            Some(c) if *c != '\\' && Some(c) == topic.get(t) => {
                p += 1;
                t += 1;
                continue;
            }
            _ => {}
        }

        match backtrack {
            Some((star_p, star_t)) => {
                p = star_p;
                t = star_t + 1;
                backtrack = Some((star_p, star_t + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
