// Topic naming
//
// Every node publishes on `{prefix}#{node_id}` and subscribes to
// `{prefix}#*`, so it hears every node sharing the prefix, itself included.

use crate::identity::NodeId;

/// Separator between the prefix and the publishing node's id
pub const TOPIC_SEPARATOR: char = '#';

/// Prefix used when none is configured
pub const DEFAULT_TOPIC_PREFIX: &str = "eventmesh";

/// Derives topic names from a prefix
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicNamer {
    prefix: String,
}

impl Default for TopicNamer {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_PREFIX)
    }
}

impl TopicNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The topic a node publishes on
    pub fn node_topic(&self, node_id: &NodeId) -> String {
        format!("{}{}{}", self.prefix, TOPIC_SEPARATOR, node_id)
    }

    /// The pattern every node subscribes to
    pub fn pattern(&self) -> String {
        format!("{}{}*", self.prefix, TOPIC_SEPARATOR)
    }

    /// Extract the publisher id from a concrete topic (suffix after the last `#`)
    pub fn publisher_of<'a>(&self, topic: &'a str) -> Option<&'a str> {
        topic
            .rsplit_once(TOPIC_SEPARATOR)
            .map(|(_, suffix)| suffix)
    }

    /// Whether a topic was published by `node_id`
    pub fn is_own_topic(&self, topic: &str, node_id: &NodeId) -> bool {
        self.publisher_of(topic)
            .is_some_and(|publisher| node_id == publisher)
    }
}
