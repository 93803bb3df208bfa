// Identity module - WHO IS PUBLISHING
// Per-process node ids and the topic names derived from them

mod node_id;
mod topic;

pub use node_id::{NodeId, NodeIdError, NODE_ID_BYTES};
pub use topic::{TopicNamer, DEFAULT_TOPIC_PREFIX, TOPIC_SEPARATOR};
