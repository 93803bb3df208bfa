// Identity Tests
// Tests for node ids and the topic names derived from them

use eventmesh::identity::{NodeId, TopicNamer, DEFAULT_TOPIC_PREFIX, NODE_ID_BYTES};
use std::collections::HashSet;

// ============================================================================
// NODE ID
// ============================================================================

#[test]
fn test_node_id_length() {
    let id = NodeId::generate();
    assert_eq!(id.as_str().len(), NODE_ID_BYTES * 2);
}

#[test]
fn test_node_ids_are_unique() {
    let ids: HashSet<NodeId> = (0..1000).map(|_| NodeId::generate()).collect();
    assert_eq!(ids.len(), 1000);
}

#[test]
fn test_node_id_never_contains_separator() {
    for _ in 0..100 {
        assert!(!NodeId::generate().as_str().contains('#'));
    }
}

#[test]
fn test_node_id_parse_round_trip() {
    let id = NodeId::generate();
    let parsed = NodeId::parse(id.as_str()).unwrap();
    assert_eq!(parsed, id);
}

// ============================================================================
// TOPIC NAMER
// ============================================================================

#[test]
fn test_default_prefix() {
    let topics = TopicNamer::default();
    assert_eq!(topics.prefix(), DEFAULT_TOPIC_PREFIX);
}

#[test]
fn test_node_topic_and_pattern() {
    let topics = TopicNamer::new("socket.io");
    let id = NodeId::parse("0a1b2c3d4e5f").unwrap();

    assert_eq!(topics.node_topic(&id), "socket.io#0a1b2c3d4e5f");
    assert_eq!(topics.pattern(), "socket.io#*");
}

#[test]
fn test_publisher_is_suffix_after_last_separator() {
    let topics = TopicNamer::new("app");

    assert_eq!(topics.publisher_of("app#abc"), Some("abc"));
    assert_eq!(topics.publisher_of("app#abc#shared"), Some("shared"));
    assert_eq!(topics.publisher_of("no-separator"), None);
}

#[test]
fn test_is_own_topic() {
    let topics = TopicNamer::new("app");
    let me = NodeId::generate();
    let other = NodeId::generate();

    assert!(topics.is_own_topic(&topics.node_topic(&me), &me));
    assert!(!topics.is_own_topic(&topics.node_topic(&other), &me));
}
