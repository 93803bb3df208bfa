// Fan-out Tests
// Tests for relaying client events between nodes over a shared broker

use eventmesh::codec::{BroadcastOptions, Codec, Envelope, JsonCodec, Packet, PostcardCodec};
use eventmesh::state::SharedStateHandle;
use eventmesh::sync::{
    ChannelHost, Dispatch, HostEvent, MergeReplicator, MeshConfig, MeshNode,
};
use eventmesh::transport::{MemoryBroker, Publisher};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

fn create_node(broker: &MemoryBroker) -> MeshNode<MemoryBroker, MemoryBroker> {
    MeshNode::new(
        &MeshConfig::default(),
        broker.clone(),
        broker.clone(),
        SharedStateHandle::default(),
        Arc::new(MergeReplicator::new()),
    )
    .expect("Should create node")
}

fn drain(events: &mut UnboundedReceiver<HostEvent>) -> Vec<HostEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

fn delivered_packets(events: &[HostEvent]) -> Vec<Packet> {
    events
        .iter()
        .filter_map(|event| match event {
            HostEvent::Delivered { packet, .. } => Some(packet.clone()),
            HostEvent::Error(_) => None,
        })
        .collect()
}

// ============================================================================
// LOCAL AND REMOTE DELIVERY
// ============================================================================

#[tokio::test]
async fn test_broadcast_delivers_locally_and_publishes() {
    let broker = MemoryBroker::new();
    let node = create_node(&broker);
    let (host, mut events) = ChannelHost::new("/");
    let mut adapter = node.bind(host).await;

    let packet = Packet::new("/", json!(["chat", "hi"]));
    adapter.broadcast(packet.clone(), BroadcastOptions::new()).await.unwrap();

    assert_eq!(delivered_packets(&drain(&mut events)), vec![packet]);
    assert_eq!(broker.published_count(), 1);
    assert_eq!(adapter.stats().published, 1);
}

#[tokio::test]
async fn test_loopback_is_suppressed() {
    let broker = MemoryBroker::new();
    let node = create_node(&broker);
    let (host, mut events) = ChannelHost::new("/");
    let mut adapter = node.bind(host).await;

    adapter
        .broadcast(Packet::new("/", json!("once")), BroadcastOptions::new())
        .await
        .unwrap();
    drain(&mut events);

    // Our own publish comes back through the shared pattern
    let message = adapter.recv().await.expect("Should hear own publish");
    assert_eq!(message.topic, adapter.self_topic());
    assert_eq!(adapter.handle_message(message).await, Dispatch::Loopback);

    assert!(drain(&mut events).is_empty());
    assert_eq!(adapter.stats().loopback_dropped, 1);
}

#[tokio::test]
async fn test_remote_event_delivered_once_and_not_republished() {
    let broker = MemoryBroker::new();
    let node_a = create_node(&broker);
    let node_b = create_node(&broker);
    let (host_a, _events_a) = ChannelHost::new("/");
    let (host_b, mut events_b) = ChannelHost::new("/");
    let mut adapter_a = node_a.bind(host_a).await;
    let mut adapter_b = node_b.bind(host_b).await;

    let packet = Packet::new("/", json!({"event": "move", "x": 3}));
    let options = BroadcastOptions::new().with_room("table-1");
    adapter_a.broadcast(packet.clone(), options.clone()).await.unwrap();

    assert_eq!(adapter_b.process_pending().await, 1);

    let received = drain(&mut events_b);
    assert_eq!(
        received,
        vec![HostEvent::Delivered {
            packet,
            options
        }]
    );
    // Only A's original publish ever hit the broker
    assert_eq!(broker.published_count(), 1);
    assert_eq!(adapter_b.stats().remote_delivered, 1);
    assert_eq!(adapter_b.stats().published, 0);
}

#[tokio::test]
async fn test_three_nodes_each_receive_once() {
    let broker = MemoryBroker::new();
    let nodes: Vec<_> = (0..3).map(|_| create_node(&broker)).collect();

    let mut adapters = Vec::new();
    let mut receivers = Vec::new();
    for node in &nodes {
        let (host, events) = ChannelHost::new("/");
        adapters.push(node.bind(host).await);
        receivers.push(events);
    }

    adapters[0]
        .broadcast(Packet::new("/", json!("hello")), BroadcastOptions::new())
        .await
        .unwrap();

    for adapter in adapters.iter_mut() {
        adapter.process_pending().await;
    }

    for events in receivers.iter_mut() {
        assert_eq!(delivered_packets(&drain(events)).len(), 1);
    }
}

#[tokio::test]
async fn test_json_codec_mesh() {
    let broker = MemoryBroker::new();
    let node_a = create_node(&broker).with_codec(Arc::new(JsonCodec::new()));
    let node_b = create_node(&broker).with_codec(Arc::new(JsonCodec::new()));
    let (host_a, _events_a) = ChannelHost::new("/");
    let (host_b, mut events_b) = ChannelHost::new("/");
    let mut adapter_a = node_a.bind(host_a).await;
    let mut adapter_b = node_b.bind(host_b).await;

    let packet = Packet::new("/", json!({"type": 2, "data": ["ping"]}));
    adapter_a.broadcast(packet.clone(), BroadcastOptions::new()).await.unwrap();
    adapter_b.process_pending().await;

    assert_eq!(delivered_packets(&drain(&mut events_b)), vec![packet]);
}

#[tokio::test]
async fn test_run_drains_queue_then_returns() {
    let broker = MemoryBroker::new();
    let sender = create_node(&broker);
    let receiver = create_node(&broker);
    let (sender_host, _sender_events) = ChannelHost::new("/");
    let (host, mut events) = ChannelHost::new("/");
    let mut from = sender.bind(sender_host).await;
    let mut adapter = receiver.bind(host).await;

    for n in 0..2 {
        from.broadcast(Packet::new("/", json!(n)), BroadcastOptions::new())
            .await
            .unwrap();
    }
    broker.close();

    tokio::time::timeout(Duration::from_secs(5), adapter.run())
        .await
        .expect("run should return once the subscription ends");

    assert_eq!(adapter.stats().messages_received, 2);
    assert_eq!(
        delivered_packets(&drain(&mut events)),
        vec![Packet::new("/", json!(0)), Packet::new("/", json!(1))]
    );
    assert!(adapter.recv().await.is_none());
}

// ============================================================================
// NAMESPACES
// ============================================================================

#[tokio::test]
async fn test_namespace_isolation() {
    let broker = MemoryBroker::new();
    let node_a = create_node(&broker);
    let node_b = create_node(&broker);
    let (host_a, _events_a) = ChannelHost::new("/room1");
    let (host_b, mut events_b) = ChannelHost::new("/room2");
    let mut adapter_a = node_a.bind(host_a).await;
    let mut adapter_b = node_b.bind(host_b).await;

    adapter_a
        .broadcast(Packet::new("/room1", json!("secret")), BroadcastOptions::new())
        .await
        .unwrap();

    let message = adapter_b.recv().await.unwrap();
    assert_eq!(adapter_b.handle_message(message).await, Dispatch::ForeignNamespace);
    assert!(drain(&mut events_b).is_empty());
    assert_eq!(adapter_b.stats().namespace_filtered, 1);
}

#[tokio::test]
async fn test_one_node_many_namespaces() {
    let broker = MemoryBroker::new();
    let sender = create_node(&broker);
    let receiver = create_node(&broker);

    let (host, _events) = ChannelHost::new("/chat");
    let mut chat_sender = sender.bind(host).await;

    let (root_host, mut root_events) = ChannelHost::new("/");
    let (chat_host, mut chat_events) = ChannelHost::new("/chat");
    let mut root = receiver.bind(root_host).await;
    let mut chat = receiver.bind(chat_host).await;
    assert_eq!(root.node_id(), chat.node_id());

    chat_sender
        .broadcast(Packet::new("/chat", json!("hi")), BroadcastOptions::new())
        .await
        .unwrap();
    root.process_pending().await;
    chat.process_pending().await;

    assert!(drain(&mut root_events).is_empty());
    assert_eq!(delivered_packets(&drain(&mut chat_events)).len(), 1);
}

#[tokio::test]
async fn test_missing_namespace_treated_as_root() {
    let broker = MemoryBroker::new();
    let node = create_node(&broker);
    let (host, mut events) = ChannelHost::new("/");
    let mut adapter = node.bind(host).await;

    let bare = Envelope::new(
        Packet {
            namespace: None,
            data: Some(json!("legacy")),
        },
        BroadcastOptions::new(),
    );
    broker
        .publish("eventmesh#ffffffffffff", PostcardCodec.encode(&bare).unwrap())
        .await
        .unwrap();

    let message = adapter.recv().await.unwrap();
    assert_eq!(adapter.handle_message(message).await, Dispatch::Delivered);

    let packets = delivered_packets(&drain(&mut events));
    assert_eq!(packets, vec![Packet::new("/", json!("legacy"))]);
}

// ============================================================================
// FAILURES
// ============================================================================

#[tokio::test]
async fn test_malformed_message_dropped() {
    let broker = MemoryBroker::new();
    let node = create_node(&broker);
    let (host, mut events) = ChannelHost::new("/");
    let mut adapter = node.bind(host).await;

    broker
        .publish("eventmesh#ffffffffffff", vec![0xFF, 0x00, 0xFF])
        .await
        .unwrap();

    let message = adapter.recv().await.unwrap();
    assert_eq!(adapter.handle_message(message).await, Dispatch::Malformed);
    assert!(drain(&mut events).is_empty());
    assert_eq!(adapter.stats().malformed_dropped, 1);
}

#[tokio::test]
async fn test_subscribe_failure_degrades_to_local_only() {
    let broker = MemoryBroker::new();
    broker.set_fail_subscribe(true);
    let node = create_node(&broker);
    let (host, mut events) = ChannelHost::new("/");
    let mut adapter = node.bind(host).await;

    assert!(!adapter.is_replicating());
    assert!(matches!(drain(&mut events).as_slice(), [HostEvent::Error(_)]));

    // Local clients are still served
    let packet = Packet::new("/", json!("still here"));
    adapter.broadcast(packet.clone(), BroadcastOptions::new()).await.unwrap();
    assert_eq!(delivered_packets(&drain(&mut events)), vec![packet]);
    assert!(adapter.recv().await.is_none());
}

#[tokio::test]
async fn test_publish_failure_still_delivers_locally() {
    let broker = MemoryBroker::new();
    let node = create_node(&broker);
    let (host, mut events) = ChannelHost::new("/");
    let mut adapter = node.bind(host).await;
    broker.set_fail_publish(true);

    let packet = Packet::new("/", json!("local"));
    let result = adapter.broadcast(packet.clone(), BroadcastOptions::new()).await;

    assert!(result.is_err());
    let received = drain(&mut events);
    assert_eq!(delivered_packets(&received), vec![packet]);
    assert!(received.iter().any(|e| matches!(e, HostEvent::Error(_))));
    assert_eq!(adapter.stats().publish_errors, 1);
}
