// eventmesh - a line-driven demo node
//
// Connects to Redis, binds one namespace, and reads commands from stdin:
//   emit <json>                  broadcast an event to every node
//   game <id> [json]             add (or replace) a game, then sync
//   prop <id> <name> <json>      set a game property, then sync
//   user <id> <user> <json>      add a user to a game, then sync
//   chat <id> <json>             append a chat entry, then sync
//   fetch                        pull the stored snapshot (snapshot mode)
//   state                        print the local shared state

use clap::Parser;
use eventmesh::codec::{BroadcastOptions, Packet};
use eventmesh::state::{GameRecord, SharedStateHandle, StateError};
use eventmesh::storage::{RedisSnapshotStore, SnapshotStore};
use eventmesh::sync::{
    replicator_for, ChannelHost, HostEvent, MeshConfig, MeshNode, NamespaceAdapter,
    ReplicationMode,
};
use eventmesh::transport::{connect_redis, RedisPublisher};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "eventmesh", about = "Run a mesh node wired to Redis")]
struct Cli {
    /// Redis target, `host:port` or a `redis://` URL
    #[arg(long, default_value = "127.0.0.1:6379")]
    redis: String,

    /// Topic prefix shared by all nodes of the mesh
    #[arg(long, default_value = eventmesh::identity::DEFAULT_TOPIC_PREFIX)]
    prefix: String,

    /// Namespace this node serves
    #[arg(long, default_value = "/")]
    namespace: String,

    /// Replication strategy: merge or snapshot
    #[arg(long, default_value = "merge")]
    mode: ReplicationMode,

    /// Key the snapshot strategy stores state under
    #[arg(long, default_value = eventmesh::storage::DEFAULT_SNAPSHOT_KEY)]
    snapshot_key: String,
}

type Adapter = NamespaceAdapter<RedisPublisher, ChannelHost>;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!(error = %e, "node stopped");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = MeshConfig::new()
        .with_redis_url(eventmesh::transport::redis_url(&cli.redis))
        .with_topic_prefix(cli.prefix)
        .with_mode(cli.mode)
        .with_snapshot_key(cli.snapshot_key);
    config.validate()?;

    let (publisher, subscriber) = connect_redis(&config.redis_url).await?;

    let store: Option<Arc<dyn SnapshotStore>> = match config.mode {
        ReplicationMode::Snapshot => Some(Arc::new(RedisSnapshotStore::from_client(
            publisher.client().clone(),
        ))),
        ReplicationMode::Merge => None,
    };
    let replicator = replicator_for(&config, store);

    let node = MeshNode::new(
        &config,
        publisher,
        subscriber,
        SharedStateHandle::default(),
        replicator,
    )?;

    let (host, mut host_events) = ChannelHost::new(cli.namespace);
    let mut adapter = node.bind(host).await;

    if node.replication_mode() == ReplicationMode::Snapshot {
        if let Err(e) = adapter.fetch_shared().await {
            error!(error = %e, "initial snapshot fetch failed");
        }
    }

    info!(node_id = %node.id(), topic = %node.self_topic(), "ready, reading commands from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(message) = adapter.recv() => {
                adapter.handle_message(message).await;
            }
            Some(event) = host_events.recv() => match event {
                HostEvent::Delivered { packet, options } => {
                    let data = packet.data.clone().unwrap_or_default();
                    println!("<< [{}] {} {:?}", packet.namespace(), data, options.rooms);
                }
                HostEvent::Error(e) => eprintln!("!! {e}"),
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    if let Err(e) = execute(&mut adapter, line.trim()).await {
                        eprintln!("!! {e}");
                    }
                }
                None => break,
            },
        }
    }

    Ok(())
}

async fn execute(adapter: &mut Adapter, line: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut parts = line.splitn(2, ' ');
    let command = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    match command {
        "" => return Ok(()),
        "emit" => {
            let packet = Packet::new(adapter.namespace(), parse_json(rest)?);
            adapter.broadcast(packet, BroadcastOptions::new()).await?;
            return Ok(());
        }
        "state" => {
            let value = adapter.state().read().to_value();
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }
        "fetch" => {
            let outcome = adapter.fetch_shared().await?;
            println!("{outcome:?}");
            return Ok(());
        }
        "game" => {
            let (id, body) = split_word(rest);
            let record = if body.is_empty() {
                GameRecord::new()
            } else {
                GameRecord::from_value(parse_json(body)?)?
            };
            adapter.state().write().add_game(id, record);
        }
        "prop" => {
            let (id, rest) = split_word(rest);
            let (name, body) = split_word(rest);
            adapter.state().write().set_game_prop(id, name, parse_json(body)?)?;
        }
        "user" => {
            let (id, rest) = split_word(rest);
            let (user, body) = split_word(rest);
            adapter.state().write().add_user(id, user, parse_json(body)?)?;
        }
        "chat" => {
            let (id, body) = split_word(rest);
            let len = adapter.state().write().add_chat(id, parse_json(body)?)?;
            println!("chat length {len}");
        }
        other => return Err(format!("unknown command '{other}'").into()),
    }

    // Every state command falls through to here
    adapter.sync().await?;
    Ok(())
}

fn split_word(input: &str) -> (&str, &str) {
    match input.split_once(' ') {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

fn parse_json(input: &str) -> Result<Value, StateError> {
    Ok(serde_json::from_str(input)?)
}
