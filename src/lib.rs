//! Multi-node event bus over pub/sub.
//!
//! Several server processes share one logical event bus: an event emitted
//! on one node reaches clients on every node, and a keyed game store
//! converges across nodes through merge or snapshot replication.

pub mod codec;
pub mod identity;
pub mod state;
pub mod storage;
pub mod sync;
pub mod transport;
