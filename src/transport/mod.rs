// Transport module - THE WIRE (abstract)
// Publish / pattern-subscribe seam plus the in-process and Redis bindings

mod memory;
mod redis;
mod traits;

pub use traits::{
    // Core traits
    Publisher, Subscriber,
    // Messages
    InboundMessage, Subscription,
    // Errors
    TransportError,
    // Helpers
    pattern_matches,
};

pub use memory::MemoryBroker;

pub use redis::{connect_redis, redis_url, RedisPublisher, RedisSubscriber};
