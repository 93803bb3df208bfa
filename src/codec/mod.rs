// Codec module - THE WIRE FORMAT
// Envelope types and the injectable binary codecs that carry them

mod format;
mod message;

pub use format::{Codec, CodecError, JsonCodec, PostcardCodec};
pub use message::{BroadcastOptions, Envelope, Packet, DEFAULT_NAMESPACE};
