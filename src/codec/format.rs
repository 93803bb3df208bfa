use crate::codec::message::{BroadcastOptions, Envelope, Packet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to encode envelope: {0}")]
    EncodeError(String),

    #[error("Failed to decode envelope: {0}")]
    DecodeError(String),
}

/// Binary codec for envelopes crossing the transport
///
/// Implementations must be symmetric: `decode(encode(e)) == e`.
pub trait Codec: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Encode an envelope to bytes
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, CodecError>;

    /// Decode an envelope from bytes
    fn decode(&self, bytes: &[u8]) -> Result<Envelope, CodecError>;
}

/// Postcard frame for an envelope
///
/// Postcard is not self-describing, so the opaque JSON values ride along as
/// embedded JSON byte strings.
#[derive(Serialize, Deserialize)]
struct WireFrame {
    namespace: Option<String>,
    data: Option<Vec<u8>>,
    rooms: Vec<String>,
    except: Vec<String>,
    flags: Option<Vec<u8>>,
    shared: bool,
}

/// Compact binary codec (postcard framing, JSON for opaque payloads)
#[derive(Clone, Copy, Debug, Default)]
pub struct PostcardCodec;

impl PostcardCodec {
    pub fn new() -> Self {
        Self
    }

    fn embed(value: &Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::EncodeError(e.to_string()))
    }

    fn extract(bytes: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::DecodeError(e.to_string()))
    }
}

impl Codec for PostcardCodec {
    fn name(&self) -> &'static str {
        "postcard"
    }

    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
        let Envelope { packet, options } = envelope;

        let flags = if options.flags.is_empty() {
            None
        } else {
            Some(Self::embed(&Value::Object(options.flags.clone()))?)
        };

        let frame = WireFrame {
            namespace: packet.namespace.clone(),
            data: packet.data.as_ref().map(Self::embed).transpose()?,
            rooms: options.rooms.clone(),
            except: options.except.clone(),
            flags,
            shared: options.shared,
        };

        postcard::to_allocvec(&frame).map_err(|e| CodecError::EncodeError(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Envelope, CodecError> {
        let frame: WireFrame =
            postcard::from_bytes(bytes).map_err(|e| CodecError::DecodeError(e.to_string()))?;

        let flags = match frame.flags.as_deref().map(Self::extract).transpose()? {
            None => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(CodecError::DecodeError(format!(
                    "flags must be an object, got {other}"
                )))
            }
        };

        let packet = Packet {
            namespace: frame.namespace,
            data: frame.data.as_deref().map(Self::extract).transpose()?,
        };
        let options = BroadcastOptions {
            rooms: frame.rooms,
            except: frame.except,
            flags,
            shared: frame.shared,
        };

        Ok(Envelope::new(packet, options))
    }
}

/// JSON codec, encoding the envelope as a two-element array
///
/// Larger on the wire than [`PostcardCodec`] but readable with any
/// pub/sub client, which helps when debugging a mesh.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(envelope).map_err(|e| CodecError::EncodeError(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Envelope, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::DecodeError(e.to_string()))
    }
}
