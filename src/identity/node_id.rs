use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of random bytes in a node id (48 bits of collision space)
pub const NODE_ID_BYTES: usize = 6;

#[derive(Error, Debug)]
pub enum NodeIdError {
    #[error("Invalid node id length: expected {expected} hex chars, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Invalid hex in node id: {0}")]
    InvalidHex(String),
}

/// Per-process identity of a mesh node
///
/// Generated once at startup and never persisted. Rendered as lowercase hex,
/// which never contains the `#` topic separator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Generate a random node id
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; NODE_ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Parse a node id from its hex form
    pub fn parse(s: &str) -> Result<Self, NodeIdError> {
        let expected = NODE_ID_BYTES * 2;
        if s.len() != expected {
            return Err(NodeIdError::InvalidLength {
                expected,
                got: s.len(),
            });
        }

        hex::decode(s).map_err(|e| NodeIdError::InvalidHex(e.to_string()))?;
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// The hex string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
