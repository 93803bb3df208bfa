use crate::identity::{DEFAULT_TOPIC_PREFIX, TOPIC_SEPARATOR};
use crate::storage::DEFAULT_SNAPSHOT_KEY;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown replication mode '{0}', expected 'merge' or 'snapshot'")]
    UnknownMode(String),
}

/// How shared state travels between nodes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplicationMode {
    /// Publish the whole state, peers deep-merge it
    #[default]
    Merge,
    /// Write the state to a durable store, publish a marker, peers re-read it
    Snapshot,
}

impl fmt::Display for ReplicationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge => f.write_str("merge"),
            Self::Snapshot => f.write_str("snapshot"),
        }
    }
}

impl FromStr for ReplicationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "snapshot" => Ok(Self::Snapshot),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// Configuration for a mesh node
#[derive(Clone, Debug)]
pub struct MeshConfig {
    /// Redis URL (`redis://host:port`) for the bundled transport
    pub redis_url: String,
    /// Prefix shared by every topic of this mesh
    pub topic_prefix: String,
    /// Replication strategy
    pub mode: ReplicationMode,
    /// Key the snapshot strategy stores the state under
    pub snapshot_key: String,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            redis_url: format!("redis://{DEFAULT_REDIS_HOST}:{DEFAULT_REDIS_PORT}"),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            mode: ReplicationMode::default(),
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
        }
    }
}

impl MeshConfig {
    /// Create a new config builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from a `host:port` target
    ///
    /// Either part may be empty (`":6380"`, `"cache:"`); missing parts fall
    /// back to `127.0.0.1` and `6379`.
    pub fn from_uri(uri: &str) -> Result<Self, ConfigError> {
        let (host, port) = match uri.split_once(':') {
            Some((host, port)) => (host, port),
            None => (uri, ""),
        };

        let host = if host.is_empty() { DEFAULT_REDIS_HOST } else { host };
        let port = if port.is_empty() {
            DEFAULT_REDIS_PORT
        } else {
            port.parse::<u16>()
                .map_err(|e| ConfigError::Invalid(format!("bad port '{port}': {e}")))?
        };

        Ok(Self::default().with_redis_url(format!("redis://{host}:{port}")))
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    pub fn with_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    pub fn with_mode(mut self, mode: ReplicationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic_prefix.is_empty() {
            return Err(ConfigError::Invalid("topic_prefix cannot be empty".to_string()));
        }
        if self.topic_prefix.contains(TOPIC_SEPARATOR) {
            return Err(ConfigError::Invalid(format!(
                "topic_prefix cannot contain '{TOPIC_SEPARATOR}'"
            )));
        }
        if self.snapshot_key.is_empty() {
            return Err(ConfigError::Invalid("snapshot_key cannot be empty".to_string()));
        }
        Ok(())
    }
}
