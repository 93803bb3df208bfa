// Game Record - The keyed unit of shared state

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Reserved property holding the user map
pub const USER_DATA: &str = "userData";
/// Reserved property holding the chat log
pub const CHAT_DATA: &str = "chatData";

/// Key of a game in the shared state
///
/// Numeric ids are accepted and stored in their decimal form, so `7` and
/// `"7"` address the same game.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for GameId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&String> for GameId {
    fn from(id: &String) -> Self {
        Self(id.clone())
    }
}

macro_rules! game_id_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for GameId {
            fn from(id: $t) -> Self {
                Self(id.to_string())
            }
        })*
    };
}

game_id_from_int!(u32, u64, i32, i64, usize);

/// Returned when a reserved property is given a value of the wrong shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedShape {
    pub name: &'static str,
    pub expected: &'static str,
}

/// A game record: reserved `userData`/`chatData` plus arbitrary properties
///
/// Serializes to a flat JSON object, so the wire shape is the open map
/// every node agrees on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(rename = "userData", default, skip_serializing_if = "Option::is_none")]
    user_data: Option<BTreeMap<String, Value>>,
    #[serde(rename = "chatData", default, skip_serializing_if = "Option::is_none")]
    chat_data: Option<Vec<Value>>,
    #[serde(flatten)]
    props: Map<String, Value>,
}

impl GameRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style property setter
    ///
    /// Reserved names go through [`GameRecord::set_prop`]; a value of the
    /// wrong shape for one is dropped with a warning, leaving the record
    /// unchanged.
    pub fn with_prop(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        if let Err(shape) = self.set_prop(&name, value) {
            warn!(
                property = shape.name,
                expected = shape.expected,
                "ignoring reserved property of the wrong shape"
            );
        }
        self
    }

    /// Build a record from a JSON object
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Render the record as a JSON object
    pub fn to_value(&self) -> Value {
        // A map of Values with string keys always serializes
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Get a plain property
    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    /// All plain properties
    pub fn props(&self) -> &Map<String, Value> {
        &self.props
    }

    /// Get a user entry
    pub fn user(&self, user_id: &str) -> Option<&Value> {
        self.user_data.as_ref().and_then(|users| users.get(user_id))
    }

    /// The user map, if it has been materialized
    pub fn users(&self) -> Option<&BTreeMap<String, Value>> {
        self.user_data.as_ref()
    }

    /// The chat log, if it has been materialized
    pub fn chat(&self) -> Option<&[Value]> {
        self.chat_data.as_deref()
    }

    /// Set a top-level property
    ///
    /// `userData` takes an object and `chatData` an array; `null` clears
    /// either. Any other name is stored as-is.
    pub fn set_prop(&mut self, name: &str, value: Value) -> Result<(), ReservedShape> {
        match name {
            USER_DATA => {
                self.user_data = match value {
                    Value::Null => None,
                    Value::Object(map) => Some(map.into_iter().collect()),
                    _ => {
                        return Err(ReservedShape {
                            name: USER_DATA,
                            expected: "object",
                        })
                    }
                };
            }
            CHAT_DATA => {
                self.chat_data = match value {
                    Value::Null => None,
                    Value::Array(entries) => Some(entries),
                    _ => {
                        return Err(ReservedShape {
                            name: CHAT_DATA,
                            expected: "array",
                        })
                    }
                };
            }
            _ => {
                self.props.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    pub(crate) fn insert_user(&mut self, user_id: String, user: Value) {
        self.user_data
            .get_or_insert_with(BTreeMap::new)
            .insert(user_id, user);
    }

    pub(crate) fn remove_user(&mut self, user_id: &str) -> bool {
        self.user_data
            .as_mut()
            .is_some_and(|users| users.remove(user_id).is_some())
    }

    pub(crate) fn push_chat(&mut self, entry: Value) -> usize {
        let chat = self.chat_data.get_or_insert_with(Vec::new);
        chat.push(entry);
        chat.len()
    }
}
