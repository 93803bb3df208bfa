// Shared State - The replicated game store
//
// Plain in-memory CRUD. Nothing here touches the wire: callers mutate the
// store and then ask their adapter to sync.

use crate::state::merge::{deep_merge, MergeResult};
use crate::state::record::{GameId, GameRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Errors that can occur during shared state operations
#[derive(Error, Debug)]
pub enum StateError {
    #[error("No game exists with id: {0}")]
    NotFound(GameId),

    #[error("Property '{name}' must be an {expected}")]
    ReservedProperty {
        name: &'static str,
        expected: &'static str,
    },

    #[error("Malformed state: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Malformed(err.to_string())
    }
}

/// Every game known to this node
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedState {
    games: BTreeMap<GameId, GameRecord>,
}

impl SharedState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of games
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Check if there are no games
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Read view over every game
    pub fn get_all(&self) -> &BTreeMap<GameId, GameRecord> {
        &self.games
    }

    /// Get a single game
    pub fn game(&self, game_id: impl Into<GameId>) -> Option<&GameRecord> {
        self.games.get(&game_id.into())
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Insert or replace a game
    pub fn add_game(&mut self, game_id: impl Into<GameId>, record: GameRecord) {
        self.games.insert(game_id.into(), record);
    }

    /// Remove a game; returns false if it did not exist
    pub fn remove_game(&mut self, game_id: impl Into<GameId>) -> bool {
        self.games.remove(&game_id.into()).is_some()
    }

    /// Set a top-level property on an existing game
    pub fn set_game_prop(
        &mut self,
        game_id: impl Into<GameId>,
        name: &str,
        value: Value,
    ) -> Result<(), StateError> {
        let record = self.existing(game_id.into())?;
        record
            .set_prop(name, value)
            .map_err(|shape| StateError::ReservedProperty {
                name: shape.name,
                expected: shape.expected,
            })
    }

    /// Add (or replace) a user in an existing game
    pub fn add_user(
        &mut self,
        game_id: impl Into<GameId>,
        user_id: impl Into<String>,
        user: Value,
    ) -> Result<(), StateError> {
        let record = self.existing(game_id.into())?;
        record.insert_user(user_id.into(), user);
        Ok(())
    }

    /// Remove a user; no-op if the game or the user is missing
    pub fn remove_user(&mut self, game_id: impl Into<GameId>, user_id: &str) -> bool {
        self.games
            .get_mut(&game_id.into())
            .is_some_and(|record| record.remove_user(user_id))
    }

    /// Append a chat entry to an existing game, returning the new chat length
    pub fn add_chat(&mut self, game_id: impl Into<GameId>, chat: Value) -> Result<usize, StateError> {
        let record = self.existing(game_id.into())?;
        Ok(record.push_chat(chat))
    }

    fn existing(&mut self, game_id: GameId) -> Result<&mut GameRecord, StateError> {
        match self.games.get_mut(&game_id) {
            Some(record) => Ok(record),
            None => Err(StateError::NotFound(game_id)),
        }
    }

    // ========================================================================
    // REPLICATION SUPPORT
    // ========================================================================

    /// Render the whole state as a JSON object
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()))
    }

    /// Build a state from a JSON object
    pub fn from_value(value: Value) -> Result<Self, StateError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize to a JSON string (snapshot format)
    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON string (snapshot format); empty input is an empty state
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Replace the whole state
    pub fn replace(&mut self, other: SharedState) {
        self.games = other.games;
    }

    /// Deep-merge a remote state into this one
    ///
    /// Either every game in `incoming` is applied or none is: a merge that
    /// would leave a record malformed fails without touching local state.
    pub fn merge_value(&mut self, incoming: &Value) -> Result<MergeResult, StateError> {
        let Value::Object(remote) = incoming else {
            return Err(StateError::Malformed(format!(
                "expected an object of games, got {incoming}"
            )));
        };

        let mut staged = Vec::with_capacity(remote.len());
        let mut result = MergeResult::default();

        for (key, remote_record) in remote {
            let game_id = GameId::from(key);
            let merged = match self.games.get(&game_id) {
                Some(local) => {
                    let mut value = local.to_value();
                    deep_merge(&mut value, remote_record);
                    let merged = GameRecord::from_value(value)?;
                    if merged != *local {
                        result.updated_games += 1;
                    }
                    merged
                }
                None => {
                    result.new_games += 1;
                    GameRecord::from_value(remote_record.clone())?
                }
            };
            staged.push((game_id, merged));
        }

        self.games.extend(staged);
        result.total_after_merge = self.games.len();
        Ok(result)
    }
}

/// Shared, lock-protected handle to a node's [`SharedState`]
///
/// Cloning the handle shares the state. Guards must not be held across an
/// `.await`.
#[derive(Clone, Debug, Default)]
pub struct SharedStateHandle {
    inner: Arc<RwLock<SharedState>>,
}

impl SharedStateHandle {
    pub fn new(state: SharedState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Lock for reading
    pub fn read(&self) -> RwLockReadGuard<'_, SharedState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock for writing
    pub fn write(&self) -> RwLockWriteGuard<'_, SharedState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone out the current state
    pub fn snapshot(&self) -> SharedState {
        self.read().clone()
    }
}
