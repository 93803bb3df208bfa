// State module - THE SHARED GAME STORE
// Keyed game records, their CRUD invariants, and the merge used to replicate them

mod merge;
mod record;
mod store;

pub use merge::{deep_merge, MergeResult};
pub use record::{GameId, GameRecord, ReservedShape, CHAT_DATA, USER_DATA};
pub use store::{SharedState, SharedStateHandle, StateError};
