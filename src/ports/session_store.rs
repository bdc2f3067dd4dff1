//! Session Store Port - Interface for persisting live games.
//!
//! Each save fully replaces the previous snapshot.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::foundation::GameId;
use crate::domain::game::Game;

/// Errors that can occur during session store operations
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Failed to serialize sessions: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize sessions: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Replaces the stored snapshot with `games`.
    async fn save(&self, games: &HashMap<GameId, Game>) -> Result<(), SessionStoreError>;

    /// Loads the last snapshot, `Ok(None)` when nothing was ever saved.
    async fn load(&self) -> Result<Option<HashMap<GameId, Game>>, SessionStoreError>;
}
