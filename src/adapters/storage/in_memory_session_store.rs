//! In-Memory Session Store Adapter
//!
//! Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::GameId;
use crate::domain::game::Game;
use crate::ports::{SessionStore, SessionStoreError};

#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    snapshot: Arc<RwLock<Option<HashMap<GameId, Game>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once something was saved and not cleared since
    pub async fn is_saved(&self) -> bool {
        self.snapshot.read().await.is_some()
    }

    /// Forget the stored snapshot (useful for tests)
    pub async fn clear(&self) {
        *self.snapshot.write().await = None;
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, games: &HashMap<GameId, Game>) -> Result<(), SessionStoreError> {
        *self.snapshot.write().await = Some(games.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<HashMap<GameId, Game>>, SessionStoreError> {
        Ok(self.snapshot.read().await.clone())
    }
}
