//! Registry of live games, the unit of persistence and recovery.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use super::controllers::GameController;
use crate::domain::foundation::{GameId, Identity, Timestamp};
use crate::domain::game::Game;
use crate::ports::{SessionStore, SessionStoreError};

#[derive(Default)]
pub struct SessionRegistry {
    games: RwLock<HashMap<GameId, Arc<GameController>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the last saved games.
    ///
    /// A missing, unreadable or corrupt snapshot is not fatal: the server
    /// starts with no games and says so.
    pub async fn restore(store: &dyn SessionStore) -> HashMap<GameId, Game> {
        match store.load().await {
            Ok(Some(games)) => games,
            Ok(None) => {
                tracing::info!("no saved games found, starting empty");
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "saved games unreadable, starting empty");
                HashMap::new()
            }
        }
    }

    pub async fn insert(&self, game: Arc<GameController>) {
        self.games.write().await.insert(game.id(), game);
    }

    pub async fn get(&self, id: GameId) -> Option<Arc<GameController>> {
        self.games.read().await.get(&id).cloned()
    }

    /// The live (not ended) game `identity` plays in.
    pub async fn find_by_member(&self, identity: &Identity) -> Option<Arc<GameController>> {
        self.games
            .read()
            .await
            .values()
            .find(|game| !game.has_ended() && game.is_member(identity))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.games.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.games.read().await.is_empty()
    }

    /// Consistent copy of every game, each taken under its own lock.
    pub async fn snapshot(&self) -> HashMap<GameId, Game> {
        let controllers: Vec<_> = self.games.read().await.values().cloned().collect();
        let mut games = HashMap::with_capacity(controllers.len());
        for controller in controllers {
            games.insert(controller.id(), controller.snapshot().await);
        }
        games
    }

    /// Writes the current snapshot, returning how many games were saved.
    pub async fn save(&self, store: &dyn SessionStore) -> Result<usize, SessionStoreError> {
        let games = self.snapshot().await;
        store.save(&games).await?;
        Ok(games.len())
    }

    /// Removes games that ended longer than `retention` before `now`.
    pub async fn remove_ended(&self, retention: Duration, now: &Timestamp) -> Vec<Arc<GameController>> {
        let mut games = self.games.write().await;
        let mut expired = Vec::new();
        for game in games.values().filter(|g| g.has_ended()) {
            if game
                .ended_at()
                .await
                .is_some_and(|at| at.is_older_than(retention, now))
            {
                expired.push(game.clone());
            }
        }
        for game in &expired {
            games.remove(&game.id());
        }
        expired
    }
}
