//! Server dispatcher - routes every identity to the one session owning it.
//!
//! # Ownership
//!
//! Each identity is owned by exactly one session at a time: matchmaking, a
//! lobby or a game. Hand-overs (matchmaking to lobby, lobby to game) rewrite
//! the route while the giving session's lock is still held, and a session
//! that no longer owns an identity answers [`DispatchError::Moved`], so
//! `execute` simply looks the route up again.
//!
//! # Lock order
//!
//! matchmaking, lobby, router, registry, game. The router lock is only held
//! for map lookups and updates, never across a call into a controller.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::controllers::{GameController, LobbyController, LobbyHost, MatchmakingController};
use super::liveness::DeadListenerSink;
use super::registry::SessionRegistry;
use crate::config::MatchmakingConfig;
use crate::domain::action::Action;
use crate::domain::foundation::{GameId, Identity, LobbyId, Timestamp};
use crate::domain::game::{Game, GameFactory};
use crate::domain::lobby::{Lobby, LobbySummary};
use crate::ports::{DispatchError, Dispatcher, Listener};

/// Route lookups retried before giving up on an identity that keeps moving.
const MAX_ROUTE_ATTEMPTS: usize = 4;

/// Session currently owning an identity.
#[derive(Clone)]
pub(crate) enum SessionHandle {
    Matchmaking(Arc<MatchmakingController>),
    Lobby(Arc<LobbyController>),
    Game(Arc<GameController>),
}

impl SessionHandle {
    async fn execute(&self, action: Action) -> Result<(), DispatchError> {
        match self {
            SessionHandle::Matchmaking(mm) => mm.execute(action).await,
            SessionHandle::Lobby(lobby) => lobby.execute(action).await,
            SessionHandle::Game(game) => game.execute(action).await,
        }
    }

    fn same_as(&self, other: &SessionHandle) -> bool {
        match (self, other) {
            (SessionHandle::Matchmaking(a), SessionHandle::Matchmaking(b)) => Arc::ptr_eq(a, b),
            (SessionHandle::Lobby(a), SessionHandle::Lobby(b)) => Arc::ptr_eq(a, b),
            (SessionHandle::Game(a), SessionHandle::Game(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn placement(&self) -> Placement {
        match self {
            SessionHandle::Matchmaking(_) => Placement::Matchmaking,
            SessionHandle::Lobby(lobby) => Placement::Lobby(lobby.id()),
            SessionHandle::Game(game) => Placement::Game(game.id()),
        }
    }
}

/// Where an identity currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Matchmaking,
    Lobby(LobbyId),
    Game(GameId),
}

#[derive(Default)]
struct RouterState {
    routes: HashMap<Identity, SessionHandle>,
    /// Open lobbies in creation order.
    lobbies: Vec<Arc<LobbyController>>,
}

pub(crate) struct RouterCore {
    state: Mutex<RouterState>,
    registry: Arc<SessionRegistry>,
    matchmaking: Arc<MatchmakingController>,
    factory: Arc<dyn GameFactory>,
    settings: MatchmakingConfig,
    dead: DeadListenerSink,
    weak_self: Weak<RouterCore>,
}

impl RouterCore {
    pub(crate) async fn install_route(&self, identity: &Identity, handle: SessionHandle) {
        self.state
            .lock()
            .await
            .routes
            .insert(identity.clone(), handle);
    }

    async fn route_of(&self, identity: &Identity) -> Option<SessionHandle> {
        self.state.lock().await.routes.get(identity).cloned()
    }

    async fn clear_route_if(&self, identity: &Identity, handle: &SessionHandle) {
        let mut state = self.state.lock().await;
        if state.routes.get(identity).is_some_and(|h| h.same_as(handle)) {
            state.routes.remove(identity);
        }
    }

    /// Open lobbies with a free seat, in creation order.
    pub(crate) async fn lobby_candidates(&self) -> Vec<Arc<LobbyController>> {
        self.state
            .lock()
            .await
            .lobbies
            .iter()
            .filter(|lobby| lobby.summary().has_free_seat())
            .cloned()
            .collect()
    }

    pub(crate) async fn find_lobby(&self, id: LobbyId) -> Option<Arc<LobbyController>> {
        self.state
            .lock()
            .await
            .lobbies
            .iter()
            .find(|lobby| lobby.id() == id)
            .cloned()
    }

    pub(crate) async fn lobby_summaries(&self) -> Vec<LobbySummary> {
        self.state
            .lock()
            .await
            .lobbies
            .iter()
            .map(|lobby| lobby.summary())
            .collect()
    }

    /// A fresh, still unlisted lobby; it is listed once its first seat is taken.
    pub(crate) fn open_lobby(&self) -> Arc<LobbyController> {
        let host: Weak<dyn LobbyHost> = self.weak_self.clone();
        Arc::new(LobbyController::new(
            Lobby::new(self.settings.seats_per_lobby),
            host,
            self.dead.clone(),
        ))
    }
}

#[async_trait]
impl LobbyHost for RouterCore {
    async fn admit_member(&self, identity: &Identity, lobby: &Arc<LobbyController>) {
        let mut state = self.state.lock().await;
        state
            .routes
            .insert(identity.clone(), SessionHandle::Lobby(lobby.clone()));
        if !state.lobbies.iter().any(|l| Arc::ptr_eq(l, lobby)) {
            state.lobbies.push(lobby.clone());
        }
    }

    async fn release_member(&self, identity: &Identity, lobby: &Arc<LobbyController>, lobby_empty: bool) {
        let mut state = self.state.lock().await;
        let handle = SessionHandle::Lobby(lobby.clone());
        if state.routes.get(identity).is_some_and(|h| h.same_as(&handle)) {
            state.routes.remove(identity);
        }
        if lobby_empty {
            state.lobbies.retain(|l| !Arc::ptr_eq(l, lobby));
        }
    }

    async fn migrate_to_game(
        &self,
        lobby: Lobby,
        listeners: Vec<Arc<dyn Listener>>,
    ) -> Result<Arc<GameController>, DispatchError> {
        let game = self.factory.from_lobby(&lobby);
        let controller = Arc::new(GameController::new(game, listeners, self.dead.clone()));
        controller.announce_start().await;

        {
            let mut state = self.state.lock().await;
            self.registry.insert(controller.clone()).await;
            for member in controller.members() {
                state
                    .routes
                    .insert(member.clone(), SessionHandle::Game(controller.clone()));
            }
            state.lobbies.retain(|l| l.id() != lobby.id());
        }

        tracing::info!(
            lobby_id = %lobby.id(),
            game_id = %controller.id(),
            players = controller.members().len(),
            "lobby migrated to game"
        );
        Ok(controller)
    }
}

/// The authoritative [`Dispatcher`]. Cheap to clone.
#[derive(Clone)]
pub struct ServerDispatcher {
    core: Arc<RouterCore>,
}

impl ServerDispatcher {
    pub fn new(
        registry: Arc<SessionRegistry>,
        factory: Arc<dyn GameFactory>,
        settings: MatchmakingConfig,
        dead: DeadListenerSink,
    ) -> Self {
        let core = Arc::new_cyclic(|weak: &Weak<RouterCore>| RouterCore {
            state: Mutex::new(RouterState::default()),
            registry,
            matchmaking: Arc::new(MatchmakingController::new(
                weak.clone(),
                dead.clone(),
                settings.auto_seat,
            )),
            factory,
            settings,
            dead,
            weak_self: weak.clone(),
        });
        Self { core }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.core.registry
    }

    pub async fn placement_of(&self, identity: &Identity) -> Option<Placement> {
        self.core.route_of(identity).await.map(|h| h.placement())
    }

    pub async fn open_lobbies(&self) -> Vec<LobbySummary> {
        self.core.lobby_summaries().await
    }

    /// Adopts games recovered from the session store. Every player starts
    /// out disconnected until they reconnect.
    pub async fn adopt_restored(&self, games: HashMap<GameId, Game>) -> usize {
        let mut adopted = 0;
        for (_, mut game) in games {
            game.mark_all_disconnected();
            let controller = Arc::new(GameController::new(game, Vec::new(), self.core.dead.clone()));
            self.core.registry.insert(controller).await;
            adopted += 1;
        }
        if adopted > 0 {
            tracing::info!(games = adopted, "restored games from session store");
        }
        adopted
    }

    /// Drops games that ended more than `retention` ago and clears the
    /// routes still pointing at them.
    pub async fn evict_ended(&self, retention: Duration) -> usize {
        let mut state = self.core.state.lock().await;
        let evicted = self
            .core
            .registry
            .remove_ended(retention, &Timestamp::now())
            .await;
        for game in &evicted {
            state
                .routes
                .retain(|_, h| !matches!(h, SessionHandle::Game(g) if Arc::ptr_eq(g, game)));
            game.retire().await;
            tracing::info!(game_id = %game.id(), "evicted ended game");
        }
        evicted.len()
    }
}

#[async_trait]
impl Dispatcher for ServerDispatcher {
    async fn execute(&self, action: Action) -> Result<(), DispatchError> {
        if !action.is_player_action() {
            tracing::warn!(identity = %action.identity, action = action.label(), "server action submitted by client");
            return Err(DispatchError::ServerActionRejected);
        }

        for attempt in 0..MAX_ROUTE_ATTEMPTS {
            let handle = self
                .core
                .route_of(&action.identity)
                .await
                .ok_or_else(|| DispatchError::UnknownIdentity(action.identity.clone()))?;
            match handle.execute(action.clone()).await {
                Err(DispatchError::Moved(identity)) => {
                    tracing::debug!(identity = %identity, attempt, "identity moved, routing again");
                }
                other => return other,
            }
        }
        Err(DispatchError::Moved(action.identity))
    }

    async fn register_new_listener(&self, listener: Arc<dyn Listener>) -> Result<(), DispatchError> {
        let identity = listener.identity().clone();
        if identity.is_blank() || identity.as_str() == Identity::SERVER {
            return Err(DispatchError::UnknownIdentity(identity));
        }

        // A session answering `Moved` has handed the identity on; place it
        // again from the registry down.
        for attempt in 0..MAX_ROUTE_ATTEMPTS {
            if let Some(game) = self.core.registry.find_by_member(&identity).await {
                self.core
                    .install_route(&identity, SessionHandle::Game(game.clone()))
                    .await;
                tracing::info!(identity = %identity, game_id = %game.id(), "reconnecting to game");
                match game.resume(listener.clone()).await {
                    Err(DispatchError::Moved(_)) => {
                        tracing::debug!(identity = %identity, attempt, "game retired, placing again");
                        continue;
                    }
                    other => return other,
                }
            }

            if let Some(SessionHandle::Lobby(lobby)) = self.core.route_of(&identity).await {
                match lobby.attach(listener.clone()).await {
                    Err(DispatchError::Moved(_)) => {
                        tracing::debug!(identity = %identity, attempt, "lobby moved on, placing again");
                        continue;
                    }
                    other => return other,
                }
            }

            return self.core.matchmaking.admit(listener).await;
        }
        Err(DispatchError::Moved(identity))
    }

    async fn remove_listener(&self, listener: &Arc<dyn Listener>) -> Result<(), DispatchError> {
        let identity = listener.identity();
        let Some(handle) = self.core.route_of(identity).await else {
            tracing::debug!(identity = %identity, "removing listener without route");
            return Ok(());
        };

        match &handle {
            SessionHandle::Matchmaking(mm) => {
                if mm.detach(listener).await {
                    self.core.clear_route_if(identity, &handle).await;
                }
            }
            SessionHandle::Lobby(lobby) => lobby.detach(listener).await,
            SessionHandle::Game(game) => {
                game.detach(listener).await;
            }
        }
        Ok(())
    }
}
