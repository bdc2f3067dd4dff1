//! Lobby controller - seats players and hands a ready lobby to a game.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use super::game::GameController;
use super::session::{fan_out, SessionCore};
use crate::application::liveness::DeadListenerSink;
use crate::domain::action::{Action, ServerAction};
use crate::domain::foundation::{DomainError, ErrorCode, Identity, LobbyId};
use crate::domain::lobby::{Lobby, LobbySummary};
use crate::ports::{DispatchError, Listener};

/// Callbacks a lobby makes into whoever routes identities.
///
/// Every method is called while the lobby's own lock is held, so an
/// implementation must never call back into the same lobby.
#[async_trait]
pub trait LobbyHost: Send + Sync {
    /// Routes `identity` to `lobby` and lists the lobby for placement.
    async fn admit_member(&self, identity: &Identity, lobby: &Arc<LobbyController>);

    /// Drops the route of a member that left; unlists an empty lobby.
    async fn release_member(&self, identity: &Identity, lobby: &Arc<LobbyController>, lobby_empty: bool);

    /// Builds the game for a ready lobby and moves every member to it.
    async fn migrate_to_game(
        &self,
        lobby: Lobby,
        listeners: Vec<Arc<dyn Listener>>,
    ) -> Result<Arc<GameController>, DispatchError>;
}

/// Why a seat was not granted. Both variants hand the action back.
#[derive(Debug)]
pub enum SeatError {
    /// The lobby already migrated or emptied.
    Closed(Action),
    /// The lobby refused the action; it carries the failure.
    Rejected(Action),
}

impl SeatError {
    /// The action as it should be reflected to the requester.
    pub fn into_failed_action(self) -> Action {
        match self {
            SeatError::Closed(mut action) => {
                action.fail(&DomainError::new(ErrorCode::LobbyNotFound, "Lobby is closed"));
                action
            }
            SeatError::Rejected(action) => action,
        }
    }
}

pub struct LobbyController {
    id: LobbyId,
    inner: Mutex<SessionCore<Lobby>>,
    /// Lock-free copy of the lobby summary, read by placement and listings.
    summary: watch::Sender<LobbySummary>,
    host: Weak<dyn LobbyHost>,
    dead: DeadListenerSink,
}

impl LobbyController {
    pub fn new(lobby: Lobby, host: Weak<dyn LobbyHost>, dead: DeadListenerSink) -> Self {
        let (summary, _) = watch::channel(lobby.summary());
        Self {
            id: lobby.id(),
            inner: Mutex::new(SessionCore::new(lobby, Vec::new())),
            summary,
            host,
            dead,
        }
    }

    pub fn id(&self) -> LobbyId {
        self.id
    }

    pub fn summary(&self) -> LobbySummary {
        self.summary.borrow().clone()
    }

    pub async fn snapshot(&self) -> Lobby {
        self.inner.lock().await.model.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Seats the author of a create/join action together with its listeners.
    ///
    /// On success the identity is routed here before the lock is released,
    /// so the caller may drop its own listeners right away.
    pub async fn seat(
        self: &Arc<Self>,
        mut action: Action,
        listeners: Vec<Arc<dyn Listener>>,
    ) -> Result<(), SeatError> {
        let mut inner = self.inner.lock().await;
        let Some(host) = self.host.upgrade() else {
            return Err(SeatError::Closed(action));
        };
        if inner.retired {
            return Err(SeatError::Closed(action));
        }
        if action.apply(&mut inner.model).is_err() {
            return Err(SeatError::Rejected(action));
        }

        host.admit_member(&action.identity, self).await;
        for listener in listeners {
            inner.attach(listener);
        }
        self.publish_summary(&inner.model);
        tracing::debug!(lobby_id = %self.id, identity = %action.identity, "player seated");

        fan_out(&inner.listeners, &action, &self.dead).await;
        self.settle(&mut inner, host.as_ref()).await;
        Ok(())
    }

    /// Applies an action of a seated player and fans it out.
    pub async fn execute(self: &Arc<Self>, mut action: Action) -> Result<(), DispatchError> {
        let mut inner = self.inner.lock().await;
        if inner.retired || !inner.model.has_player(&action.identity) {
            return Err(DispatchError::Moved(action.identity));
        }

        let applied = action.apply(&mut inner.model).is_ok();
        if applied {
            self.publish_summary(&inner.model);
        }
        fan_out(&inner.listeners, &action, &self.dead).await;

        if applied {
            if let Some(host) = self.host.upgrade() {
                self.settle(&mut inner, host.as_ref()).await;
            }
        }
        Ok(())
    }

    /// Adds another connection for an already seated identity.
    pub async fn attach(&self, listener: Arc<dyn Listener>) -> Result<(), DispatchError> {
        let mut inner = self.inner.lock().await;
        if inner.retired || !inner.model.has_player(listener.identity()) {
            return Err(DispatchError::Moved(listener.identity().clone()));
        }
        inner.attach(listener.clone());
        let sync = self.sync_action(&inner.model);
        fan_out(&[listener], &sync, &self.dead).await;
        Ok(())
    }

    /// Detaches a listener; the seat is given up with the identity's last one.
    pub async fn detach(self: &Arc<Self>, listener: &Arc<dyn Listener>) {
        let mut inner = self.inner.lock().await;
        if !inner.detach(listener) || inner.retired {
            return;
        }
        let identity = listener.identity().clone();
        if inner.is_attached(&identity) {
            return;
        }

        let mut leave = Action::server(identity.clone(), ServerAction::Hang);
        if leave.apply(&mut inner.model).is_err() {
            return;
        }
        let empty = inner.model.is_empty();
        if empty {
            inner.retired = true;
        }
        self.publish_summary(&inner.model);
        tracing::info!(lobby_id = %self.id, identity = %identity, empty, "player left lobby");

        if let Some(host) = self.host.upgrade() {
            host.release_member(&identity, self, empty).await;
        }
        if !empty {
            fan_out(&inner.listeners, &leave, &self.dead).await;
            let sync = self.sync_action(&inner.model);
            fan_out(&inner.listeners, &sync, &self.dead).await;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Syncs every member and migrates once the lobby is ready.
    async fn settle(&self, inner: &mut SessionCore<Lobby>, host: &dyn LobbyHost) {
        let sync = self.sync_action(&inner.model);
        fan_out(&inner.listeners, &sync, &self.dead).await;

        if !inner.model.ready_to_start() {
            return;
        }
        let listeners = std::mem::take(&mut inner.listeners);
        inner.retired = true;
        tracing::info!(
            lobby_id = %self.id,
            players = inner.model.players().len(),
            "lobby ready, migrating to game"
        );
        if let Err(e) = host.migrate_to_game(inner.model.clone(), listeners).await {
            tracing::error!(lobby_id = %self.id, error = %e, "migration to game failed");
        }
    }

    fn sync_action(&self, lobby: &Lobby) -> Action {
        Action::server(
            Identity::server(),
            ServerAction::LobbyStateSync {
                lobby: lobby.clone(),
            },
        )
    }

    fn publish_summary(&self, lobby: &Lobby) {
        self.summary.send_replace(lobby.summary());
    }
}
