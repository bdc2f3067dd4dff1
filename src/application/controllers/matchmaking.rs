//! Matchmaking controller - where every fresh connection starts.

use std::sync::{Arc, Weak};

use tokio::sync::Mutex;

use super::lobby::SeatError;
use super::session::{fan_out, SessionCore};
use crate::application::liveness::DeadListenerSink;
use crate::application::router::{RouterCore, SessionHandle};
use crate::domain::action::{Action, ActionKind, PlayerAction, ServerAction};
use crate::domain::foundation::{DomainError, ErrorCode, Identity};
use crate::domain::matchmaking::Matchmaking;
use crate::ports::{DispatchError, Listener};

pub struct MatchmakingController {
    inner: Mutex<SessionCore<Matchmaking>>,
    router: Weak<RouterCore>,
    dead: DeadListenerSink,
    auto_seat: bool,
}

impl MatchmakingController {
    pub(crate) fn new(router: Weak<RouterCore>, dead: DeadListenerSink, auto_seat: bool) -> Self {
        Self {
            inner: Mutex::new(SessionCore::new(Matchmaking::new(), Vec::new())),
            router,
            dead,
            auto_seat,
        }
    }

    pub async fn waiting(&self) -> usize {
        self.inner.lock().await.listeners.len()
    }

    /// Takes in a listener whose identity has no session yet.
    ///
    /// With auto-seating on the player is placed right away, otherwise it
    /// receives the lobby listing and waits for a create or join.
    pub async fn admit(self: &Arc<Self>, listener: Arc<dyn Listener>) -> Result<(), DispatchError> {
        let router = self.router.upgrade().ok_or(DispatchError::ShuttingDown)?;
        let mut inner = self.inner.lock().await;
        let identity = listener.identity().clone();
        let returning = inner.is_attached(&identity);

        router
            .install_route(&identity, SessionHandle::Matchmaking(self.clone()))
            .await;
        inner.attach(listener.clone());
        tracing::debug!(identity = %identity, "listener admitted to matchmaking");

        if self.auto_seat && !returning {
            let join = Action::player(
                identity.clone(),
                PlayerAction::JoinLobby {
                    nickname: identity.to_string(),
                    lobby_id: None,
                    pawn: None,
                },
            );
            self.place(&mut inner, &router, join).await;
        } else {
            self.send_listing(&mut inner, &router, &[listener]).await;
        }
        Ok(())
    }

    pub async fn execute(self: &Arc<Self>, mut action: Action) -> Result<(), DispatchError> {
        let router = self.router.upgrade().ok_or(DispatchError::ShuttingDown)?;
        let mut inner = self.inner.lock().await;
        if !inner.is_attached(&action.identity) {
            return Err(DispatchError::Moved(action.identity));
        }

        match &action.kind {
            ActionKind::Player(PlayerAction::CreateLobby { .. })
            | ActionKind::Player(PlayerAction::JoinLobby { .. }) => {
                self.place(&mut inner, &router, action).await;
            }
            _ => {
                // Anything else is refused by the model; only the author hears.
                let _ = action.apply(&mut inner.model);
                let requester = inner.listeners_of(&action.identity);
                fan_out(&requester, &action, &self.dead).await;
            }
        }
        Ok(())
    }

    /// Detaches a listener. Returns true when its identity has no listener
    /// left here.
    pub async fn detach(&self, listener: &Arc<dyn Listener>) -> bool {
        let mut inner = self.inner.lock().await;
        inner.detach(listener);
        !inner.is_attached(listener.identity())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Placement
    // ─────────────────────────────────────────────────────────────────────────

    /// Seats the author of a create/join action in a lobby.
    ///
    /// On success its listeners leave matchmaking and everyone still here
    /// gets a fresh listing; on failure only the author is told.
    async fn place(
        &self,
        inner: &mut SessionCore<Matchmaking>,
        router: &Arc<RouterCore>,
        action: Action,
    ) {
        let identity = action.identity.clone();
        let listeners = inner.listeners_of(&identity);

        let outcome = match &action.kind {
            ActionKind::Player(PlayerAction::CreateLobby { .. }) => {
                Self::seat_in_new_lobby(router, action, listeners.clone()).await
            }
            ActionKind::Player(PlayerAction::JoinLobby {
                lobby_id: Some(lobby_id),
                ..
            }) => match router.find_lobby(*lobby_id).await {
                Some(lobby) => lobby
                    .seat(action, listeners.clone())
                    .await
                    .map_err(SeatError::into_failed_action),
                None => {
                    let mut action = action;
                    action.fail(&DomainError::new(ErrorCode::LobbyNotFound, "Lobby not found"));
                    Err(action)
                }
            },
            _ => Self::seat_first_fit(router, action, listeners.clone()).await,
        };

        match outcome {
            Ok(()) => {
                inner.release(&identity);
                let remaining = inner.listeners.clone();
                self.send_listing(inner, router, &remaining).await;
            }
            Err(failed) => {
                tracing::debug!(identity = %identity, error = ?failed.error, "placement refused");
                fan_out(&listeners, &failed, &self.dead).await;
            }
        }
    }

    /// First lobby, in creation order, that takes the player; a new lobby
    /// when none does.
    async fn seat_first_fit(
        router: &Arc<RouterCore>,
        action: Action,
        listeners: Vec<Arc<dyn Listener>>,
    ) -> Result<(), Action> {
        for lobby in router.lobby_candidates().await {
            match lobby.seat(action.clone(), listeners.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    let failed = e.into_failed_action();
                    tracing::trace!(lobby_id = %lobby.id(), error = ?failed.error, "lobby skipped");
                }
            }
        }
        Self::seat_in_new_lobby(router, action, listeners).await
    }

    async fn seat_in_new_lobby(
        router: &Arc<RouterCore>,
        action: Action,
        listeners: Vec<Arc<dyn Listener>>,
    ) -> Result<(), Action> {
        let lobby = router.open_lobby();
        tracing::info!(lobby_id = %lobby.id(), identity = %action.identity, "opening lobby");
        lobby
            .seat(action, listeners)
            .await
            .map_err(SeatError::into_failed_action)
    }

    async fn send_listing(
        &self,
        inner: &mut SessionCore<Matchmaking>,
        router: &Arc<RouterCore>,
        to: &[Arc<dyn Listener>],
    ) {
        let mut listing = Action::server(
            Identity::server(),
            ServerAction::LobbyList {
                lobbies: router.lobby_summaries().await,
            },
        );
        let _ = listing.apply(&mut inner.model);
        fan_out(to, &listing, &self.dead).await;
    }
}
