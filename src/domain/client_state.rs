//! Client-side projection of the authoritative state.
//!
//! Only reflected actions change a `ClientState`; after each one the
//! presentation layer is told to redraw via [`ClientState::notify_game_model_update`].

use std::fmt;

use crate::domain::foundation::Identity;
use crate::domain::game::{Game, TurnPhase};
use crate::domain::lobby::{Lobby, LobbySummary};

/// What the local player is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Connecting,
    Matchmaking,
    InLobby,
    SelectingStarterSide,
    PlacingCard,
    PickingCard,
    Sleeping,
    GameOver,
    Disconnected,
}

impl From<TurnPhase> for PlayerState {
    fn from(phase: TurnPhase) -> Self {
        match phase {
            TurnPhase::SelectingStarterSide => PlayerState::SelectingStarterSide,
            TurnPhase::PlacingCard => PlayerState::PlacingCard,
            TurnPhase::PickingCard => PlayerState::PickingCard,
            TurnPhase::Sleeping => PlayerState::Sleeping,
            TurnPhase::GameOver => PlayerState::GameOver,
        }
    }
}

/// Redraw hook installed by a presentation layer.
pub type UpdateHook = Box<dyn Fn(&ClientState) + Send + Sync>;

pub struct ClientState {
    identity: Identity,
    nickname: Option<String>,
    player_state: PlayerState,
    lobbies: Vec<LobbySummary>,
    lobby: Option<Lobby>,
    game: Option<Game>,
    last_error: Option<String>,
    on_update: Option<UpdateHook>,
}

impl ClientState {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            nickname: None,
            player_state: PlayerState::Connecting,
            lobbies: Vec::new(),
            lobby: None,
            game: None,
            last_error: None,
            on_update: None,
        }
    }

    pub fn with_update_hook(mut self, hook: UpdateHook) -> Self {
        self.on_update = Some(hook);
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    pub fn player_state(&self) -> PlayerState {
        self.player_state
    }

    pub fn lobbies(&self) -> &[LobbySummary] {
        &self.lobbies
    }

    pub fn lobby(&self) -> Option<&Lobby> {
        self.lobby.as_ref()
    }

    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Tells the presentation layer the projection changed.
    pub fn notify_game_model_update(&self) {
        if let Some(hook) = &self.on_update {
            hook(self);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutators used while reflecting actions
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn record_error(&mut self, message: Option<String>) {
        self.last_error = message;
    }

    pub(crate) fn set_nickname(&mut self, nickname: &str) {
        self.nickname = Some(nickname.to_string());
    }

    pub(crate) fn show_lobbies(&mut self, lobbies: Vec<LobbySummary>) {
        self.lobbies = lobbies;
        if self.lobby.is_none() && self.game.is_none() {
            self.player_state = PlayerState::Matchmaking;
        }
    }

    pub(crate) fn enter_lobby(&mut self, lobby: Lobby) {
        self.lobby = Some(lobby);
        self.player_state = PlayerState::InLobby;
    }

    pub(crate) fn enter_game(&mut self, game: Game) {
        self.lobby = None;
        self.game = Some(game);
        self.refresh_turn_phase();
    }

    pub(crate) fn game_replica_mut(&mut self) -> Option<&mut Game> {
        self.game.as_mut()
    }

    pub(crate) fn refresh_turn_phase(&mut self) {
        if let Some(phase) = self.game.as_ref().and_then(|g| g.turn_phase(&self.identity)) {
            self.player_state = phase.into();
        }
    }

    pub(crate) fn mark_disconnected(&mut self) {
        self.player_state = PlayerState::Disconnected;
    }
}

impl fmt::Debug for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientState")
            .field("identity", &self.identity)
            .field("nickname", &self.nickname)
            .field("player_state", &self.player_state)
            .field("lobby", &self.lobby.as_ref().map(Lobby::id))
            .field("game", &self.game.as_ref().map(Game::id))
            .field("last_error", &self.last_error)
            .finish()
    }
}
