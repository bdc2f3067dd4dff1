//! The closed set of actions.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Identity, LobbyId};
use crate::domain::game::{Game, PickSource, Position, Side};
use crate::domain::lobby::{Lobby, LobbySummary, Pawn};

/// Actions a client originates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerAction {
    CreateLobby {
        nickname: String,
        pawn: Option<Pawn>,
    },
    /// `lobby_id: None` joins the first lobby with a free seat.
    JoinLobby {
        nickname: String,
        lobby_id: Option<LobbyId>,
        pawn: Option<Pawn>,
    },
    ChoosePawn {
        pawn: Pawn,
    },
    StartGame,
    PlaceStarterCard {
        side: Side,
    },
    PlaceCard {
        card_id: u32,
        position: Position,
        side: Side,
    },
    PickCard {
        source: PickSource,
    },
    /// Chat line broadcast to everyone in the game.
    SendMessage {
        message: String,
    },
}

/// Actions the server originates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerAction {
    LobbyList { lobbies: Vec<LobbySummary> },
    LobbyStateSync { lobby: Lobby },
    GameStart { game: Box<Game> },
    /// Full snapshot for a reconnecting player.
    Resume { game: Box<Game> },
    /// The action's identity went silent.
    Hang,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "origin", content = "payload", rename_all = "snake_case")]
pub enum ActionKind {
    Player(PlayerAction),
    Server(ServerAction),
}

/// Replicated unit of change.
///
/// Applied once against the authoritative model, then the very same value
/// is sent to every observer of the session and reflected into their view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub identity: Identity,
    pub success: bool,
    pub error: Option<String>,
    pub kind: ActionKind,
}

impl Action {
    pub fn player(identity: Identity, action: PlayerAction) -> Self {
        Self::new(identity, ActionKind::Player(action))
    }

    pub fn server(identity: Identity, action: ServerAction) -> Self {
        Self::new(identity, ActionKind::Server(action))
    }

    fn new(identity: Identity, kind: ActionKind) -> Self {
        Self {
            identity,
            success: true,
            error: None,
            kind,
        }
    }

    pub fn is_player_action(&self) -> bool {
        matches!(self.kind, ActionKind::Player(_))
    }

    /// Overwrites the claimed identity with the one a connection proved.
    pub fn bind_identity(&mut self, identity: &Identity) {
        if &self.identity != identity {
            self.identity = identity.clone();
        }
    }

    /// Records a failed apply.
    pub fn fail(&mut self, error: &DomainError) {
        self.success = false;
        self.error = Some(error.message.clone());
    }

    /// Replaces the game snapshot carried by snapshot variants with the
    /// post-apply state.
    pub fn refresh_snapshot(&mut self, latest: &Game) {
        if let ActionKind::Server(
            ServerAction::GameStart { game } | ServerAction::Resume { game },
        ) = &mut self.kind
        {
            **game = latest.clone();
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match &self.kind {
            ActionKind::Player(p) => match p {
                PlayerAction::CreateLobby { .. } => "create_lobby",
                PlayerAction::JoinLobby { .. } => "join_lobby",
                PlayerAction::ChoosePawn { .. } => "choose_pawn",
                PlayerAction::StartGame => "start_game",
                PlayerAction::PlaceStarterCard { .. } => "place_starter_card",
                PlayerAction::PlaceCard { .. } => "place_card",
                PlayerAction::PickCard { .. } => "pick_card",
                PlayerAction::SendMessage { .. } => "send_message",
            },
            ActionKind::Server(s) => match s {
                ServerAction::LobbyList { .. } => "lobby_list",
                ServerAction::LobbyStateSync { .. } => "lobby_state_sync",
                ServerAction::GameStart { .. } => "game_start",
                ServerAction::Resume { .. } => "resume",
                ServerAction::Hang => "hang",
                ServerAction::Error { .. } => "error",
            },
        }
    }
}
