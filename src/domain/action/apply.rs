//! Applying actions to authoritative models.

use super::kinds::{Action, ActionKind, PlayerAction, ServerAction};
use crate::domain::foundation::{DomainError, ErrorCode, Identity};
use crate::domain::game::Game;
use crate::domain::lobby::Lobby;
use crate::domain::matchmaking::Matchmaking;

/// A model actions can be applied to.
pub trait ActionTarget: Clone {
    fn accept(&mut self, identity: &Identity, kind: &ActionKind) -> Result<(), DomainError>;
}

impl Action {
    /// Applies the action to `model`.
    ///
    /// Runs on a scratch copy that replaces the model only on success, so a
    /// rejected action leaves the model exactly as it was. On failure the
    /// action is marked failed and still carries its error for reflection.
    pub fn apply<M: ActionTarget>(&mut self, model: &mut M) -> Result<(), DomainError> {
        let mut scratch = model.clone();
        match scratch.accept(&self.identity, &self.kind) {
            Ok(()) => {
                *model = scratch;
                self.success = true;
                self.error = None;
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }
}

fn wrong_session(kind: &ActionKind, session: &str) -> DomainError {
    let what = match kind {
        ActionKind::Player(_) => "player action",
        ActionKind::Server(_) => "server action",
    };
    DomainError::new(
        ErrorCode::WrongSession,
        format!("This {} cannot be handled by a {}", what, session),
    )
}

impl ActionTarget for Matchmaking {
    fn accept(&mut self, _identity: &Identity, kind: &ActionKind) -> Result<(), DomainError> {
        match kind {
            ActionKind::Server(ServerAction::LobbyList { lobbies }) => {
                self.refresh(lobbies.clone());
                Ok(())
            }
            ActionKind::Server(ServerAction::Error { .. }) => Ok(()),
            other => Err(wrong_session(other, "matchmaking session")),
        }
    }
}

impl ActionTarget for Lobby {
    fn accept(&mut self, identity: &Identity, kind: &ActionKind) -> Result<(), DomainError> {
        match kind {
            ActionKind::Player(PlayerAction::CreateLobby { nickname, pawn }) => {
                if !self.is_empty() {
                    return Err(DomainError::new(
                        ErrorCode::InvalidStateTransition,
                        "Lobby already exists",
                    ));
                }
                self.add_player(identity.clone(), nickname, *pawn)
            }
            ActionKind::Player(PlayerAction::JoinLobby {
                nickname,
                lobby_id,
                pawn,
            }) => {
                if lobby_id.is_some_and(|id| id != self.id()) {
                    return Err(DomainError::new(ErrorCode::LobbyNotFound, "Lobby not found"));
                }
                self.add_player(identity.clone(), nickname, *pawn)
            }
            ActionKind::Player(PlayerAction::ChoosePawn { pawn }) => self.choose_pawn(identity, *pawn),
            ActionKind::Player(PlayerAction::StartGame) => self.request_start(identity),
            // A seated player whose last connection dropped gives up the seat.
            ActionKind::Server(ServerAction::Hang) => self.remove_player(identity),
            ActionKind::Server(ServerAction::LobbyStateSync { .. })
            | ActionKind::Server(ServerAction::Error { .. }) => Ok(()),
            other => Err(wrong_session(other, "lobby")),
        }
    }
}

impl ActionTarget for Game {
    fn accept(&mut self, identity: &Identity, kind: &ActionKind) -> Result<(), DomainError> {
        match kind {
            ActionKind::Player(PlayerAction::PlaceStarterCard { side }) => {
                self.place_starter(identity, *side)
            }
            ActionKind::Player(PlayerAction::PlaceCard {
                card_id,
                position,
                side,
            }) => self.place_card(identity, *card_id, *position, *side),
            ActionKind::Player(PlayerAction::PickCard { source }) => self.pick_card(identity, *source),
            ActionKind::Player(PlayerAction::SendMessage { message }) => {
                self.post_message(identity, message)
            }
            ActionKind::Server(ServerAction::Hang) => self.hang_player(identity),
            ActionKind::Server(ServerAction::Resume { .. }) => self.resume_player(identity),
            ActionKind::Server(ServerAction::GameStart { .. })
            | ActionKind::Server(ServerAction::Error { .. }) => Ok(()),
            other => Err(wrong_session(other, "game")),
        }
    }
}
