//! Reflecting actions into a client's projection.

use thiserror::Error;

use super::apply::ActionTarget;
use super::kinds::{Action, ActionKind, PlayerAction, ServerAction};
use crate::domain::client_state::ClientState;
use crate::domain::foundation::DomainError;

/// Reflection failures mean the local replica and the server disagree;
/// they are integration errors and are not recovered from.
#[derive(Debug, Error)]
pub enum ReflectError {
    #[error("no local game to replay '{0}' on")]
    MissingReplica(&'static str),

    #[error("local game diverged from the server: {0}")]
    Diverged(#[from] DomainError),
}

impl Action {
    /// Updates an observer's view. Never touches an authoritative model.
    ///
    /// Game moves are replayed on the local replica; snapshot-carrying
    /// actions replace it. Failed actions only surface their error to the
    /// player that attempted them.
    pub fn reflect(&self, view: &mut ClientState) -> Result<(), ReflectError> {
        let own = &self.identity == view.identity();

        if !self.success {
            if own {
                view.record_error(self.error.clone());
            }
            return Ok(());
        }

        match &self.kind {
            ActionKind::Player(action) => {
                if own {
                    view.record_error(None);
                }
                match action {
                    PlayerAction::CreateLobby { nickname, .. }
                    | PlayerAction::JoinLobby { nickname, .. } => {
                        if own {
                            view.set_nickname(nickname);
                        }
                    }
                    // Lobby changes arrive as a state sync right after.
                    PlayerAction::ChoosePawn { .. } | PlayerAction::StartGame => {}
                    PlayerAction::PlaceStarterCard { .. }
                    | PlayerAction::PlaceCard { .. }
                    | PlayerAction::PickCard { .. }
                    | PlayerAction::SendMessage { .. } => self.replay(view)?,
                }
            }
            ActionKind::Server(action) => match action {
                ServerAction::LobbyList { lobbies } => view.show_lobbies(lobbies.clone()),
                ServerAction::LobbyStateSync { lobby } => view.enter_lobby(lobby.clone()),
                ServerAction::GameStart { game } | ServerAction::Resume { game } => {
                    view.enter_game((**game).clone())
                }
                ServerAction::Hang if own => view.mark_disconnected(),
                ServerAction::Hang if view.game().is_some() => self.replay(view)?,
                // Lobby departures arrive as a state sync right after.
                ServerAction::Hang => {}
                ServerAction::Error { message } => {
                    if own {
                        view.record_error(Some(message.clone()));
                    }
                }
            },
        }
        Ok(())
    }

    fn replay(&self, view: &mut ClientState) -> Result<(), ReflectError> {
        let game = view
            .game_replica_mut()
            .ok_or(ReflectError::MissingReplica(self.label()))?;
        game.accept(&self.identity, &self.kind)?;
        view.refresh_turn_phase();
        Ok(())
    }
}
