//! Lobby aggregate.
//!
//! Seats are filled in arrival order; the first seat belongs to the player
//! allowed to start the game early.

use serde::{Deserialize, Serialize};

use super::values::{LobbyState, LobbySummary, Pawn};
use crate::domain::foundation::{DomainError, ErrorCode, Identity, LobbyId};

/// Fewest players a game can start with.
pub const MIN_PLAYERS: usize = 2;

/// One seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPlayer {
    pub identity: Identity,
    pub nickname: String,
    pub pawn: Option<Pawn>,
}

/// Lobby aggregate.
///
/// # Invariants
///
/// - at most `seats` players
/// - nicknames and pawns are unique within the lobby
/// - one seat per identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lobby {
    id: LobbyId,
    seats: usize,
    players: Vec<LobbyPlayer>,
    state: LobbyState,
}

impl Lobby {
    /// Creates an empty lobby with the given number of seats.
    pub fn new(seats: usize) -> Self {
        Self {
            id: LobbyId::new(),
            seats,
            players: Vec::new(),
            state: LobbyState::Waiting,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> LobbyId {
        self.id
    }

    pub fn seats(&self) -> usize {
        self.seats
    }

    pub fn players(&self) -> &[LobbyPlayer] {
        &self.players
    }

    pub fn state(&self) -> LobbyState {
        self.state
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.seats
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player(&self, identity: &Identity) -> Option<&LobbyPlayer> {
        self.players.iter().find(|p| &p.identity == identity)
    }

    pub fn has_player(&self, identity: &Identity) -> bool {
        self.player(identity).is_some()
    }

    /// Readiness predicate consulted after every successful change.
    pub fn ready_to_start(&self) -> bool {
        self.state == LobbyState::ReadyToStart
    }

    pub fn summary(&self) -> LobbySummary {
        LobbySummary {
            id: self.id,
            nicknames: self.players.iter().map(|p| p.nickname.clone()).collect(),
            seats: self.seats,
            taken_pawns: self.players.iter().filter_map(|p| p.pawn).collect(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Seats a player.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the nickname is blank
    /// - `AlreadySeated`, `LobbyFull`, `NicknameTaken`, `PawnTaken`
    pub fn add_player(
        &mut self,
        identity: Identity,
        nickname: &str,
        pawn: Option<Pawn>,
    ) -> Result<(), DomainError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(DomainError::validation("nickname", "cannot be empty"));
        }
        if self.has_player(&identity) {
            return Err(DomainError::new(
                ErrorCode::AlreadySeated,
                "Player already seated in this lobby",
            ));
        }
        if self.is_full() {
            return Err(DomainError::new(ErrorCode::LobbyFull, "Lobby is full"));
        }
        if self.players.iter().any(|p| p.nickname == nickname) {
            return Err(DomainError::new(
                ErrorCode::NicknameTaken,
                "Nickname already taken",
            ));
        }
        if let Some(pawn) = pawn {
            self.ensure_pawn_free(pawn)?;
        }

        self.players.push(LobbyPlayer {
            identity,
            nickname: nickname.to_string(),
            pawn,
        });
        self.refresh_readiness();
        Ok(())
    }

    /// Removes a player's seat; a ready lobby drops back to waiting.
    pub fn remove_player(&mut self, identity: &Identity) -> Result<(), DomainError> {
        let before = self.players.len();
        self.players.retain(|p| &p.identity != identity);
        if self.players.len() == before {
            return Err(player_not_found());
        }
        self.state = LobbyState::Waiting;
        Ok(())
    }

    /// Assigns (or changes) the pawn of a seated player.
    pub fn choose_pawn(&mut self, identity: &Identity, pawn: Pawn) -> Result<(), DomainError> {
        let index = self
            .players
            .iter()
            .position(|p| &p.identity == identity)
            .ok_or_else(player_not_found)?;
        if self.players[index].pawn == Some(pawn) {
            return Ok(());
        }
        self.ensure_pawn_free(pawn)?;
        self.players[index].pawn = Some(pawn);
        self.refresh_readiness();
        Ok(())
    }

    /// Early start requested by the first player.
    ///
    /// # Errors
    ///
    /// - `NotFirstPlayer` unless `identity` holds the first seat
    /// - `NotEnoughPlayers` below [`MIN_PLAYERS`]
    /// - `PawnsMissing` while any seat has no pawn
    pub fn request_start(&mut self, identity: &Identity) -> Result<(), DomainError> {
        match self.players.first() {
            Some(first) if &first.identity == identity => {}
            Some(_) => {
                return Err(DomainError::new(
                    ErrorCode::NotFirstPlayer,
                    "Only the first player can start the game",
                ))
            }
            None => return Err(player_not_found()),
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(DomainError::new(
                ErrorCode::NotEnoughPlayers,
                format!("At least {} players are needed", MIN_PLAYERS),
            ));
        }
        if !self.all_pawns_chosen() {
            return Err(DomainError::new(
                ErrorCode::PawnsMissing,
                "Every player must choose a pawn first",
            ));
        }
        self.state = LobbyState::ReadyToStart;
        Ok(())
    }

    fn ensure_pawn_free(&self, pawn: Pawn) -> Result<(), DomainError> {
        if self.players.iter().any(|p| p.pawn == Some(pawn)) {
            return Err(DomainError::new(ErrorCode::PawnTaken, "Pawn already taken"));
        }
        Ok(())
    }

    fn all_pawns_chosen(&self) -> bool {
        self.players.iter().all(|p| p.pawn.is_some())
    }

    fn refresh_readiness(&mut self) {
        if self.is_full() && self.all_pawns_chosen() {
            self.state = LobbyState::ReadyToStart;
        }
    }
}

fn player_not_found() -> DomainError {
    DomainError::new(ErrorCode::PlayerNotFound, "Player is not in this lobby")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identity {
        Identity::new(s)
    }

    #[test]
    fn seats_fill_in_arrival_order() {
        let mut lobby = Lobby::new(2);
        lobby.add_player(id("a"), "alice", None).unwrap();
        lobby.add_player(id("b"), "bob", None).unwrap();

        let names: Vec<_> = lobby.players().iter().map(|p| p.nickname.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert!(lobby.is_full());
    }

    #[test]
    fn full_lobby_rejects_another_player() {
        let mut lobby = Lobby::new(2);
        lobby.add_player(id("a"), "alice", None).unwrap();
        lobby.add_player(id("b"), "bob", None).unwrap();

        let err = lobby.add_player(id("c"), "carol", None).unwrap_err();
        assert_eq!(err.code, ErrorCode::LobbyFull);
    }

    #[test]
    fn duplicate_nickname_and_pawn_are_rejected() {
        let mut lobby = Lobby::new(4);
        lobby.add_player(id("a"), "alice", Some(Pawn::Red)).unwrap();

        let err = lobby.add_player(id("b"), "alice", None).unwrap_err();
        assert_eq!(err.code, ErrorCode::NicknameTaken);

        let err = lobby.add_player(id("b"), "bob", Some(Pawn::Red)).unwrap_err();
        assert_eq!(err.code, ErrorCode::PawnTaken);
    }

    #[test]
    fn blank_nickname_is_rejected() {
        let mut lobby = Lobby::new(2);
        let err = lobby.add_player(id("a"), "  ", None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn full_lobby_with_all_pawns_is_ready() {
        let mut lobby = Lobby::new(2);
        lobby.add_player(id("a"), "alice", Some(Pawn::Red)).unwrap();
        assert!(!lobby.ready_to_start());
        lobby.add_player(id("b"), "bob", None).unwrap();
        assert!(!lobby.ready_to_start());
        lobby.choose_pawn(&id("b"), Pawn::Blue).unwrap();
        assert!(lobby.ready_to_start());
    }

    #[test]
    fn only_first_player_can_start_early() {
        let mut lobby = Lobby::new(4);
        lobby.add_player(id("a"), "alice", Some(Pawn::Red)).unwrap();
        lobby.add_player(id("b"), "bob", Some(Pawn::Green)).unwrap();

        let err = lobby.request_start(&id("b")).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFirstPlayer);

        lobby.request_start(&id("a")).unwrap();
        assert!(lobby.ready_to_start());
    }

    #[test]
    fn early_start_needs_two_players_with_pawns() {
        let mut lobby = Lobby::new(4);
        lobby.add_player(id("a"), "alice", Some(Pawn::Red)).unwrap();
        assert_eq!(
            lobby.request_start(&id("a")).unwrap_err().code,
            ErrorCode::NotEnoughPlayers
        );

        lobby.add_player(id("b"), "bob", None).unwrap();
        assert_eq!(
            lobby.request_start(&id("a")).unwrap_err().code,
            ErrorCode::PawnsMissing
        );
    }

    #[test]
    fn removing_a_player_frees_the_seat() {
        let mut lobby = Lobby::new(2);
        lobby.add_player(id("a"), "alice", Some(Pawn::Red)).unwrap();
        lobby.add_player(id("b"), "bob", Some(Pawn::Blue)).unwrap();
        assert!(lobby.ready_to_start());

        lobby.remove_player(&id("b")).unwrap();
        assert!(!lobby.is_full());
        assert!(!lobby.ready_to_start());
        assert_eq!(lobby.summary().taken_pawns, vec![Pawn::Red]);
    }
}
