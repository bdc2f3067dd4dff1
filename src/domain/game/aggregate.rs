//! Game aggregate.
//!
//! Holds everything the server needs to resume a match after a restart:
//! seats, hands, the card supply, the turn pointer, who is absent and the
//! chat history.
//! Placement legality and scoring live elsewhere; the rules here are the
//! turn skeleton (place, then pick, then pass).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::cards::{CardSupply, Deck, PickSource, Placement, Position, Side};
use super::chat::ChatLog;
use super::player::{Player, MAX_HAND_SIZE};
use crate::domain::foundation::{DomainError, ErrorCode, GameId, Identity, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// Players choose their starter card side.
    Starting,
    Playing,
    /// Supply is exhausted; the round finishes.
    Ending,
    Ended,
}

/// What a given player is expected to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    SelectingStarterSide,
    PlacingCard,
    PickingCard,
    Sleeping,
    GameOver,
}

/// Game aggregate.
///
/// # Invariants
///
/// - `current_player` indexes `players`
/// - `disconnected` only holds identities of seated players
/// - `ended_at` is set exactly when `state` is `Ended`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    id: GameId,
    players: Vec<Player>,
    deck: Deck,
    current_player: usize,
    state: GameState,
    disconnected: BTreeSet<Identity>,
    ended_at: Option<Timestamp>,
    #[serde(default)]
    chat: ChatLog,
}

impl Game {
    pub fn new(id: GameId, players: Vec<Player>, deck: Deck) -> Self {
        Self {
            id,
            players,
            deck,
            current_player: 0,
            state: GameState::Starting,
            disconnected: BTreeSet::new(),
            ended_at: None,
            chat: ChatLog::default(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, identity: &Identity) -> Option<&Player> {
        self.players.iter().find(|p| &p.identity == identity)
    }

    pub fn is_member(&self, identity: &Identity) -> bool {
        self.player(identity).is_some()
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn current_player_index(&self) -> usize {
        self.current_player
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player)
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_disconnected(&self, identity: &Identity) -> bool {
        self.disconnected.contains(identity)
    }

    pub fn ended_at(&self) -> Option<Timestamp> {
        self.ended_at
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    /// Derives a player's turn phase from the turn pointer and hand size.
    ///
    /// Used for game start, for resume and after every replayed action, so a
    /// reconnecting client lands on the same phase as one that never left.
    pub fn turn_phase(&self, identity: &Identity) -> Option<TurnPhase> {
        let player = self.player(identity)?;
        let phase = if self.state == GameState::Ended {
            TurnPhase::GameOver
        } else if !player.starter_placed() {
            TurnPhase::SelectingStarterSide
        } else if self.state == GameState::Starting {
            TurnPhase::Sleeping
        } else if self.is_current(identity) {
            if player.has_full_hand() || self.deck.is_exhausted() {
                TurnPhase::PlacingCard
            } else {
                TurnPhase::PickingCard
            }
        } else {
            TurnPhase::Sleeping
        };
        Some(phase)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Turn commands
    // ─────────────────────────────────────────────────────────────────────────

    pub fn place_starter(&mut self, identity: &Identity, side: Side) -> Result<(), DomainError> {
        self.ensure_not_ended()?;
        let index = self.index_of(identity)?;
        if self.players[index].starter_placed() {
            return Err(DomainError::new(
                ErrorCode::StarterAlreadyPlaced,
                "Starter card already placed",
            ));
        }
        self.players[index].starter_side = Some(side);
        self.start_if_ready();
        Ok(())
    }

    pub fn place_card(
        &mut self,
        identity: &Identity,
        card_id: u32,
        position: Position,
        side: Side,
    ) -> Result<(), DomainError> {
        let index = self.ensure_turn_of(identity)?;
        let player = &self.players[index];
        if !player.has_full_hand() && !self.deck.is_exhausted() {
            return Err(DomainError::new(
                ErrorCode::WrongTurnPhase,
                "Pick a card before placing again",
            ));
        }
        if !player.holds(card_id) {
            return Err(DomainError::new(
                ErrorCode::CardNotFound,
                format!("Card {} is not in hand", card_id),
            ));
        }
        if player.occupies(position) {
            return Err(DomainError::new(
                ErrorCode::PositionOccupied,
                "Position already occupied",
            ));
        }

        let player = &mut self.players[index];
        player.hand.retain(|c| c.id != card_id);
        player.placements.push(Placement {
            card_id,
            position,
            side,
        });

        // Nothing left to pick: the turn ends with the placement.
        if self.deck.is_exhausted() {
            self.advance_turn();
        }
        Ok(())
    }

    pub fn pick_card(&mut self, identity: &Identity, source: PickSource) -> Result<(), DomainError> {
        let index = self.ensure_turn_of(identity)?;
        if self.players[index].has_full_hand() {
            return Err(DomainError::new(
                ErrorCode::WrongTurnPhase,
                "Place a card before picking",
            ));
        }
        let card = self.deck.take(source)?;
        self.players[index].hand.push(card);
        self.advance_turn();
        Ok(())
    }

    /// Posts a chat line from a seated player. Chat is open in every state,
    /// turn or not.
    pub fn post_message(&mut self, identity: &Identity, text: &str) -> Result<(), DomainError> {
        let index = self.index_of(identity)?;
        let nickname = self.players[index].nickname.clone();
        self.chat.post(identity, &nickname, text)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Presence
    // ─────────────────────────────────────────────────────────────────────────

    /// Marks a player absent.
    ///
    /// When it was their turn the turn is passed on; a short hand is first
    /// topped up with one substitute card from the supply.
    ///
    /// # Errors
    ///
    /// - `AlreadyDisconnected` if the player is already marked absent, so a
    ///   single outage is never handled twice
    pub fn hang_player(&mut self, identity: &Identity) -> Result<(), DomainError> {
        let index = self.index_of(identity)?;
        if !self.disconnected.insert(identity.clone()) {
            return Err(DomainError::new(
                ErrorCode::AlreadyDisconnected,
                "Player is already disconnected",
            ));
        }

        let state = self.state;
        match state {
            GameState::Starting => self.start_if_ready(),
            GameState::Playing | GameState::Ending if index == self.current_player => {
                if self.players[index].hand.len() < MAX_HAND_SIZE {
                    if let Some(card) = self.deck.draw_substitute() {
                        self.players[index].hand.push(card);
                    }
                }
                self.advance_turn();
            }
            _ => {}
        }
        Ok(())
    }

    /// Marks a player present again. Reconnecting while already present is
    /// not an error.
    pub fn resume_player(&mut self, identity: &Identity) -> Result<(), DomainError> {
        self.index_of(identity)?;
        self.disconnected.remove(identity);

        let current_absent = self
            .current_player()
            .map(|p| self.disconnected.contains(&p.identity))
            .unwrap_or(false);
        if current_absent && matches!(self.state, GameState::Playing | GameState::Ending) {
            self.advance_turn();
        }
        Ok(())
    }

    /// Marks every player absent without touching the turn; used for games
    /// restored after a restart, before anyone has reconnected.
    pub fn mark_all_disconnected(&mut self) {
        self.disconnected = self.players.iter().map(|p| p.identity.clone()).collect();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn index_of(&self, identity: &Identity) -> Result<usize, DomainError> {
        self.players
            .iter()
            .position(|p| &p.identity == identity)
            .ok_or_else(|| DomainError::new(ErrorCode::PlayerNotFound, "Player is not in this game"))
    }

    fn is_current(&self, identity: &Identity) -> bool {
        self.current_player()
            .map(|p| &p.identity == identity)
            .unwrap_or(false)
    }

    fn ensure_not_ended(&self) -> Result<(), DomainError> {
        if self.state == GameState::Ended {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Game is over",
            ));
        }
        Ok(())
    }

    fn ensure_turn_of(&self, identity: &Identity) -> Result<usize, DomainError> {
        let index = self.index_of(identity)?;
        match self.state {
            GameState::Playing | GameState::Ending => {}
            GameState::Starting => {
                return Err(DomainError::new(
                    ErrorCode::WrongTurnPhase,
                    "Waiting for every starter card",
                ))
            }
            GameState::Ended => self.ensure_not_ended()?,
        }
        if !self.players[index].starter_placed() {
            return Err(DomainError::new(
                ErrorCode::StarterNotPlaced,
                "Place the starter card first",
            ));
        }
        if index != self.current_player {
            return Err(DomainError::new(ErrorCode::NotYourTurn, "Not your turn"));
        }
        Ok(index)
    }

    fn start_if_ready(&mut self) {
        if self.state != GameState::Starting {
            return;
        }
        let ready = self
            .players
            .iter()
            .filter(|p| !self.disconnected.contains(&p.identity))
            .all(Player::starter_placed);
        if !ready {
            return;
        }
        self.state = GameState::Playing;
        let n = self.players.len();
        let first_present = (0..n)
            .map(|step| (self.current_player + step) % n)
            .find(|&i| !self.disconnected.contains(&self.players[i].identity));
        if let Some(index) = first_present {
            self.current_player = index;
        }
    }

    /// Moves the turn pointer to the next present player.
    ///
    /// An exhausted supply turns `Playing` into `Ending`; wrapping back to
    /// the first seat while already `Ending` ends the game.
    fn advance_turn(&mut self) {
        let was_ending = self.state == GameState::Ending;
        if self.state == GameState::Playing && self.deck.is_exhausted() {
            self.state = GameState::Ending;
        }

        let n = self.players.len();
        if n == 0 {
            return;
        }
        let mut index = self.current_player;
        let mut wrapped = false;
        for _ in 0..n {
            index = (index + 1) % n;
            if index == 0 {
                wrapped = true;
            }
            if !self.disconnected.contains(&self.players[index].identity) {
                break;
            }
        }
        self.current_player = index;

        if was_ending && wrapped {
            self.state = GameState::Ended;
            self.ended_at = Some(Timestamp::now());
        }
    }
}
