//! In-game player state.

use serde::{Deserialize, Serialize};

use super::cards::{GameCard, Placement, Position, Side};
use crate::domain::foundation::Identity;
use crate::domain::lobby::Pawn;

/// Cards a player holds at the start of each turn.
pub const MAX_HAND_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub identity: Identity,
    pub nickname: String,
    pub pawn: Option<Pawn>,
    pub hand: Vec<GameCard>,
    pub starter_side: Option<Side>,
    pub placements: Vec<Placement>,
}

impl Player {
    pub fn new(identity: Identity, nickname: impl Into<String>, pawn: Option<Pawn>) -> Self {
        Self {
            identity,
            nickname: nickname.into(),
            pawn,
            hand: Vec::new(),
            starter_side: None,
            placements: Vec::new(),
        }
    }

    pub fn has_full_hand(&self) -> bool {
        self.hand.len() >= MAX_HAND_SIZE
    }

    pub fn starter_placed(&self) -> bool {
        self.starter_side.is_some()
    }

    pub fn holds(&self, card_id: u32) -> bool {
        self.hand.iter().any(|c| c.id == card_id)
    }

    pub fn occupies(&self, position: Position) -> bool {
        position == Position::ORIGIN || self.placements.iter().any(|p| p.position == position)
    }
}
