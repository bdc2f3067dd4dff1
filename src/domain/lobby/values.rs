//! Lobby value objects.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::LobbyId;

/// Pawn colour; each lobby hands out every colour at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pawn {
    Red,
    Blue,
    Green,
    Yellow,
}

impl fmt::Display for Pawn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Pawn::Red => "red",
            Pawn::Blue => "blue",
            Pawn::Green => "green",
            Pawn::Yellow => "yellow",
        };
        f.write_str(s)
    }
}

/// Lobby lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyState {
    #[default]
    Waiting,
    ReadyToStart,
}

/// What players in matchmaking see of a lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySummary {
    pub id: LobbyId,
    pub nicknames: Vec<String>,
    pub seats: usize,
    pub taken_pawns: Vec<Pawn>,
}

impl LobbySummary {
    pub fn has_free_seat(&self) -> bool {
        self.nicknames.len() < self.seats
    }
}
