//! Matchmaking configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::lobby::MIN_PLAYERS;

/// Largest table the game supports.
const MAX_SEATS: usize = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct MatchmakingConfig {
    /// Seats in every lobby the server opens
    #[serde(default = "default_seats_per_lobby")]
    pub seats_per_lobby: usize,

    /// Seat fresh connections right away instead of sending a lobby list
    #[serde(default = "default_auto_seat")]
    pub auto_seat: bool,
}

impl MatchmakingConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_PLAYERS..=MAX_SEATS).contains(&self.seats_per_lobby) {
            return Err(ValidationError::InvalidSeatCount(self.seats_per_lobby));
        }
        Ok(())
    }
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            seats_per_lobby: default_seats_per_lobby(),
            auto_seat: default_auto_seat(),
        }
    }
}

fn default_seats_per_lobby() -> usize {
    4
}

fn default_auto_seat() -> bool {
    true
}
