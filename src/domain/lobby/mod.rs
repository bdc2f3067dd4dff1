//! Lobby domain module.
//!
//! A lobby gathers players before a game: each seat gets a nickname and,
//! before the game can start, a pawn colour. Once every seat's precondition
//! holds the lobby reports itself ready and is migrated into a game.

mod aggregate;
mod values;

pub use aggregate::{Lobby, LobbyPlayer, MIN_PLAYERS};
pub use values::{LobbyState, LobbySummary, Pawn};
