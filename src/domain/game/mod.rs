//! Game domain module.
//!
//! The authoritative match model plus the two collaborator seams the session
//! layer consumes: [`GameFactory`] and [`CardSupply`].

mod aggregate;
mod cards;
mod chat;
mod factory;
mod player;

pub use aggregate::{Game, GameState, TurnPhase};
pub use cards::{CardKind, CardSupply, Deck, GameCard, PickSource, Placement, Position, Side};
pub use chat::{ChatLog, ChatMessage, CHAT_HISTORY, MAX_MESSAGE_CHARS};
pub use factory::{GameFactory, StandardGameFactory};
pub use player::{Player, MAX_HAND_SIZE};
