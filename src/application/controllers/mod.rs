//! Session controllers.
//!
//! Each controller owns one model behind a mutex together with the listeners
//! observing it. Applying an action and fanning it out happen under that
//! lock, so every listener of a session sees actions in apply order.

mod game;
mod lobby;
mod matchmaking;
mod session;

pub use game::GameController;
pub use lobby::{LobbyController, LobbyHost, SeatError};
pub use matchmaking::MatchmakingController;
