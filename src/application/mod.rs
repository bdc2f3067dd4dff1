//! Application layer - session controllers and the services around them.
//!
//! - `controllers` - Matchmaking, lobby and game sessions
//! - `router` - The server-side [`Dispatcher`](crate::ports::Dispatcher)
//! - `registry` - Live games, saved and restored as a whole
//! - `liveness` - Heartbeats and dead-listener handling
//! - `autosave` - Periodic persistence
//! - `client` - The listener a client process registers

pub mod autosave;
pub mod client;
pub mod controllers;
pub mod liveness;
pub mod registry;
pub mod router;

#[cfg(test)]
pub(crate) mod test_support;

pub use autosave::{AutosaveConfig, AutosaveService};
pub use client::ClientListener;
pub use controllers::{GameController, LobbyController, MatchmakingController};
pub use liveness::{
    dead_listener_channel, DeadListenerFeed, DeadListenerSink, DisconnectMonitor,
    HeartbeatBroadcaster, Pulse,
};
pub use registry::SessionRegistry;
pub use router::{Placement, ServerDispatcher};
