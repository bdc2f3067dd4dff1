//! Codex Session - session backbone for a multiplayer card game server.
//!
//! Players are routed from matchmaking into lobbies and from full lobbies
//! into games. Every change is an action applied on the server and
//! reflected on each client, carried over either a TCP packet stream or a
//! remote-invocation binding. Heartbeats detect lost players, who may later
//! resume, and live games are saved periodically for crash recovery.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
