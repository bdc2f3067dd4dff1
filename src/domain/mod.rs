//! Domain layer containing the session models and the action protocol.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `matchmaking` - Lobby listing for players not seated anywhere
//! - `lobby` - Pre-game seating and readiness
//! - `game` - Authoritative match model and its collaborator seams
//! - `action` - Replicated units of change (apply and reflect)
//! - `client_state` - Client-side projection updated by reflection

pub mod action;
pub mod client_state;
pub mod foundation;
pub mod game;
pub mod lobby;
pub mod matchmaking;
