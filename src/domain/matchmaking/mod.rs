//! Matchmaking domain module.
//!
//! The model a pre-session controller owns: the lobby listing shown to
//! players that are not seated anywhere yet.

use serde::{Deserialize, Serialize};

use crate::domain::lobby::LobbySummary;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchmaking {
    lobbies: Vec<LobbySummary>,
}

impl Matchmaking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lobbies(&self) -> &[LobbySummary] {
        &self.lobbies
    }

    pub fn refresh(&mut self, lobbies: Vec<LobbySummary>) {
        self.lobbies = lobbies;
    }
}
