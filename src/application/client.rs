//! Client-side listener: the local projection a server notifies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::liveness::Pulse;
use crate::domain::action::{Action, ServerAction};
use crate::domain::client_state::ClientState;
use crate::domain::foundation::Identity;
use crate::ports::{Listener, ListenerError};

/// Reflects every notified action into a [`ClientState`] and watches the
/// server's heartbeats.
pub struct ClientListener {
    identity: Identity,
    state: Arc<Mutex<ClientState>>,
    pulse: Pulse,
}

impl ClientListener {
    pub fn new(state: ClientState, threshold: Duration) -> Self {
        Self {
            identity: state.identity().clone(),
            state: Arc::new(Mutex::new(state)),
            pulse: Pulse::new(threshold),
        }
    }

    pub fn state(&self) -> Arc<Mutex<ClientState>> {
        self.state.clone()
    }

    pub fn pulse(&self) -> &Pulse {
        &self.pulse
    }

    /// The server went silent: the local player is shown as disconnected.
    pub async fn server_lost(&self) {
        let hang = Action::server(self.identity.clone(), ServerAction::Hang);
        let mut state = self.state.lock().await;
        if let Err(e) = hang.reflect(&mut state) {
            tracing::warn!(identity = %self.identity, error = %e, "could not mark client disconnected");
        }
        state.notify_game_model_update();
    }
}

#[async_trait]
impl Listener for ClientListener {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    async fn notify(&self, action: &Action) -> Result<(), ListenerError> {
        let mut state = self.state.lock().await;
        action.reflect(&mut state)?;
        state.notify_game_model_update();
        Ok(())
    }

    async fn heartbeat(&self) -> Result<(), ListenerError> {
        self.pulse.touch();
        Ok(())
    }

    async fn check_pulse(&self) -> bool {
        self.pulse.is_alive()
    }
}
