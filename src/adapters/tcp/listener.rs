//! Server-side stand-in for one TCP client.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::codec::Packet;
use crate::application::liveness::Pulse;
use crate::domain::action::{Action, ServerAction};
use crate::domain::foundation::Identity;
use crate::ports::{Listener, ListenerError};

/// Queues packets for the connection's writer task. The pulse is fed by
/// the connection's read loop.
pub struct TcpRemoteListener {
    identity: Identity,
    outbound: mpsc::UnboundedSender<Packet>,
    pulse: Pulse,
}

impl TcpRemoteListener {
    pub fn new(identity: Identity, outbound: mpsc::UnboundedSender<Packet>, pulse: Pulse) -> Self {
        Self {
            identity,
            outbound,
            pulse,
        }
    }

    pub fn pulse(&self) -> &Pulse {
        &self.pulse
    }

    /// Tells this client alone that its request was refused.
    pub fn send_error(&self, message: String) {
        let error = Action::server(self.identity.clone(), ServerAction::Error { message });
        let _ = self.outbound.send(Packet::Action { action: error });
    }

    fn send(&self, packet: Packet) -> Result<(), ListenerError> {
        self.outbound.send(packet).map_err(|_| ListenerError::Closed)
    }
}

#[async_trait]
impl Listener for TcpRemoteListener {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    async fn notify(&self, action: &Action) -> Result<(), ListenerError> {
        self.send(Packet::Action {
            action: action.clone(),
        })
    }

    async fn heartbeat(&self) -> Result<(), ListenerError> {
        self.send(Packet::Heartbeat)
    }

    async fn check_pulse(&self) -> bool {
        !self.outbound.is_closed() && self.pulse.is_alive()
    }
}
