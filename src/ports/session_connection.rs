//! Session connection port - a client's handle on the server, whatever the
//! transport.

use async_trait::async_trait;

use crate::domain::action::PlayerAction;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection closed")]
    Closed,

    #[error("Server rejected the request: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait SessionConnection: Send + Sync {
    /// Submits an action on behalf of the connected identity.
    async fn submit(&self, action: PlayerAction) -> Result<(), ConnectionError>;

    /// Leaves the session; the server treats it as a disconnect.
    async fn close(&self);
}
