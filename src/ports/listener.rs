//! Listener port - one connected player session as seen by a dispatcher.
//!
//! Transport bindings implement this for their remote endpoints; the client
//! side implements it for the local projection.

use async_trait::async_trait;

use crate::domain::action::{Action, ReflectError};
use crate::domain::foundation::Identity;

/// Errors a listener reports back to whoever notified it.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Connection closed")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Reflect failed: {0}")]
    Reflect(#[from] ReflectError),
}

#[async_trait]
pub trait Listener: Send + Sync {
    /// Stable identity of the player behind this listener.
    fn identity(&self) -> &Identity;

    /// Delivers one action for reflection.
    async fn notify(&self, action: &Action) -> Result<(), ListenerError>;

    /// Keep-alive signal.
    async fn heartbeat(&self) -> Result<(), ListenerError>;

    /// True while the last heartbeat is within the liveness threshold.
    /// Transport faults count as a dead pulse rather than an error.
    async fn check_pulse(&self) -> bool;
}
