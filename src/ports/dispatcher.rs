//! Dispatcher port - the contract every transport binding funnels into.

use async_trait::async_trait;
use std::sync::Arc;

use super::Listener;
use crate::domain::action::Action;
use crate::domain::foundation::Identity;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("No session owns identity '{0}'")]
    UnknownIdentity(Identity),

    /// The controller handed this identity to another one; look it up again.
    #[error("Identity '{0}' moved to another session")]
    Moved(Identity),

    #[error("Clients cannot submit server actions")]
    ServerActionRejected,

    #[error("Dispatcher is shutting down")]
    ShuttingDown,
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Routes an action to the session owning its identity, applies it and
    /// fans it out to that session's listeners.
    async fn execute(&self, action: Action) -> Result<(), DispatchError>;

    /// Attaches a freshly connected listener: back into its live game if it
    /// has one, otherwise into matchmaking.
    async fn register_new_listener(&self, listener: Arc<dyn Listener>) -> Result<(), DispatchError>;

    /// Detaches a listener. Sessions outlive their listeners.
    async fn remove_listener(&self, listener: &Arc<dyn Listener>) -> Result<(), DispatchError>;
}
