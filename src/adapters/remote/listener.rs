//! Server-side proxy for a listener a remote client exported.

use std::sync::Arc;

use async_trait::async_trait;

use super::peer::{RemoteError, RemotePeer};
use super::protocol::{RemoteCall, ReplyValue};
use crate::domain::action::Action;
use crate::domain::foundation::Identity;
use crate::ports::{Listener, ListenerError};

pub struct RemoteListener {
    identity: Identity,
    handle: u64,
    peer: Arc<RemotePeer>,
}

impl RemoteListener {
    /// Asks the client for the identity behind `handle` and caches it.
    pub async fn connect(peer: Arc<RemotePeer>, handle: u64) -> Result<Self, RemoteError> {
        match peer.call(RemoteCall::GetIdentity { handle }).await? {
            ReplyValue::Identity(identity) => Ok(Self {
                identity,
                handle,
                peer,
            }),
            _ => Err(RemoteError::UnexpectedReply("get_identity")),
        }
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }
}

#[async_trait]
impl Listener for RemoteListener {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    async fn notify(&self, action: &Action) -> Result<(), ListenerError> {
        self.peer
            .call(RemoteCall::Notify {
                handle: self.handle,
                action: action.clone(),
            })
            .await
            .map(|_| ())
            .map_err(|e| ListenerError::Transport(e.to_string()))
    }

    async fn heartbeat(&self) -> Result<(), ListenerError> {
        self.peer
            .call(RemoteCall::Heartbeat {
                handle: self.handle,
            })
            .await
            .map(|_| ())
            .map_err(|e| ListenerError::Transport(e.to_string()))
    }

    async fn check_pulse(&self) -> bool {
        matches!(
            self.peer
                .call(RemoteCall::CheckPulse {
                    handle: self.handle,
                })
                .await,
            Ok(ReplyValue::Bool(true))
        )
    }
}
