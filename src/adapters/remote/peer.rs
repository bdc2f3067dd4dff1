//! One end of a remote connection: outgoing calls with timeouts plus an
//! in-order worker serving incoming calls.
//!
//! Incoming calls never run on the reader: a call being served may itself
//! wait for a reply (a dispatcher notifying the caller's own listener), and
//! that reply has to be read meanwhile.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time;

use super::protocol::{RemoteCall, RemoteMessage, ReplyValue};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Connection closed")]
    Closed,

    #[error("Remote call timed out")]
    Timeout,

    #[error("Remote side failed: {0}")]
    Remote(String),

    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Unexpected reply to {0}")]
    UnexpectedReply(&'static str),
}

/// Serves calls arriving from the other side.
#[async_trait]
pub trait CallHandler: Send + Sync {
    async fn handle(&self, call: RemoteCall) -> Result<ReplyValue, String>;
}

type PendingReply = oneshot::Sender<Result<ReplyValue, String>>;

pub struct RemotePeer {
    outbound: mpsc::UnboundedSender<String>,
    pending: Mutex<HashMap<u64, PendingReply>>,
    calls: Mutex<Option<mpsc::UnboundedSender<(u64, RemoteCall)>>>,
    next_id: AtomicU64,
    call_timeout: Duration,
}

impl RemotePeer {
    /// Peer writing its frames to `outbound`; incoming calls go to `handler`
    /// one at a time, in arrival order.
    pub fn start(
        outbound: mpsc::UnboundedSender<String>,
        call_timeout: Duration,
        handler: Arc<dyn CallHandler>,
    ) -> Arc<Self> {
        let (calls, mut queue) = mpsc::unbounded_channel::<(u64, RemoteCall)>();
        let replies = outbound.clone();
        tokio::spawn(async move {
            while let Some((id, call)) = queue.recv().await {
                let method = call.method();
                let result = handler.handle(call).await;
                if let Err(e) = &result {
                    tracing::debug!(method, error = %e, "remote call failed");
                }
                if let Err(e) = send_message(&replies, &RemoteMessage::Reply { id, result }) {
                    tracing::debug!(method, error = %e, "reply not sent");
                }
            }
        });

        Arc::new(Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            calls: Mutex::new(Some(calls)),
            next_id: AtomicU64::new(1),
            call_timeout,
        })
    }

    /// Calls the other side and waits for its reply.
    pub async fn call(&self, call: RemoteCall) -> Result<ReplyValue, RemoteError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.lock_pending().insert(id, tx);

        if let Err(e) = send_message(&self.outbound, &RemoteMessage::Call { id, call }) {
            self.lock_pending().remove(&id);
            return Err(e);
        }

        match time::timeout(self.call_timeout, rx).await {
            Err(_) => {
                self.lock_pending().remove(&id);
                Err(RemoteError::Timeout)
            }
            Ok(Err(_)) => Err(RemoteError::Closed),
            Ok(Ok(Err(message))) => Err(RemoteError::Remote(message)),
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }

    /// Routes one incoming frame.
    pub fn handle_incoming(&self, text: &str) {
        match serde_json::from_str::<RemoteMessage>(text) {
            Ok(RemoteMessage::Reply { id, result }) => {
                if let Some(waiting) = self.lock_pending().remove(&id) {
                    let _ = waiting.send(result);
                }
            }
            Ok(RemoteMessage::Call { id, call }) => {
                let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(calls) = calls.as_ref() {
                    let _ = calls.send((id, call));
                }
            }
            Err(e) => tracing::warn!(error = %e, "malformed remote frame"),
        }
    }

    /// Fails every pending call and stops serving incoming ones.
    pub fn close(&self) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.lock_pending().clear();
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<u64, PendingReply>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn send_message(
    outbound: &mpsc::UnboundedSender<String>,
    message: &RemoteMessage,
) -> Result<(), RemoteError> {
    let text = serde_json::to_string(message)?;
    outbound.send(text).map_err(|_| RemoteError::Closed)
}
