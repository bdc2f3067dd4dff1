//! Remote-invocation client.
//!
//! Binds to a named dispatcher over a WebSocket and exports one local
//! [`ClientListener`] under a fixed handle. The server drives that listener
//! with `notify`, `heartbeat` and `check_pulse` calls; a watchdog reports
//! the server lost once those calls stop arriving. A notify that cannot be
//! reflected drops the connection as well.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::peer::{CallHandler, RemoteError, RemotePeer};
use super::protocol::{RemoteCall, ReplyValue};
use crate::application::ClientListener;
use crate::domain::action::{Action, PlayerAction};
use crate::domain::foundation::Identity;
use crate::ports::{ConnectionError, Listener, SessionConnection};

const LISTENER_HANDLE: u64 = 1;

#[derive(Debug, Clone)]
pub struct RemoteClientConfig {
    pub call_timeout: Duration,
}

impl Default for RemoteClientConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(2),
        }
    }
}

pub struct RemoteClient {
    identity: Identity,
    peer: Arc<RemotePeer>,
    tasks: Vec<JoinHandle<()>>,
}

impl RemoteClient {
    /// Connects to `url` (`ws://host:port/registry/{name}`) and registers
    /// the listener with the dispatcher bound there.
    pub async fn connect(
        url: &str,
        listener: Arc<ClientListener>,
        config: RemoteClientConfig,
    ) -> Result<Self, ConnectionError> {
        let (socket, _) = connect_async(url)
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;
        let (mut sink, mut stream) = socket.split();

        let (outbound, mut queue) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(async move {
            while let Some(text) = queue.recv().await {
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let diverged = Arc::new(Notify::new());
        let handler = Arc::new(ClientCallHandler {
            listener: listener.clone(),
            diverged: diverged.clone(),
        });
        let peer = RemotePeer::start(outbound, config.call_timeout, handler);

        let watched = listener.clone();
        let watchdog = tokio::spawn(async move {
            let threshold = watched.pulse().threshold();
            let mut ticker = time::interval(threshold / 2);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !watched.check_pulse().await {
                    tracing::warn!(threshold_ms = threshold.as_millis() as u64, "server went silent");
                    watched.server_lost().await;
                    return;
                }
            }
        });

        let reading = peer.clone();
        let lost = listener.clone();
        let stop_writer = writer.abort_handle();
        let stop_watchdog = watchdog.abort_handle();
        let reader = tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    frame = stream.next() => frame,
                    _ = diverged.notified() => break,
                };
                match frame {
                    Some(Ok(Message::Text(text))) => reading.handle_incoming(text.as_str()),
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "connection to server failed");
                        break;
                    }
                }
            }
            reading.close();
            stop_watchdog.abort();
            stop_writer.abort();
            lost.server_lost().await;
        });

        let client = Self {
            identity: listener.identity().clone(),
            peer,
            tasks: vec![writer, watchdog, reader],
        };
        client
            .peer
            .call(RemoteCall::RegisterListener {
                handle: LISTENER_HANDLE,
            })
            .await
            .map_err(connection_error)?;
        Ok(client)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    fn shutdown(&self) {
        self.peer.close();
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl SessionConnection for RemoteClient {
    async fn submit(&self, action: PlayerAction) -> Result<(), ConnectionError> {
        self.peer
            .call(RemoteCall::Execute {
                handle: LISTENER_HANDLE,
                action: Action::player(self.identity.clone(), action),
            })
            .await
            .map(|_| ())
            .map_err(connection_error)
    }

    async fn close(&self) {
        let _ = self
            .peer
            .call(RemoteCall::RemoveListener {
                handle: LISTENER_HANDLE,
            })
            .await;
        self.shutdown();
    }
}

impl Drop for RemoteClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn connection_error(e: RemoteError) -> ConnectionError {
    match e {
        RemoteError::Remote(message) => ConnectionError::Rejected(message),
        RemoteError::Closed => ConnectionError::Closed,
        other => ConnectionError::Transport(other.to_string()),
    }
}

/// Serves the server's calls on the exported listener.
struct ClientCallHandler {
    listener: Arc<ClientListener>,
    /// Signalled when a notify could not be reflected.
    diverged: Arc<Notify>,
}

impl ClientCallHandler {
    fn check_handle(&self, handle: u64) -> Result<(), String> {
        if handle == LISTENER_HANDLE {
            Ok(())
        } else {
            Err(format!("no listener exported as {}", handle))
        }
    }
}

#[async_trait]
impl CallHandler for ClientCallHandler {
    async fn handle(&self, call: RemoteCall) -> Result<ReplyValue, String> {
        match call {
            RemoteCall::Notify { handle, action } => {
                self.check_handle(handle)?;
                // Any call from the server proves it is alive.
                let _ = self.listener.heartbeat().await;
                if let Err(e) = self.listener.notify(&action).await {
                    tracing::error!(action = action.label(), error = %e, "client state diverged");
                    self.diverged.notify_one();
                    return Err(e.to_string());
                }
                Ok(ReplyValue::Unit)
            }
            RemoteCall::Heartbeat { handle } => {
                self.check_handle(handle)?;
                let _ = self.listener.heartbeat().await;
                Ok(ReplyValue::Unit)
            }
            RemoteCall::CheckPulse { handle } => {
                self.check_handle(handle)?;
                Ok(ReplyValue::Bool(self.listener.check_pulse().await))
            }
            RemoteCall::GetIdentity { handle } => {
                self.check_handle(handle)?;
                Ok(ReplyValue::Identity(self.listener.identity().clone()))
            }
            other => Err(format!("{} is not served by a client", other.method())),
        }
    }
}
