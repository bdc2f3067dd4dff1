//! TCP client connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::codec::Framed;

use super::codec::{Packet, PacketCodec};
use crate::application::ClientListener;
use crate::domain::action::{Action, PlayerAction};
use crate::domain::foundation::Identity;
use crate::ports::{ConnectionError, Listener, SessionConnection};

#[derive(Debug, Clone)]
pub struct TcpClientConfig {
    pub heartbeat_interval: Duration,
    pub max_frame_bytes: usize,
}

impl Default for TcpClientConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(1),
            max_frame_bytes: 1024 * 1024,
        }
    }
}

/// Client end of the TCP binding.
///
/// Sends heartbeats on an interval and hands every received action to the
/// [`ClientListener`]. When the server stays silent past the listener's
/// pulse threshold, or an action cannot be reflected, the connection is
/// dropped and the listener is told the server is lost.
pub struct TcpClient {
    identity: Identity,
    outbound: mpsc::UnboundedSender<Packet>,
    tasks: Vec<JoinHandle<()>>,
}

impl TcpClient {
    pub async fn connect<A: ToSocketAddrs>(
        addr: A,
        listener: Arc<ClientListener>,
        config: TcpClientConfig,
    ) -> Result<Self, ConnectionError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;
        let (mut sink, mut packets) = Framed::new(stream, PacketCodec::new(config.max_frame_bytes)).split();

        let identity = listener.identity().clone();
        sink.send(Packet::Identity {
            value: identity.clone(),
        })
        .await
        .map_err(|e| ConnectionError::Transport(e.to_string()))?;

        let (outbound, mut queue) = mpsc::unbounded_channel::<Packet>();

        let writer = tokio::spawn(async move {
            while let Some(packet) = queue.recv().await {
                if sink.send(packet).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let beats = outbound.clone();
        let interval = config.heartbeat_interval;
        let heartbeat = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if beats.send(Packet::Heartbeat).is_err() {
                    return;
                }
            }
        });

        let threshold = listener.pulse().threshold();
        let stop_writer = writer.abort_handle();
        let stop_heartbeat = heartbeat.abort_handle();
        let reader = tokio::spawn(async move {
            loop {
                match time::timeout(threshold, packets.next()).await {
                    Ok(Some(Ok(Packet::Heartbeat))) => {
                        let _ = listener.heartbeat().await;
                    }
                    Ok(Some(Ok(Packet::Action { action }))) => {
                        let _ = listener.heartbeat().await;
                        if let Err(e) = listener.notify(&action).await {
                            tracing::error!(action = action.label(), error = %e, "client state diverged");
                            break;
                        }
                    }
                    Ok(Some(Ok(Packet::Identity { .. }))) => {
                        tracing::warn!("server sent an identity packet, ignoring");
                    }
                    Ok(Some(Err(e))) => {
                        tracing::warn!(error = %e, "connection to server failed");
                        break;
                    }
                    Ok(None) => {
                        tracing::info!("server closed the connection");
                        break;
                    }
                    Err(_) => {
                        tracing::warn!(threshold_ms = threshold.as_millis() as u64, "server went silent");
                        break;
                    }
                }
            }
            stop_heartbeat.abort();
            stop_writer.abort();
            listener.server_lost().await;
        });

        Ok(Self {
            identity,
            outbound,
            tasks: vec![writer, heartbeat, reader],
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl SessionConnection for TcpClient {
    async fn submit(&self, action: PlayerAction) -> Result<(), ConnectionError> {
        self.outbound
            .send(Packet::Action {
                action: Action::player(self.identity.clone(), action),
            })
            .map_err(|_| ConnectionError::Closed)
    }

    async fn close(&self) {
        self.shutdown();
    }
}

impl Drop for TcpClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}
