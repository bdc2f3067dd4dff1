//! TCP socket-stream binding.
//!
//! One task per accepted connection:
//!
//! 1. The first packet must be `identity`, within the pulse threshold.
//! 2. A [`TcpRemoteListener`] is registered with the dispatcher; a writer
//!    task drains its outbound queue onto the socket.
//! 3. The read loop touches the pulse on every packet, submits actions
//!    under the handshake identity and times out after the threshold.
//! 4. However the loop ends, the listener is removed from the dispatcher.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time;
use tokio_util::codec::Framed;

use super::codec::{Packet, PacketCodec, ProtocolError};
use super::listener::TcpRemoteListener;
use crate::application::liveness::Pulse;
use crate::domain::foundation::Identity;
use crate::ports::{Dispatcher, KeepAlive, Listener};

type PacketStream = SplitStream<Framed<TcpStream, PacketCodec>>;

#[derive(Debug, Clone)]
pub struct TcpBindingConfig {
    pub max_frame_bytes: usize,
    pub pulse_threshold: Duration,
}

impl Default for TcpBindingConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 1024 * 1024,
            pulse_threshold: Duration::from_secs(10),
        }
    }
}

pub struct TcpBinding {
    dispatcher: Arc<dyn Dispatcher>,
    config: TcpBindingConfig,
    connections: RwLock<HashMap<u64, Arc<TcpRemoteListener>>>,
    next_connection: AtomicU64,
}

impl TcpBinding {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, config: TcpBindingConfig) -> Self {
        Self {
            dispatcher,
            config,
            connections: RwLock::new(HashMap::new()),
            next_connection: AtomicU64::new(1),
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Accepts connections until shutdown.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> io::Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "TCP binding listening");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("TCP binding stopping");
                        return Ok(());
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let binding = self.clone();
                        tokio::spawn(async move { binding.handle_connection(stream, peer).await });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
            }
        }
    }

    async fn handle_connection(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        let framed = Framed::new(stream, PacketCodec::new(self.config.max_frame_bytes));
        let (mut sink, mut packets) = framed.split();

        let identity = match self.handshake(&mut packets).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "rejecting connection");
                return;
            }
        };

        let (outbound, mut queue) = mpsc::unbounded_channel::<Packet>();
        let writer = tokio::spawn(async move {
            while let Some(packet) = queue.recv().await {
                if let Err(e) = sink.send(packet).await {
                    tracing::debug!(error = %e, "write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let connection = self.next_connection.fetch_add(1, Ordering::Relaxed);
        let listener = Arc::new(TcpRemoteListener::new(
            identity.clone(),
            outbound,
            Pulse::new(self.config.pulse_threshold),
        ));
        let registered: Arc<dyn Listener> = listener.clone();
        self.connections
            .write()
            .await
            .insert(connection, listener.clone());
        tracing::info!(peer = %peer, identity = %identity, connection, "client connected");

        match self.dispatcher.register_new_listener(registered.clone()).await {
            Ok(()) => {
                let reason = self.read_loop(&listener, &mut packets).await;
                tracing::info!(identity = %identity, connection, reason, "client disconnected");
            }
            Err(e) => tracing::warn!(identity = %identity, error = %e, "registration refused"),
        }

        self.connections.write().await.remove(&connection);
        if let Err(e) = self.dispatcher.remove_listener(&registered).await {
            tracing::warn!(identity = %identity, error = %e, "failed to remove listener");
        }
        writer.abort();
    }

    async fn handshake(&self, packets: &mut PacketStream) -> Result<Identity, ProtocolError> {
        match time::timeout(self.config.pulse_threshold, packets.next()).await {
            Err(_) => Err(ProtocolError::Handshake("no identity before timeout")),
            Ok(None) => Err(ProtocolError::Handshake("closed before identity")),
            Ok(Some(Err(e))) => Err(e),
            Ok(Some(Ok(Packet::Identity { value }))) if !value.is_blank() => Ok(value),
            Ok(Some(Ok(_))) => Err(ProtocolError::Handshake(
                "first packet must carry a non-blank identity",
            )),
        }
    }

    /// Runs until the peer goes away; returns why.
    async fn read_loop(&self, listener: &TcpRemoteListener, packets: &mut PacketStream) -> &'static str {
        loop {
            let packet = match time::timeout(self.config.pulse_threshold, packets.next()).await {
                Err(_) => return "heartbeat timeout",
                Ok(None) => return "closed by peer",
                Ok(Some(Err(e))) => {
                    tracing::debug!(identity = %listener.identity(), error = %e, "read failed");
                    return "read failure";
                }
                Ok(Some(Ok(packet))) => packet,
            };
            listener.pulse().touch();

            match packet {
                Packet::Heartbeat => {}
                Packet::Action { mut action } => {
                    action.bind_identity(listener.identity());
                    tracing::trace!(identity = %listener.identity(), action = action.label(), "action received");
                    if let Err(e) = self.dispatcher.execute(action).await {
                        listener.send_error(e.to_string());
                    }
                }
                Packet::Identity { .. } => return "identity sent twice",
            }
        }
    }
}

#[async_trait]
impl KeepAlive for TcpBinding {
    fn name(&self) -> &'static str {
        "tcp"
    }

    async fn send_heartbeats(&self) {
        let listeners: Vec<_> = self.connections.read().await.values().cloned().collect();
        for listener in listeners {
            let _ = listener.heartbeat().await;
        }
    }
}
