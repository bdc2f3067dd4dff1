//! Loopback harness shared by the integration tests.
//!
//! Each test gets its own server on ephemeral ports: a dispatcher, the TCP
//! and remote bindings, a heartbeat broadcaster and a disconnect monitor.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::codec::Framed;

use codex_session::adapters::remote::{EndpointRegistry, RemoteBinding, RemoteClient, RemoteClientConfig};
use codex_session::adapters::tcp::{Packet, PacketCodec, TcpBinding, TcpBindingConfig, TcpClient, TcpClientConfig};
use codex_session::application::{
    dead_listener_channel, ClientListener, DisconnectMonitor, HeartbeatBroadcaster, ServerDispatcher,
    SessionRegistry,
};
use codex_session::config::MatchmakingConfig;
use codex_session::domain::action::{Action, PlayerAction};
use codex_session::domain::client_state::ClientState;
use codex_session::domain::foundation::{GameId, Identity};
use codex_session::domain::game::{Game, StandardGameFactory};
use codex_session::ports::{Dispatcher, KeepAlive};

pub const HEARTBEAT: Duration = Duration::from_millis(100);
pub const THRESHOLD: Duration = Duration::from_millis(800);
const MAX_FRAME: usize = 1024 * 1024;

pub struct TestServer {
    pub dispatcher: ServerDispatcher,
    pub tcp: Arc<TcpBinding>,
    pub tcp_addr: SocketAddr,
    pub remote_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl TestServer {
    pub async fn start(seats: usize) -> Self {
        Self::with_registry(seats, Arc::new(SessionRegistry::new()), None).await
    }

    /// Server whose dispatcher may first adopt `restored` games.
    pub async fn with_registry(
        seats: usize,
        registry: Arc<SessionRegistry>,
        restored: Option<HashMap<GameId, Game>>,
    ) -> Self {
        let (dead, feed) = dead_listener_channel();
        let dispatcher = ServerDispatcher::new(
            registry,
            Arc::new(StandardGameFactory::default()),
            MatchmakingConfig {
                seats_per_lobby: seats,
                auto_seat: true,
            },
            dead.clone(),
        );
        if let Some(games) = restored {
            dispatcher.adopt_restored(games).await;
        }
        let shared: Arc<dyn Dispatcher> = Arc::new(dispatcher.clone());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(
            DisconnectMonitor::new(shared.clone(), feed).run(shutdown_rx.clone()),
        ));

        let tcp = Arc::new(TcpBinding::new(
            shared.clone(),
            TcpBindingConfig {
                max_frame_bytes: MAX_FRAME,
                pulse_threshold: THRESHOLD,
            },
        ));
        let tcp_socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let tcp_addr = tcp_socket.local_addr().unwrap();
        {
            let tcp = tcp.clone();
            let shutdown = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                tcp.serve(tcp_socket, shutdown).await.unwrap();
            }));
        }

        let endpoints = Arc::new(EndpointRegistry::new());
        endpoints.bind("dispatcher", shared.clone()).await;
        let remote = Arc::new(RemoteBinding::new(endpoints, Duration::from_secs(2), dead));
        let remote_socket = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let remote_addr = remote_socket.local_addr().unwrap();
        {
            let remote = remote.clone();
            let shutdown = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                remote.serve(remote_socket, shutdown).await.unwrap();
            }));
        }

        let tcp_keep_alive: Arc<dyn KeepAlive> = tcp.clone();
        let remote_keep_alive: Arc<dyn KeepAlive> = remote;
        let heartbeats = HeartbeatBroadcaster::new(HEARTBEAT)
            .with_binding(tcp_keep_alive)
            .with_binding(remote_keep_alive);
        {
            let shutdown = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move { heartbeats.run(shutdown).await }));
        }

        Self {
            dispatcher,
            tcp,
            tcp_addr,
            remote_addr,
            shutdown,
            tasks,
        }
    }

    pub fn remote_url(&self, endpoint: &str) -> String {
        format!("ws://{}/registry/{}", self.remote_addr, endpoint)
    }

    /// Bare framed socket to the TCP binding; nothing is sent yet.
    pub async fn raw_tcp(&self) -> Framed<TcpStream, PacketCodec> {
        let stream = TcpStream::connect(self.tcp_addr).await.unwrap();
        Framed::new(stream, PacketCodec::new(MAX_FRAME))
    }

    pub async fn tcp_player(&self, who: &str) -> (TcpClient, Arc<ClientListener>) {
        let listener = client_listener(who);
        let client = TcpClient::connect(
            self.tcp_addr,
            listener.clone(),
            TcpClientConfig {
                heartbeat_interval: HEARTBEAT,
                max_frame_bytes: MAX_FRAME,
            },
        )
        .await
        .unwrap();
        (client, listener)
    }

    pub async fn remote_player(&self, who: &str) -> (RemoteClient, Arc<ClientListener>) {
        let listener = client_listener(who);
        let client = RemoteClient::connect(
            &self.remote_url("dispatcher"),
            listener.clone(),
            RemoteClientConfig::default(),
        )
        .await
        .unwrap();
        (client, listener)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        for task in &self.tasks {
            task.abort();
        }
    }
}

pub fn id(s: &str) -> Identity {
    Identity::new(s)
}

pub fn client_listener(who: &str) -> Arc<ClientListener> {
    Arc::new(ClientListener::new(ClientState::new(id(who)), THRESHOLD))
}

/// Polls `check` until it holds; panics after five seconds.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = time::Instant::now() + Duration::from_secs(5);
    loop {
        if check().await {
            return;
        }
        if time::Instant::now() >= deadline {
            panic!("timed out waiting for: {}", what);
        }
        time::sleep(Duration::from_millis(20)).await;
    }
}

/// Reads from a client's projection.
pub async fn view<T>(listener: &ClientListener, read: impl FnOnce(&ClientState) -> T) -> T {
    let state = listener.state();
    let state = state.lock().await;
    read(&state)
}

/// A raw TCP peer that heartbeats until told to go silent.
///
/// Lets a test stop the heartbeats of one player while keeping the socket
/// open, the way a frozen client looks to the server.
pub struct ScriptedPeer {
    identity: Identity,
    outbound: mpsc::UnboundedSender<Packet>,
    heartbeat: JoinHandle<()>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl ScriptedPeer {
    pub async fn connect(addr: SocketAddr, who: &str) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut sink, mut packets) = Framed::new(stream, PacketCodec::new(MAX_FRAME)).split();
        sink.send(Packet::Identity { value: id(who) }).await.unwrap();

        let (outbound, mut queue) = mpsc::unbounded_channel::<Packet>();
        let writer = tokio::spawn(async move {
            while let Some(packet) = queue.recv().await {
                if sink.send(packet).await.is_err() {
                    break;
                }
            }
        });
        let beats = outbound.clone();
        let heartbeat = tokio::spawn(async move {
            let mut ticker = time::interval(HEARTBEAT);
            loop {
                ticker.tick().await;
                if beats.send(Packet::Heartbeat).is_err() {
                    return;
                }
            }
        });
        // Drain whatever the server sends so its writes never stall.
        let reader = tokio::spawn(async move { while packets.next().await.is_some() {} });

        Self {
            identity: id(who),
            outbound,
            heartbeat,
            writer,
            reader,
        }
    }

    pub fn submit(&self, action: PlayerAction) {
        self.outbound
            .send(Packet::Action {
                action: Action::player(self.identity.clone(), action),
            })
            .unwrap();
    }

    pub fn go_silent(&self) {
        self.heartbeat.abort();
    }
}

impl Drop for ScriptedPeer {
    fn drop(&mut self) {
        self.heartbeat.abort();
        self.writer.abort();
        self.reader.abort();
    }
}
