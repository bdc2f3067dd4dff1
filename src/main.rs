use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use codex_session::adapters::remote::{EndpointRegistry, RemoteBinding};
use codex_session::adapters::storage::FileSessionStore;
use codex_session::adapters::tcp::{TcpBinding, TcpBindingConfig};
use codex_session::application::{
    dead_listener_channel, AutosaveConfig, AutosaveService, DisconnectMonitor,
    HeartbeatBroadcaster, ServerDispatcher, SessionRegistry,
};
use codex_session::config::{AppConfig, LogFormat};
use codex_session::domain::game::StandardGameFactory;
use codex_session::ports::{Dispatcher, KeepAlive, SessionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(environment = ?config.server.environment, "starting codex session server");

    // Crash recovery
    let store: Arc<dyn SessionStore> =
        Arc::new(FileSessionStore::new(&config.persistence.snapshot_path));
    let restored = SessionRegistry::restore(store.as_ref()).await;

    let (dead, feed) = dead_listener_channel();
    let dispatcher = ServerDispatcher::new(
        Arc::new(SessionRegistry::new()),
        Arc::new(StandardGameFactory::default()),
        config.matchmaking.clone(),
        dead.clone(),
    );
    dispatcher.adopt_restored(restored).await;
    let shared: Arc<dyn Dispatcher> = Arc::new(dispatcher.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();

    let monitor = DisconnectMonitor::new(shared.clone(), feed);
    tasks.push(tokio::spawn(monitor.run(shutdown_rx.clone())));

    // Socket-stream binding
    let tcp = Arc::new(TcpBinding::new(
        shared.clone(),
        TcpBindingConfig {
            max_frame_bytes: config.network.max_frame_bytes,
            pulse_threshold: config.liveness.pulse_threshold(),
        },
    ));
    let tcp_socket = TcpListener::bind(config.server.socket_addr(config.network.tcp_port)?).await?;
    {
        let tcp = tcp.clone();
        let shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = tcp.serve(tcp_socket, shutdown).await {
                tracing::error!(error = %e, "TCP binding failed");
            }
        }));
    }

    // Remote-invocation binding
    let endpoints = Arc::new(EndpointRegistry::new());
    endpoints
        .bind(config.network.remote_endpoint_name.clone(), shared.clone())
        .await;
    let remote = Arc::new(RemoteBinding::new(
        endpoints,
        config.network.remote_call_timeout(),
        dead,
    ));
    let remote_socket =
        TcpListener::bind(config.server.socket_addr(config.network.remote_port)?).await?;
    {
        let remote = remote.clone();
        let shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = remote.serve(remote_socket, shutdown).await {
                tracing::error!(error = %e, "remote binding failed");
            }
        }));
    }

    let tcp_keep_alive: Arc<dyn KeepAlive> = tcp;
    let remote_keep_alive: Arc<dyn KeepAlive> = remote;
    let heartbeats = HeartbeatBroadcaster::new(config.liveness.heartbeat_interval())
        .with_binding(tcp_keep_alive)
        .with_binding(remote_keep_alive);
    {
        let shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move { heartbeats.run(shutdown).await }));
    }

    let autosave = AutosaveService::with_config(
        dispatcher,
        store,
        AutosaveConfig::default()
            .with_save_interval(config.persistence.save_interval())
            .with_ended_retention(config.persistence.ended_retention()),
    );
    {
        let shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move { autosave.run(shutdown).await }));
    }

    tracing::info!(
        tcp_port = config.network.tcp_port,
        remote_port = config.network.remote_port,
        endpoint = %config.network.remote_endpoint_name,
        "codex session server ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    let _ = shutdown_tx.send(true);

    for task in tasks {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "task ended abnormally");
        }
    }
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    match config.server.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
