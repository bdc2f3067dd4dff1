//! Remote-invocation binding, server side.
//!
//! Clients open a WebSocket on `/registry/{name}` to bind to the dispatcher
//! published under `name`, then export their listeners by handle. From
//! then on the server calls those listeners back over the same socket.
//!
//! A socket that closes, cleanly or not, removes every listener it
//! exported from the dispatcher.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tower_http::trace::TraceLayer;

use super::listener::RemoteListener;
use super::peer::{CallHandler, RemotePeer};
use super::protocol::{RemoteCall, ReplyValue};
use super::registry::EndpointRegistry;
use crate::application::liveness::DeadListenerSink;
use crate::domain::foundation::Identity;
use crate::ports::{Dispatcher, KeepAlive, Listener};

pub struct RemoteBinding {
    registry: Arc<EndpointRegistry>,
    call_timeout: Duration,
    proxies: RwLock<HashMap<u64, Arc<RemoteListener>>>,
    next_proxy: AtomicU64,
    dead: DeadListenerSink,
}

impl RemoteBinding {
    pub fn new(registry: Arc<EndpointRegistry>, call_timeout: Duration, dead: DeadListenerSink) -> Self {
        Self {
            registry,
            call_timeout,
            proxies: RwLock::new(HashMap::new()),
            next_proxy: AtomicU64::new(1),
            dead,
        }
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    pub async fn listener_count(&self) -> usize {
        self.proxies.read().await.len()
    }

    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/registry/:name", get(upgrade))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    /// Serves the registry until shutdown.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> io::Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "remote binding listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                while shutdown.changed().await.is_ok() {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                tracing::info!("remote binding stopping");
            })
            .await
    }

    async fn handle_socket(self: Arc<Self>, socket: WebSocket, dispatcher: Arc<dyn Dispatcher>) {
        let (mut sink, mut stream) = socket.split();
        let (outbound, mut queue) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(async move {
            while let Some(text) = queue.recv().await {
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        });

        let session = Arc::new(SocketSession {
            binding: self.clone(),
            dispatcher,
            peer: OnceLock::new(),
            exported: Mutex::new(HashMap::new()),
        });
        let peer = RemotePeer::start(outbound, self.call_timeout, session.clone());
        let _ = session.peer.set(Arc::downgrade(&peer));
        tracing::debug!("remote client bound");

        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => peer.handle_incoming(&text),
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "remote socket failed");
                    break;
                }
            }
        }

        peer.close();
        session.release_all().await;
        writer.abort();
        tracing::debug!("remote client gone");
    }

    async fn track(&self, proxy: Arc<RemoteListener>) -> u64 {
        let key = self.next_proxy.fetch_add(1, Ordering::Relaxed);
        self.proxies.write().await.insert(key, proxy);
        key
    }

    async fn untrack(&self, key: u64) {
        self.proxies.write().await.remove(&key);
    }
}

async fn upgrade(
    Path(name): Path<String>,
    State(binding): State<Arc<RemoteBinding>>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let Some(dispatcher) = binding.registry.lookup(&name).await else {
        return (StatusCode::NOT_FOUND, format!("no endpoint bound as '{}'", name)).into_response();
    };
    let Some(ws) = ws else {
        return (StatusCode::UPGRADE_REQUIRED, "websocket upgrade expected").into_response();
    };
    ws.on_upgrade(move |socket| binding.handle_socket(socket, dispatcher))
}

#[async_trait]
impl KeepAlive for RemoteBinding {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn send_heartbeats(&self) {
        let proxies: Vec<_> = self
            .proxies
            .read()
            .await
            .iter()
            .map(|(key, proxy)| (*key, proxy.clone()))
            .collect();
        let rounds = proxies.into_iter().map(|(key, proxy)| async move {
            if let Err(e) = proxy.heartbeat().await {
                tracing::debug!(identity = %proxy.identity(), error = %e, "heartbeat not delivered");
            }
            let alive = proxy.check_pulse().await;
            (key, proxy, alive)
        });
        for (key, proxy, alive) in futures::future::join_all(rounds).await {
            if !alive {
                // Reported once; the socket may linger until it fails.
                self.untrack(key).await;
                let dead: Arc<dyn Listener> = proxy;
                let _ = self.dead.send(dead);
            }
        }
    }
}

/// Serves the calls of one connected client.
struct SocketSession {
    binding: Arc<RemoteBinding>,
    dispatcher: Arc<dyn Dispatcher>,
    peer: OnceLock<Weak<RemotePeer>>,
    /// Client handle to (tracking key, proxy).
    exported: Mutex<HashMap<u64, (u64, Arc<RemoteListener>)>>,
}

impl SocketSession {
    async fn identity_of(&self, handle: u64) -> Option<Identity> {
        self.exported
            .lock()
            .await
            .get(&handle)
            .map(|(_, proxy)| proxy.identity().clone())
    }

    async fn register(&self, handle: u64) -> Result<(), String> {
        if self.exported.lock().await.contains_key(&handle) {
            return Err(format!("handle {} already registered", handle));
        }
        let peer = self
            .peer
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| "connection closing".to_string())?;
        let proxy = Arc::new(
            RemoteListener::connect(peer, handle)
                .await
                .map_err(|e| e.to_string())?,
        );

        let key = self.binding.track(proxy.clone()).await;
        self.exported
            .lock()
            .await
            .insert(handle, (key, proxy.clone()));
        tracing::info!(identity = %proxy.identity(), handle, "remote listener registered");

        let listener: Arc<dyn Listener> = proxy;
        if let Err(e) = self.dispatcher.register_new_listener(listener).await {
            self.exported.lock().await.remove(&handle);
            self.binding.untrack(key).await;
            return Err(e.to_string());
        }
        Ok(())
    }

    async fn remove(&self, handle: u64) {
        let Some((key, proxy)) = self.exported.lock().await.remove(&handle) else {
            return;
        };
        self.binding.untrack(key).await;
        let listener: Arc<dyn Listener> = proxy;
        if let Err(e) = self.dispatcher.remove_listener(&listener).await {
            tracing::warn!(identity = %listener.identity(), error = %e, "failed to remove listener");
        }
    }

    async fn release_all(&self) {
        let handles: Vec<u64> = self.exported.lock().await.keys().copied().collect();
        for handle in handles {
            self.remove(handle).await;
        }
    }
}

#[async_trait]
impl CallHandler for SocketSession {
    async fn handle(&self, call: RemoteCall) -> Result<ReplyValue, String> {
        match call {
            RemoteCall::Execute { handle, mut action } => {
                let identity = self
                    .identity_of(handle)
                    .await
                    .ok_or_else(|| format!("unknown listener handle {}", handle))?;
                action.bind_identity(&identity);
                self.dispatcher
                    .execute(action)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(ReplyValue::Unit)
            }
            RemoteCall::RegisterListener { handle } => {
                self.register(handle).await?;
                Ok(ReplyValue::Unit)
            }
            RemoteCall::RemoveListener { handle } => {
                self.remove(handle).await;
                Ok(ReplyValue::Unit)
            }
            other => Err(format!("{} is not served by the dispatcher", other.method())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::liveness::dead_listener_channel;
    use crate::application::{ServerDispatcher, SessionRegistry};
    use crate::config::MatchmakingConfig;
    use crate::domain::game::StandardGameFactory;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn binding() -> Arc<RemoteBinding> {
        let (dead, _feed) = dead_listener_channel();
        let dispatcher = ServerDispatcher::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(StandardGameFactory::default()),
            MatchmakingConfig::default(),
            dead.clone(),
        );
        let registry = Arc::new(EndpointRegistry::new());
        registry.bind("dispatcher", Arc::new(dispatcher)).await;
        Arc::new(RemoteBinding::new(registry, Duration::from_secs(1), dead))
    }

    #[tokio::test]
    async fn unknown_endpoint_is_not_found() {
        let binding = binding().await;
        let response = binding
            .router()
            .oneshot(Request::get("/registry/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn plain_http_on_a_bound_endpoint_needs_upgrade() {
        let binding = binding().await;
        let response = binding
            .router()
            .oneshot(Request::get("/registry/dispatcher").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
    }
}
