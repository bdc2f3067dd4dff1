//! Keep-alive port - a binding that can push heartbeats to its peers.

use async_trait::async_trait;

#[async_trait]
pub trait KeepAlive: Send + Sync {
    /// Binding name for logs.
    fn name(&self) -> &'static str;

    /// Sends one heartbeat to every open peer of this binding.
    async fn send_heartbeats(&self);
}
