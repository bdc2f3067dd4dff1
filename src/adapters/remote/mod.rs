//! Remote-invocation binding over WebSocket.
//!
//! Both ends speak the same message set: calls carrying an id, and replies
//! echoing it. The server publishes dispatchers by name; clients export
//! listeners by handle and receive callbacks on the same socket.
//!
//! - `protocol` - Calls, replies and their JSON shape
//! - `peer` - Outgoing calls with timeouts, in-order serving of incoming ones
//! - `registry` - Named dispatcher endpoints
//! - `listener` - Server-side proxy for an exported client listener
//! - `server` - The axum binding and its keep-alive
//! - `client` - Client end of the binding

mod client;
mod listener;
mod peer;
mod protocol;
mod registry;
mod server;

pub use client::{RemoteClient, RemoteClientConfig};
pub use listener::RemoteListener;
pub use peer::{CallHandler, RemoteError, RemotePeer};
pub use protocol::{RemoteCall, RemoteMessage, ReplyValue};
pub use registry::EndpointRegistry;
pub use server::RemoteBinding;
