//! TCP socket-stream binding.
//!
//! - `codec` - Length-prefixed JSON packets
//! - `server` - Accept loop and per-connection tasks
//! - `listener` - Server-side stand-in for one client
//! - `client` - Client end of the binding

mod client;
mod codec;
mod listener;
mod server;

pub use client::{TcpClient, TcpClientConfig};
pub use codec::{Packet, PacketCodec, ProtocolError};
pub use listener::TcpRemoteListener;
pub use server::{TcpBinding, TcpBindingConfig};
