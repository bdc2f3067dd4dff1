//! Ports - Interfaces between the session core and the outside world.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application layer and its transports and storage. Adapters
//! implement these ports.
//!
//! ## Session Ports
//!
//! - `Dispatcher` - Submit actions, register and remove listeners
//! - `Listener` - One connected player endpoint
//! - `KeepAlive` - Heartbeat push for a transport binding
//!
//! ## Client Ports
//!
//! - `SessionConnection` - A client's transport-agnostic server handle
//!
//! ## Storage Ports
//!
//! - `SessionStore` - Snapshot persistence for crash recovery

mod dispatcher;
mod keep_alive;
mod listener;
mod session_connection;
mod session_store;

pub use dispatcher::{DispatchError, Dispatcher};
pub use keep_alive::KeepAlive;
pub use listener::{Listener, ListenerError};
pub use session_connection::{ConnectionError, SessionConnection};
pub use session_store::{SessionStore, SessionStoreError};
