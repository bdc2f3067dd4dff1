//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the session core to external systems:
//! - `tcp` - Socket-stream binding with length-prefixed JSON packets
//! - `remote` - Remote-invocation binding over WebSocket
//! - `storage` - Session store implementations (file, in-memory)

pub mod remote;
pub mod storage;
pub mod tcp;
