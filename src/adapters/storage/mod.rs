//! Storage Adapters
//!
//! Implementations of the SessionStore port for crash recovery.
//!
//! ## Available Adapters
//!
//! - **FileSessionStore** - Stores every live game in one YAML file
//! - **InMemorySessionStore** - Keeps the snapshot in memory (testing/development)

mod file_session_store;
mod in_memory_session_store;

pub use file_session_store::FileSessionStore;
pub use in_memory_session_store::InMemorySessionStore;
