//! Action module.
//!
//! An [`Action`] is both the command and the replication message: it is
//! applied once against the authoritative model and the resulting value is
//! reflected into every observer's [`ClientState`](crate::domain::client_state::ClientState).

mod apply;
mod kinds;
mod reflect;

pub use apply::ActionTarget;
pub use kinds::{Action, ActionKind, PlayerAction, ServerAction};
pub use reflect::ReflectError;
