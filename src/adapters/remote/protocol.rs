//! Messages exchanged by two remote peers.
//!
//! Both sides of a connection can call the other: the client invokes the
//! published dispatcher, the server invokes the client's listener. Every
//! call carries an id that its reply echoes.

use serde::{Deserialize, Serialize};

use crate::domain::action::Action;
use crate::domain::foundation::Identity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteMessage {
    Call {
        id: u64,
        call: RemoteCall,
    },
    Reply {
        id: u64,
        result: Result<ReplyValue, String>,
    },
}

/// Remote operations. `handle` names a listener the client exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RemoteCall {
    // Dispatcher side
    Execute { handle: u64, action: Action },
    RegisterListener { handle: u64 },
    RemoveListener { handle: u64 },

    // Listener side
    Notify { handle: u64, action: Action },
    Heartbeat { handle: u64 },
    CheckPulse { handle: u64 },
    GetIdentity { handle: u64 },
}

impl RemoteCall {
    pub fn method(&self) -> &'static str {
        match self {
            RemoteCall::Execute { .. } => "execute",
            RemoteCall::RegisterListener { .. } => "register_listener",
            RemoteCall::RemoveListener { .. } => "remove_listener",
            RemoteCall::Notify { .. } => "notify",
            RemoteCall::Heartbeat { .. } => "heartbeat",
            RemoteCall::CheckPulse { .. } => "check_pulse",
            RemoteCall::GetIdentity { .. } => "get_identity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ReplyValue {
    Unit,
    Bool(bool),
    Identity(Identity),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_wire_shape() {
        let message = RemoteMessage::Call {
            id: 7,
            call: RemoteCall::CheckPulse { handle: 1 },
        };
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["kind"], "call");
        assert_eq!(json["call"]["method"], "check_pulse");
        assert_eq!(json["call"]["handle"], 1);
    }

    #[test]
    fn failed_reply_carries_message() {
        let message = RemoteMessage::Reply {
            id: 3,
            result: Err("unknown listener handle".into()),
        };
        let text = serde_json::to_string(&message).unwrap();
        let back: RemoteMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(back, message);
    }
}
