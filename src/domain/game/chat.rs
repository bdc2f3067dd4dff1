//! In-game chat log.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, Identity};

/// Messages kept per game; older ones are dropped first.
pub const CHAT_HISTORY: usize = 100;

/// Longest accepted message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Position in the game's chat, counted from the first message ever sent.
    pub seq: u64,
    pub sender: Identity,
    pub nickname: String,
    pub text: String,
}

/// Bounded, ordered chat history.
///
/// Sequence numbers are assigned by the log itself, so a replica replaying
/// the same messages ends up with an identical log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLog {
    next_seq: u64,
    messages: VecDeque<ChatMessage>,
}

impl ChatLog {
    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The last `n` messages, oldest first.
    pub fn last(&self, n: usize) -> Vec<&ChatMessage> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).collect()
    }

    /// Appends a message after checking its text.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for a blank message or one over
    ///   [`MAX_MESSAGE_CHARS`]
    pub fn post(&mut self, sender: &Identity, nickname: &str, text: &str) -> Result<(), DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::new(ErrorCode::ValidationFailed, "Message is empty"));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Message is longer than {} characters", MAX_MESSAGE_CHARS),
            ));
        }

        self.messages.push_back(ChatMessage {
            seq: self.next_seq,
            sender: sender.clone(),
            nickname: nickname.to_string(),
            text: text.to_string(),
        });
        self.next_seq += 1;
        while self.messages.len() > CHAT_HISTORY {
            self.messages.pop_front();
        }
        Ok(())
    }
}
