//! UI-agnostic application state types
//!
//! This module contains the conversation store and the pending attachment
//! state. Nothing here depends on a UI framework or on the network.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub role: ChatRole,
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Role name in the Gemini API vocabulary
    pub fn api_name(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "model",
        }
    }
}

/// Append-only, insertion-ordered list of messages for one session.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    last_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return the updated sequence.
    pub fn append_message(&mut self, role: ChatRole, content: impl Into<String>) -> &[ChatMessage] {
        let id = self.next_id();
        self.messages.push(ChatMessage {
            id,
            role,
            content: content.into(),
        });
        &self.messages
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    // Wall-clock milliseconds, bumped past the previous id when the clock
    // hasn't moved (or went backwards).
    fn next_id(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }
}

/// Transient PDF attachment waiting for the next send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: Option<String>,
    pub extracted_text: Option<String>,
}

impl Attachment {
    pub fn is_empty(&self) -> bool {
        self.file_name.is_none() && self.extracted_text.is_none()
    }

    pub fn clear(&mut self) {
        self.file_name = None;
        self.extracted_text = None;
    }
}
