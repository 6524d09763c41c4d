//! Bounded chat context for the health assistant.
//!
//! Only the newest few messages are kept and replayed to the assistant with
//! each request; older ones are dropped as new ones arrive.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Two user/assistant pairs.
pub const DEFAULT_HISTORY_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Fixed-capacity ring buffer of chat messages, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistory {
    capacity: usize,
    messages: VecDeque<ChatMessage>,
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ChatHistory {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Appends `message`, evicting the oldest entry when full.
    pub fn push(&mut self, message: ChatMessage) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// System prompt, then the retained history, then the new user message.
    pub fn request_context(&self, system_prompt: &str, user_message: &str) -> Vec<ChatMessage> {
        let mut context = Vec::with_capacity(self.messages.len() + 2);
        context.push(ChatMessage::system(system_prompt));
        context.extend(self.messages.iter().cloned());
        context.push(ChatMessage::user(user_message));
        context
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.messages)
    }

    /// Restores a persisted history, keeping only the newest `capacity`
    /// entries. Unreadable input yields an empty history.
    pub fn from_json(capacity: usize, raw: &str) -> Self {
        let mut history = Self::new(capacity);
        let stored: Vec<ChatMessage> = serde_json::from_str(raw).unwrap_or_default();
        for message in stored {
            history.push(message);
        }
        history
    }
}
