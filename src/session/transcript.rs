//! In-memory conversation transcript.

use crate::llm::{Message, MessageRole};

/// Ordered user/assistant messages of the running session.
///
/// Owned by the session loop and never persisted as a whole; only
/// individual exchanges reach the conversation store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user message to the conversation.
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Add an assistant message to the conversation.
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Remove the last two messages (the latest user/assistant pair).
    ///
    /// Returns `false` and leaves the transcript untouched when fewer than
    /// two messages exist.
    pub fn forget_last_exchange(&mut self) -> bool {
        if self.messages.len() < 2 {
            return false;
        }
        self.messages.truncate(self.messages.len() - 2);
        true
    }

    /// Deep copy handed to the inference worker.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Get all messages in the conversation.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Content of the most recent message with the given role.
    pub fn last_of(&self, role: MessageRole) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
