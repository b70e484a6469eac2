//! Model service clients.
//!
//! This module provides the two black-box collaborators of the assistant:
//! an embedding service that turns text into a fixed-length vector, and a
//! chat service that produces the next assistant message for a transcript.
//!
//! # Overview
//!
//! The [`EmbeddingClient`] and [`ChatClient`] traits are the seams the rest of
//! the crate depends on. HTTP implementations speak either the Ollama API or
//! an `OpenAI`-compatible API, selected through [`Provider`].
//!
//! # Clients
//!
//! - [`ChatCompletionsClient`]: chat replies (`/api/chat` or `/v1/chat/completions`)
//! - [`EmbeddingsClient`]: embeddings (`/api/embeddings` or `/v1/embeddings`)
//!
//! # Example
//!
//! ```rust,ignore
//! use memory_assistant::llm::{LlmSettings, Provider};
//!
//! let settings = LlmSettings {
//!     base_url: "http://localhost:11434".to_string(),
//!     api_key: None,
//!     chat_model: "phi3".to_string(),
//!     embedding_model: "nomic-embed-text".to_string(),
//!     provider: Provider::Ollama,
//!     request_timeout: None,
//! };
//! ```

pub mod chat_completions;
pub mod embeddings;
pub mod provider;

pub use chat_completions::ChatCompletionsClient;
pub use embeddings::EmbeddingsClient;
pub use provider::Provider;

use std::time::Duration;

use crate::error::Result;

/// Model service connection settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL of the model service (e.g., `http://localhost:11434`).
    pub base_url: String,
    /// Optional API key for bearer authentication.
    pub api_key: Option<String>,
    /// Model used for chat replies (e.g., `phi3`).
    pub chat_model: String,
    /// Model used for embeddings (e.g., `nomic-embed-text`).
    pub embedding_model: String,
    /// Wire dialect of the service.
    pub provider: Provider,
    /// Optional per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Role of the message author.
    pub role: MessageRole,
    /// Text content of the message.
    pub content: String,
}

impl Message {
    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Converts text into a fixed-dimensionality vector.
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync + std::fmt::Debug {
    /// Embed a single piece of text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Embedding`] when the service is unreachable
    /// or replies with something that is not a non-empty vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Produces the next assistant message for a transcript.
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync + std::fmt::Debug {
    /// Send the ordered transcript and return the assistant reply.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Inference`] on transport errors, non-success
    /// status codes, timeouts or malformed replies.
    async fn chat(&self, transcript: &[Message]) -> Result<String>;
}

/// Build the shared HTTP client, honoring the configured timeout.
pub(crate) fn build_http_client(settings: &LlmSettings) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = settings.request_timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

/// Short label for a reqwest failure, used as a log field.
pub(crate) fn error_kind(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_decode() {
        "decode"
    } else if err.is_status() {
        "status"
    } else {
        "request"
    }
}
