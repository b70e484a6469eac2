//! Provider-specific wire formats and detection.
//!
//! This module handles differences between model service dialects: URL
//! layout, request bodies, and where the reply lives in the response JSON.

use serde_json::{Value, json};

use super::Message;

/// Supported model service dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Ollama (local, default port 11434).
    Ollama,
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Any other OpenAI-compatible service
    Generic,
}

impl Provider {
    /// Detect provider from base URL.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let provider = Provider::detect_from_url("http://localhost:11434");
    /// assert_eq!(provider, Provider::Ollama);
    /// ```
    #[must_use]
    pub fn detect_from_url(base_url: &str) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains(":11434") || lower.contains("ollama") {
            Self::Ollama
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Parse an explicit provider name; `auto` (or anything unknown) detects from the URL.
    #[must_use]
    pub fn from_name(name: &str, base_url: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "ollama" => Self::Ollama,
            "openai" => Self::OpenAI,
            "generic" => Self::Generic,
            _ => Self::detect_from_url(base_url),
        }
    }

    /// Build the chat URL for this provider.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL (trailing slash tolerated)
    #[must_use]
    pub fn build_chat_url(self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::Ollama => format!("{base}/api/chat"),
            Self::OpenAI | Self::Generic => format!("{base}/v1/chat/completions"),
        }
    }

    /// Build the embeddings URL for this provider.
    #[must_use]
    pub fn build_embeddings_url(self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::Ollama => format!("{base}/api/embeddings"),
            Self::OpenAI | Self::Generic => format!("{base}/v1/embeddings"),
        }
    }

    /// Request body for a non-streaming chat call.
    #[must_use]
    pub fn chat_body(self, model: &str, messages: &[Message]) -> Value {
        json!({
            "model": model,
            "stream": false,
            "messages": messages,
        })
    }

    /// Request body for a single-text embedding call.
    #[must_use]
    pub fn embeddings_body(self, model: &str, text: &str) -> Value {
        match self {
            Self::Ollama => json!({ "model": model, "prompt": text }),
            _ => json!({ "model": model, "input": text }),
        }
    }

    /// Extract the assistant text from a chat response.
    #[must_use]
    pub fn parse_chat_reply(self, body: &Value) -> Option<String> {
        let message = match self {
            Self::Ollama => &body["message"],
            _ => &body["choices"][0]["message"],
        };
        message
            .get("content")
            .and_then(Value::as_str)
            .map(ToString::to_string)
    }

    /// Extract the vector from an embedding response.
    ///
    /// Returns `None` when the field is missing, empty or holds non-numbers.
    #[must_use]
    pub fn parse_embedding(self, body: &Value) -> Option<Vec<f32>> {
        let raw = match self {
            Self::Ollama => &body["embedding"],
            _ => &body["data"][0]["embedding"],
        };
        let values = raw.as_array()?;
        if values.is_empty() {
            return None;
        }
        values
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect()
    }
}
