//! Chat service client.
//!
//! This module implements [`ChatClient`] over HTTP for both the Ollama chat
//! API (`/api/chat`) and `OpenAI`-compatible chat completions
//! (`/v1/chat/completions`). Replies are requested non-streaming; the
//! assistant only ever needs the final text.

use tracing::{debug, error};

use crate::error::{Error, Result};

use super::{ChatClient, LlmSettings, Message, build_http_client, error_kind};

/// Client for the chat endpoint of the configured provider.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.chat_model)
            .field("provider", &self.settings.provider)
            .finish()
    }
}

impl ChatCompletionsClient {
    /// Create a new chat client with the given settings.
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let http = build_http_client(&settings)
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, settings })
    }
}

#[async_trait::async_trait]
impl ChatClient for ChatCompletionsClient {
    async fn chat(&self, transcript: &[Message]) -> Result<String> {
        if transcript.is_empty() {
            return Err(Error::Inference("transcript is empty".to_string()));
        }

        let provider = self.settings.provider;
        let url = provider.build_chat_url(&self.settings.base_url);
        let body = provider.chat_body(&self.settings.chat_model, transcript);

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }

        debug!(
            name: "llm.chat.request",
            model = %self.settings.chat_model,
            messages = transcript.len(),
            "Sending chat request"
        );

        let resp = rb.send().await.map_err(|e| {
            error!(
                name: "llm.chat.failed",
                model = %self.settings.chat_model,
                error = %e,
                error_kind = error_kind(&e),
                "Chat request failed"
            );
            Error::Inference(format!("{} error: {e}", error_kind(&e)))
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(
                name: "llm.chat.status",
                model = %self.settings.chat_model,
                status = %status,
                body = %text,
                "Chat service returned error status"
            );
            return Err(Error::Inference(format!("status {status}: {text}")));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Inference(format!("malformed reply: {e}")))?;

        provider
            .parse_chat_reply(&json)
            .ok_or_else(|| Error::Inference("reply has no message content".to_string()))
    }
}
