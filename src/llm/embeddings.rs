//! Embedding service client.

use tracing::{debug, error};

use crate::error::{Error, Result};

use super::{EmbeddingClient, LlmSettings, build_http_client, error_kind};

/// Client for the embedding endpoint of the configured provider.
#[derive(Clone)]
pub struct EmbeddingsClient {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for EmbeddingsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingsClient")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.embedding_model)
            .field("provider", &self.settings.provider)
            .finish()
    }
}

impl EmbeddingsClient {
    /// Create a new embedding client with the given settings.
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let http = build_http_client(&settings)
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, settings })
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for EmbeddingsClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::Embedding("cannot embed empty text".to_string()));
        }

        let provider = self.settings.provider;
        let url = provider.build_embeddings_url(&self.settings.base_url);
        let body = provider.embeddings_body(&self.settings.embedding_model, text);

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }

        let resp = rb.send().await.map_err(|e| {
            error!(
                name: "llm.embed.failed",
                model = %self.settings.embedding_model,
                error = %e,
                error_kind = error_kind(&e),
                "Embedding request failed"
            );
            Error::Embedding(format!("{} error: {e}", error_kind(&e)))
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!("status {status}: {text}")));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("malformed reply: {e}")))?;

        let vector = provider
            .parse_embedding(&json)
            .ok_or_else(|| Error::Embedding("reply has no usable embedding".to_string()))?;

        debug!(
            name: "llm.embed.done",
            model = %self.settings.embedding_model,
            dimensions = vector.len(),
            "Embedding generated"
        );

        Ok(vector)
    }
}
