//! Retrieval context construction.
//!
//! Turns a query into a prompt that carries the most similar past exchanges.
//! Retrieval never aborts a turn: embedding and store failures are logged and
//! the query goes out with an empty context block.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::EmbeddingClient;
use crate::persistence::{ConversationStore, ExchangeMatch};

/// Number of past exchanges retrieved per query.
pub const DEFAULT_CONTEXT_LIMIT: usize = 5;

/// Builds context-augmented prompts from the conversation store.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn ConversationStore>,
    limit: usize,
}

impl ContextBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingClient>, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            embedder,
            store,
            limit: DEFAULT_CONTEXT_LIMIT,
        }
    }

    /// Override the number of retrieved exchanges.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Retrieve the exchanges most similar to `query`.
    ///
    /// Empty on any embedding or persistence failure.
    pub async fn retrieve(&self, query: &str) -> Vec<ExchangeMatch> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let embedding = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!(name: "context.embed.failed", error = %e, "No context available");
                return Vec::new();
            }
        };

        match self.store.search(&embedding, self.limit).await {
            Ok(matches) => {
                debug!(name: "context.retrieved", count = matches.len(), "Context retrieved");
                matches
            }
            Err(e) => {
                warn!(name: "context.search.failed", error = %e, "No context available");
                Vec::new()
            }
        }
    }

    /// Build the context-augmented prompt for `query`.
    pub async fn build_context(&self, query: &str) -> String {
        let matches = self.retrieve(query).await;
        render_context(&matches, query)
    }
}

/// Render retrieved exchanges and the query into a single prompt.
///
/// ```text
/// Context:
/// Q: {prompt}
/// A: {response}
///
/// User Query: {query}
/// ```
pub fn render_context(matches: &[ExchangeMatch], query: &str) -> String {
    let rendered = matches
        .iter()
        .map(|m| format!("Q: {}\nA: {}", m.prompt, m.response))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Context:\n{rendered}\n\nUser Query: {query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::providers::memory::InMemoryStore;
    use crate::testing::StubEmbedder;

    fn exchange(prompt: &str, response: &str) -> ExchangeMatch {
        ExchangeMatch {
            prompt: prompt.to_string(),
            response: response.to_string(),
            distance: 0.0,
        }
    }

    #[test]
    fn test_render_context_format() {
        let rendered = render_context(
            &[
                exchange("What is Rust?", "A language."),
                exchange("Hi", "Hello"),
            ],
            "Tell me more",
        );
        assert_eq!(
            rendered,
            "Context:\nQ: What is Rust?\nA: A language.\nQ: Hi\nA: Hello\n\nUser Query: Tell me more"
        );
    }

    #[test]
    fn test_render_context_empty() {
        assert_eq!(render_context(&[], "q"), "Context:\n\n\nUser Query: q");
    }

    #[tokio::test]
    async fn test_build_context_uses_similarity_order() {
        let embedder = Arc::new(StubEmbedder::new(2).with_vector("where", vec![0.0, 0.0]));
        let store = Arc::new(InMemoryStore::new(2));
        store.store("far", "3", &[0.9, 0.0]).await.unwrap();
        store.store("near", "1", &[0.1, 0.0]).await.unwrap();
        store.store("middle", "2", &[0.5, 0.0]).await.unwrap();

        let builder = ContextBuilder::new(embedder, store).with_limit(2);
        let context = builder.build_context("where").await;
        assert_eq!(
            context,
            "Context:\nQ: near\nA: 1\nQ: middle\nA: 2\n\nUser Query: where"
        );
    }

    #[tokio::test]
    async fn test_default_limit_is_five() {
        let embedder = Arc::new(StubEmbedder::new(1));
        let store = Arc::new(InMemoryStore::new(1));
        for i in 0..8u8 {
            store
                .store(&format!("p{i}"), "r", &[f32::from(i)])
                .await
                .unwrap();
        }
        let builder = ContextBuilder::new(embedder, store);
        assert_eq!(
            builder.retrieve("anything").await.len(),
            DEFAULT_CONTEXT_LIMIT
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_empty_context() {
        let embedder = Arc::new(StubEmbedder::failing(2));
        let store = Arc::new(InMemoryStore::new(2));
        store.store("p", "r", &[0.0, 0.0]).await.unwrap();

        let builder = ContextBuilder::new(embedder, store);
        let context = builder.build_context("hello").await;
        assert_eq!(context, "Context:\n\n\nUser Query: hello");
    }

    #[tokio::test]
    async fn test_search_failure_degrades_to_empty_context() {
        // 3-dimensional queries against a 2-dimensional store fail the search
        let embedder = Arc::new(StubEmbedder::new(3));
        let store = Arc::new(InMemoryStore::new(2));
        store.store("p", "r", &[0.0, 0.0]).await.unwrap();

        let builder = ContextBuilder::new(embedder, store);
        assert!(builder.retrieve("hello").await.is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_skips_embedding() {
        let embedder = Arc::new(StubEmbedder::new(2));
        let store = Arc::new(InMemoryStore::new(2));
        let builder = ContextBuilder::new(embedder.clone(), store);

        assert_eq!(
            builder.build_context("").await,
            "Context:\n\n\nUser Query: "
        );
        assert_eq!(embedder.calls(), 0);
    }
}
