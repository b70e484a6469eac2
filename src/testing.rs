//! Deterministic stand-ins for the model services.
//!
//! Used by unit and integration tests; none of them touch the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::llm::{ChatClient, EmbeddingClient, Message, MessageRole};

/// Embedder that hashes characters into buckets, with per-text overrides.
#[derive(Debug)]
pub struct StubEmbedder {
    dimension: usize,
    overrides: HashMap<String, Vec<f32>>,
    failing: bool,
    calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            overrides: HashMap::new(),
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// An embedder whose every call fails.
    pub fn failing(dimension: usize) -> Self {
        Self {
            failing: true,
            ..Self::new(dimension)
        }
    }

    /// Return `vector` whenever `text` is embedded.
    #[must_use]
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.overrides.insert(text.into(), vector);
        self
    }

    /// Number of `embed` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingClient for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(Error::Embedding(
                "embedding service unreachable".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(Error::Embedding("cannot embed empty text".to_string()));
        }
        if let Some(v) = self.overrides.get(text) {
            return Ok(v.clone());
        }
        let mut v = vec![0.0; self.dimension];
        for (i, b) in text.bytes().enumerate() {
            v[(usize::from(b) + i) % self.dimension] += 1.0;
        }
        Ok(v)
    }
}

/// Chat client that echoes the last user message.
///
/// Records every transcript it receives and the peak number of concurrent
/// calls, and can be told to fail, panic or stall on marked input.
#[derive(Debug, Default)]
pub struct ScriptedChat {
    fail_marker: Option<String>,
    panic_marker: Option<String>,
    delay: Option<Duration>,
    running: AtomicUsize,
    max_running: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with an inference error when the last message contains `marker`.
    #[must_use]
    pub fn fail_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Panic when the last message contains `marker`.
    #[must_use]
    pub fn panic_on(mut self, marker: impl Into<String>) -> Self {
        self.panic_marker = Some(marker.into());
        self
    }

    /// Sleep this long inside every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Transcripts received so far, in call order.
    pub fn transcripts(&self) -> Vec<Vec<Message>> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// Reply text produced for a given user message.
    pub fn reply_for(content: &str) -> String {
        format!("echo: {content}")
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn chat(&self, transcript: &[Message]) -> Result<String> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transcript.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let last = transcript
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        self.running.fetch_sub(1, Ordering::SeqCst);

        if let Some(marker) = &self.panic_marker {
            assert!(!last.contains(marker.as_str()), "chat client blew up");
        }
        if let Some(marker) = &self.fail_marker {
            if last.contains(marker.as_str()) {
                return Err(Error::Inference("model service returned 500".to_string()));
            }
        }
        Ok(Self::reply_for(&last))
    }
}
