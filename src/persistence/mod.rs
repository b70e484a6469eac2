//! Conversation store.
//!
//! Exchanges (prompt, response, embedding) are written once and never
//! updated or deleted. The store never computes embeddings: callers hand it
//! opaque fixed-length vectors and it only stores and compares them.
//!
//! - [`providers::postgres::PostgresStore`]: Postgres + pgvector
//! - [`providers::memory::InMemoryStore`]: process-local, same contract

use crate::error::Result;
use async_trait::async_trait;

pub mod providers;

/// A stored prompt/response pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub prompt: String,
    pub response: String,
    pub embedding: Vec<f32>,
}

/// One entry of a similarity search, closest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeMatch {
    pub prompt: String,
    pub response: String,
    /// Euclidean distance to the query vector (lower = more similar).
    pub distance: f32,
}

/// Ordered search result, ascending distance, at most `limit` long.
pub type SimilarityResult = Vec<ExchangeMatch>;

#[async_trait]
pub trait ConversationStore: Send + Sync + std::fmt::Debug {
    /// Insert one exchange.
    ///
    /// Fails with a persistence error on connection or constraint errors,
    /// including an embedding whose length differs from the store's.
    async fn store(&self, prompt: &str, response: &str, embedding: &[f32]) -> Result<()>;

    /// Return the `limit` exchanges nearest to `query_vec`.
    ///
    /// Equal distances keep insertion order. An empty store yields an empty
    /// result.
    async fn search(&self, query_vec: &[f32], limit: usize) -> Result<SimilarityResult>;

    /// Number of stored exchanges.
    async fn count(&self) -> Result<u64>;
}

/// Euclidean distance, the metric behind pgvector's `<->` operator.
pub(crate) fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_distance() {
        let d = l2_distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 5.0).abs() < f32::EPSILON);

        let d = l2_distance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!(d.abs() < f32::EPSILON);
    }
}
