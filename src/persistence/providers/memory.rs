use crate::error::{Error, Result};
use crate::persistence::{
    ConversationStore, Exchange, ExchangeMatch, SimilarityResult, l2_distance,
};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Process-local conversation store.
///
/// Same contract as the Postgres store: fixed dimensionality, L2 distance,
/// ties resolved by insertion order. Contents are lost when the process exits.
#[derive(Debug)]
pub struct InMemoryStore {
    dimension: usize,
    exchanges: RwLock<Vec<Exchange>>,
}

impl InMemoryStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            exchanges: RwLock::new(Vec::new()),
        }
    }

    /// Copy of every stored exchange, oldest first.
    pub async fn exchanges(&self) -> Vec<Exchange> {
        self.exchanges.read().await.clone()
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            })
        }
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn store(&self, prompt: &str, response: &str, embedding: &[f32]) -> Result<()> {
        self.check_dimension(embedding)?;
        self.exchanges.write().await.push(Exchange {
            prompt: prompt.to_string(),
            response: response.to_string(),
            embedding: embedding.to_vec(),
        });
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], limit: usize) -> Result<SimilarityResult> {
        self.check_dimension(query_vec)?;
        let guard = self.exchanges.read().await;

        let mut matches: Vec<ExchangeMatch> = guard
            .iter()
            .map(|e| ExchangeMatch {
                prompt: e.prompt.clone(),
                response: e.response.clone(),
                distance: l2_distance(query_vec, &e.embedding),
            })
            .collect();
        drop(guard);

        // Stable sort keeps insertion order for equal distances
        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.exchanges.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_empty_store() {
        let store = InMemoryStore::new(3);
        let results = store.search(&[0.0, 0.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_store_then_search_round_trip() {
        let store = InMemoryStore::new(3);
        store
            .store("unrelated", "a", &[9.0, 9.0, 9.0])
            .await
            .unwrap();
        store
            .store("favourite colour?", "blue", &[1.0, 0.0, 0.0])
            .await
            .unwrap();
        store.store("other", "b", &[-5.0, 2.0, 7.0]).await.unwrap();

        let results = store.search(&[0.99, 0.01, 0.0], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].prompt, "favourite colour?");
        assert_eq!(results[0].response, "blue");
    }

    #[tokio::test]
    async fn test_search_orders_by_distance_and_limits() {
        let store = InMemoryStore::new(2);
        // Distances from the origin: 0.9, 0.1, 0.5
        store.store("far", "r3", &[0.9, 0.0]).await.unwrap();
        store.store("near", "r1", &[0.1, 0.0]).await.unwrap();
        store.store("middle", "r2", &[0.0, 0.5]).await.unwrap();

        let results = store.search(&[0.0, 0.0], 2).await.unwrap();
        let prompts: Vec<&str> = results.iter().map(|m| m.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["near", "middle"]);
        assert!((results[0].distance - 0.1).abs() < 1e-6);
        assert!((results[1].distance - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_equal_distances_keep_insertion_order() {
        let store = InMemoryStore::new(2);
        store.store("first", "a", &[1.0, 0.0]).await.unwrap();
        store.store("second", "b", &[0.0, 1.0]).await.unwrap();
        store.store("third", "c", &[-1.0, 0.0]).await.unwrap();

        let results = store.search(&[0.0, 0.0], 3).await.unwrap();
        let prompts: Vec<&str> = results.iter().map(|m| m.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let store = InMemoryStore::new(3);
        let err = store.store("p", "r", &[1.0, 2.0]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_limit_zero_returns_nothing() {
        let store = InMemoryStore::new(1);
        store.store("p", "r", &[1.0]).await.unwrap();
        assert!(store.search(&[1.0], 0).await.unwrap().is_empty());
    }
}
