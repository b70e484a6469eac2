use crate::error::{Error, Result};
use crate::persistence::{ConversationStore, ExchangeMatch, SimilarityResult};
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

/// Conversation store backed by Postgres with the pgvector extension.
///
/// Every operation checks a connection out of the pool and returns it when
/// the query completes; no state is kept across calls.
#[derive(Debug)]
pub struct PostgresStore {
    pool: PgPool,
    dimension: usize,
}

impl PostgresStore {
    /// Connect, run migrations and verify that stored vectors match `dimension`.
    pub async fn connect(
        connection_string: &str,
        dimension: usize,
        max_connections: u32,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await?;

        // Run Migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        let store = Self { pool, dimension };
        store.verify_dimension().await?;

        info!(
            name: "store.postgres.connected",
            dimension,
            max_connections,
            "Conversation store ready"
        );
        Ok(store)
    }

    /// Existing rows must share the configured dimensionality.
    async fn verify_dimension(&self) -> Result<()> {
        let row = sqlx::query(
            "SELECT vector_dims(embedding) AS dims FROM conversations ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            let dims: i32 = row.try_get("dims")?;
            let actual = usize::try_from(dims).unwrap_or_default();
            if actual != self.dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.dimension,
                    actual,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for PostgresStore {
    async fn store(&self, prompt: &str, response: &str, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        let embedding_vector = Vector::from(embedding.to_vec());

        sqlx::query(
            r#"
            INSERT INTO conversations (prompt, response, embedding)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(prompt)
        .bind(response)
        .bind(embedding_vector)
        .execute(&self.pool)
        .await?;

        debug!(name: "store.exchange.saved", prompt_len = prompt.len(), "Exchange stored");
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], limit: usize) -> Result<SimilarityResult> {
        if query_vec.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query_vec.len(),
            });
        }
        if limit == 0 {
            return Ok(Vec::new());
        }
        let embedding_vector = Vector::from(query_vec.to_vec());
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);

        // id breaks distance ties in insertion order
        let rows = sqlx::query(
            r#"
            SELECT prompt, response, embedding <-> $1 AS distance
            FROM conversations
            ORDER BY embedding <-> $1, id
            LIMIT $2
            "#,
        )
        .bind(embedding_vector) // $1
        .bind(limit_i64) // $2
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in rows {
            let distance: f64 = row.try_get("distance")?;
            matches.push(ExchangeMatch {
                prompt: row.try_get("prompt")?,
                response: row.try_get("response")?,
                distance: distance as f32,
            });
        }
        Ok(matches)
    }

    async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM conversations")
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(u64::try_from(total).unwrap_or_default())
    }
}
