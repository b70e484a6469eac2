//! Error taxonomy for the assistant.
//!
//! Each variant maps to one failure class of the retrieval pipeline. None of
//! them is fatal once the session loop is running: callers decide whether a
//! failure degrades (retrieval), is logged and swallowed (persistence), or is
//! turned into a user-visible apology (inference).

use thiserror::Error;

/// Errors raised by the embedding, persistence and inference boundaries.
#[derive(Debug, Error)]
pub enum Error {
    /// The embedding service was unreachable or replied with malformed data.
    #[error("embedding failure: {0}")]
    Embedding(String),

    /// The conversation store rejected a query or could not be reached.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// A vector with the wrong length was handed to the store.
    #[error("persistence failure: embedding has {actual} dimensions, store expects {expected}")]
    DimensionMismatch {
        /// Dimensionality configured for the store.
        expected: usize,
        /// Dimensionality of the rejected vector.
        actual: usize,
    },

    /// The chat service failed to produce a reply.
    #[error("inference failure: {0}")]
    Inference(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Terminal input or output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Persistence(format!("migration failed: {err}"))
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
