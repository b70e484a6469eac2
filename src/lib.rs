//! Memory Assistant
//!
//! A terminal chat assistant with long-term memory. Past exchanges are
//! stored with their embedding and the most similar ones are pulled back
//! into the prompt on request.
//!
//! # Architecture
//!
//! - **Model clients**: Embedding and chat services behind async traits
//! - **Conversation store**: Postgres + pgvector, or in-process
//! - **Context builder**: Top-K retrieval rendered into the prompt
//! - **Inference worker**: Single background task, strict FIFO
//! - **Session loop**: Command parsing and the per-turn state machine
//!
//! # Modules
//!
//! - [`llm`]: Model service traits and HTTP clients
//! - [`persistence`]: Conversation store trait and providers
//! - [`context`]: Retrieval context construction
//! - [`worker`]: Inference worker pipeline
//! - [`session`]: Transcript, commands and the interactive loop

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod persistence;
pub mod session;
pub mod telemetry;
pub mod testing;
pub mod worker;

pub use error::{Error, Result};
