//! Interactive session management.
//!
//! This module owns the conversation state of a single interactive session
//! and the control loop that drives it.
//!
//! # Architecture
//!
//! - [`Command`]: Closed set of recognized input lines
//! - [`Transcript`]: Ordered in-memory message history
//! - [`Session`]: State machine tying retrieval, inference and persistence together
//!
//! # Example
//!
//! ```rust
//! use memory_assistant::session::{Command, Transcript};
//!
//! let mut transcript = Transcript::new();
//! transcript.add_user_message("Hello!");
//! assert_eq!(transcript.len(), 1);
//!
//! assert_eq!(Command::parse("/forget"), Some(Command::Forget));
//! ```

mod command;
mod runner;
mod transcript;
mod writer;

pub use command::Command;
pub use runner::{MEMORY_ACK, Outcome, Session, SessionState};
pub use transcript::Transcript;
