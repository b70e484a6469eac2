//! Session state machine and interactive loop.

use std::borrow::Cow;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::context::ContextBuilder;
use crate::error::Result;
use crate::llm::{ChatClient, EmbeddingClient};
use crate::persistence::ConversationStore;
use crate::worker::{APOLOGY, InferenceWorker, Reply, Task};

use super::writer::ExchangeWriter;
use super::{Command, Transcript};

/// Response text stored alongside an explicit memory.
pub const MEMORY_ACK: &str = "Memory stored.";

const WELCOME: &str = "Welcome to the RAG Assistant!\n";
const USER_PROMPT: &str = "USER: \n";
const PROCESSING: &str = "Processing your request...\n";

/// Where the session is in its per-turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResult,
    Ended,
}

/// What handling one command produced, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The assistant replied to a submitted task.
    Reply(String),
    /// `/forget` ran (whether or not anything was removed).
    Forgotten,
    /// `/memorize` ran; `stored` tells whether the write went through.
    Memorized { stored: bool },
    /// `/memorize` without text.
    NothingToMemorize,
    /// The session is over.
    Ended,
}

/// One interactive conversation.
///
/// Owns the transcript exclusively; the inference worker only ever sees
/// snapshots of it.
#[derive(Debug)]
pub struct Session {
    transcript: Transcript,
    state: SessionState,
    context: ContextBuilder,
    worker: Option<InferenceWorker>,
    writer: Option<ExchangeWriter>,
}

impl Session {
    /// Start a session and its inference worker on the current runtime.
    pub fn new(
        chat: Arc<dyn ChatClient>,
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn ConversationStore>,
        context_limit: usize,
    ) -> Self {
        let context = ContextBuilder::new(Arc::clone(&embedder), Arc::clone(&store))
            .with_limit(context_limit);
        Self {
            transcript: Transcript::new(),
            state: SessionState::Idle,
            context,
            worker: Some(InferenceWorker::spawn(chat)),
            writer: Some(ExchangeWriter::spawn(embedder, store)),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Parse and handle one raw input line. Blank lines yield `None`.
    pub async fn handle_line(&mut self, line: &str) -> Option<Outcome> {
        let command = Command::parse(line)?;
        Some(self.handle(command, line).await)
    }

    /// Apply one command. `raw` is the line as typed; it is what gets
    /// embedded and stored after a chat turn.
    pub async fn handle(&mut self, command: Command, raw: &str) -> Outcome {
        if self.state == SessionState::Ended {
            return Outcome::Ended;
        }

        match command {
            Command::Exit => {
                self.state = SessionState::Ended;
                Outcome::Ended
            }
            Command::Recall(text) => {
                let augmented = self.context.build_context(&text).await;
                Outcome::Reply(self.submit(augmented, raw).await)
            }
            Command::Forget => {
                let removed = self.transcript.forget_last_exchange();
                debug!(name: "session.forget", removed, "Forget requested");
                Outcome::Forgotten
            }
            Command::Memorize(text) => {
                if text.is_empty() {
                    return Outcome::NothingToMemorize;
                }
                Outcome::Memorized {
                    stored: self.memorize(&text).await,
                }
            }
            Command::Chat(text) => Outcome::Reply(self.submit(text, raw).await),
        }
    }

    /// Append `content`, run it through the worker, append the reply and
    /// queue the raw input with the reply for persistence. Failed turns are
    /// stored too, with the text the user was shown.
    async fn submit(&mut self, content: String, raw: &str) -> String {
        self.transcript.add_user_message(content);
        self.state = SessionState::AwaitingResult;

        let task = Task::new(self.transcript.snapshot());
        let reply = match self.worker.as_mut() {
            Some(worker) => worker.request(task).await,
            None => Err(crate::Error::Inference(
                "inference worker stopped".to_string(),
            )),
        }
        .unwrap_or_else(|e| {
            error!(name: "session.submit.failed", error = %e, "No reply from worker");
            Reply {
                text: APOLOGY.to_string(),
                failed: true,
            }
        });

        self.state = SessionState::Idle;
        self.transcript.add_assistant_message(reply.text.clone());

        debug!(name: "session.turn.completed", failed = reply.failed, "Turn completed");
        if let Some(writer) = &self.writer {
            writer.save(raw.trim().to_string(), reply.text.clone());
        }
        reply.text
    }

    /// Store `text` as a memory, after any writes still queued.
    async fn memorize(&self, text: &str) -> bool {
        let Some(writer) = &self.writer else {
            return false;
        };
        let stored = writer
            .save_and_wait(text.to_string(), MEMORY_ACK.to_string())
            .await;
        if stored {
            info!(name: "session.memorize.saved", "Memory stored");
        }
        stored
    }

    /// Wait for every queued persistence step to finish.
    pub async fn flush_pending(&self) {
        if let Some(writer) = &self.writer {
            writer.flush().await;
        }
    }

    /// Stop the worker, then finish the queued writes.
    pub async fn end(&mut self) {
        self.state = SessionState::Ended;
        if let Some(worker) = self.worker.take() {
            let leftover = worker.shutdown().await;
            if !leftover.is_empty() {
                warn!(
                    name: "session.end.undelivered",
                    count = leftover.len(),
                    "Replies dropped at shutdown"
                );
            }
        }
        if let Some(writer) = self.writer.take() {
            writer.shutdown().await;
        }
        info!(
            name: "session.ended",
            messages = self.transcript.len(),
            "Session ended"
        );
    }

    /// Drive the session from a line-oriented input until `exit` or end of input.
    pub async fn run<R, W>(mut self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = self.interact(input, &mut output).await;
        self.end().await;
        result
    }

    async fn interact<R, W>(&mut self, mut input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        output.write_all(WELCOME.as_bytes()).await?;
        let mut buf = Vec::new();

        loop {
            output.write_all(USER_PROMPT.as_bytes()).await?;
            output.flush().await?;

            buf.clear();
            if input.read_until(b'\n', &mut buf).await? == 0 {
                debug!(name: "session.input.closed", "End of input");
                return Ok(());
            }
            let line = String::from_utf8_lossy(&buf);
            if matches!(line, Cow::Owned(_)) {
                warn!(name: "session.input.invalid_utf8", "Replaced invalid bytes in input line");
            }
            let Some(command) = Command::parse(&line) else {
                continue;
            };

            if command.submits_task() {
                output.write_all(PROCESSING.as_bytes()).await?;
                output.flush().await?;
            }

            let text = match self.handle(command, &line).await {
                Outcome::Reply(reply) => format!("\nASSISTANT:\n{reply}\n\n"),
                Outcome::Forgotten => "\nLast conversation forgotten.\n\n".to_string(),
                Outcome::Memorized { stored: true } => {
                    "\nMemory stored successfully.\n\n".to_string()
                }
                Outcome::Memorized { stored: false } => {
                    "\nMemory could not be stored.\n\n".to_string()
                }
                Outcome::NothingToMemorize => "\nNothing to memorize.\n\n".to_string(),
                Outcome::Ended => return Ok(()),
            };
            output.write_all(text.as_bytes()).await?;
        }
    }
}
