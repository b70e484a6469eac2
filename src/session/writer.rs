//! Ordered background persistence.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::llm::EmbeddingClient;
use crate::persistence::ConversationStore;

#[derive(Debug)]
enum WriteJob {
    Save {
        prompt: String,
        response: String,
        done: Option<oneshot::Sender<bool>>,
    },
    Flush(oneshot::Sender<()>),
}

/// Single background task that embeds and stores exchanges one at a time,
/// in the order they were queued.
#[derive(Debug)]
pub(crate) struct ExchangeWriter {
    jobs: mpsc::UnboundedSender<WriteJob>,
    handle: JoinHandle<()>,
}

impl ExchangeWriter {
    pub(crate) fn spawn(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(embedder, store, rx));
        Self { jobs: tx, handle }
    }

    /// Queue an exchange without waiting for it.
    pub(crate) fn save(&self, prompt: String, response: String) {
        let job = WriteJob::Save {
            prompt,
            response,
            done: None,
        };
        if self.jobs.send(job).is_err() {
            warn!(name: "session.persist.closed", "Writer stopped; exchange dropped");
        }
    }

    /// Queue an exchange and wait until it is stored. Everything queued
    /// before it is stored first.
    pub(crate) async fn save_and_wait(&self, prompt: String, response: String) -> bool {
        let (tx, rx) = oneshot::channel();
        let job = WriteJob::Save {
            prompt,
            response,
            done: Some(tx),
        };
        if self.jobs.send(job).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Wait for every write queued so far.
    pub(crate) async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.jobs.send(WriteJob::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Finish the queued writes and stop the task.
    pub(crate) async fn shutdown(self) {
        drop(self.jobs);
        if let Err(e) = self.handle.await {
            error!(
                name: "session.persist.join_failed",
                error = %e,
                "Writer did not exit cleanly"
            );
        }
    }
}

async fn run(
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn ConversationStore>,
    mut jobs: mpsc::UnboundedReceiver<WriteJob>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            WriteJob::Save {
                prompt,
                response,
                done,
            } => {
                let stored = AssertUnwindSafe(save(&*embedder, &*store, &prompt, &response))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        error!(name: "session.persist.panicked", "Exchange not stored");
                        false
                    });
                if let Some(done) = done {
                    let _ = done.send(stored);
                }
            }
            WriteJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

async fn save(
    embedder: &dyn EmbeddingClient,
    store: &dyn ConversationStore,
    prompt: &str,
    response: &str,
) -> bool {
    let embedding = match embedder.embed(prompt).await {
        Ok(v) => v,
        Err(e) => {
            warn!(name: "session.persist.embed_failed", error = %e, "Exchange not stored");
            return false;
        }
    };
    match store.store(prompt, response, &embedding).await {
        Ok(()) => {
            debug!(name: "session.persist.saved", "Exchange stored");
            true
        }
        Err(e) => {
            warn!(name: "session.persist.store_failed", error = %e, "Exchange not stored");
            false
        }
    }
}
