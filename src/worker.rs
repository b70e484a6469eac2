//! Inference worker pipeline.
//!
//! A single background task drains an unbounded FIFO of chat requests and
//! publishes replies on a second unbounded FIFO. Only one request is ever
//! running, so replies come back in submission order and need no
//! correlation id.
//!
//! A failing chat call never stops the worker: inference errors become
//! [`APOLOGY`] and panics become an `Error: ...` reply, both flagged as
//! failed. Only the shutdown sentinel (or dropping every sender) ends the
//! loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::llm::{ChatClient, Message};

/// Reply delivered when the chat service fails.
pub const APOLOGY: &str = "I'm sorry, I encountered an error while processing your request.";

/// Snapshot of the transcript handed to the worker.
///
/// The worker owns it until the reply is produced; the session keeps
/// mutating its own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub transcript: Vec<Message>,
}

impl Task {
    pub fn new(transcript: Vec<Message>) -> Self {
        Self { transcript }
    }
}

/// Reply published by the worker, one per task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Text shown to the user and appended to the transcript.
    pub text: String,
    /// Whether the chat call failed and `text` is a stand-in.
    pub failed: bool,
}

impl Reply {
    fn completed(text: String) -> Self {
        Self {
            text,
            failed: false,
        }
    }

    fn failed(text: String) -> Self {
        Self { text, failed: true }
    }
}

#[derive(Debug)]
enum Job {
    Run(Task),
    Shutdown,
}

/// Handle to the background inference worker.
#[derive(Debug)]
pub struct InferenceWorker {
    tasks: mpsc::UnboundedSender<Job>,
    results: mpsc::UnboundedReceiver<Reply>,
    handle: JoinHandle<()>,
}

impl InferenceWorker {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(chat: Arc<dyn ChatClient>) -> Self {
        let (task_tx, task_rx) = mpsc::unbounded_channel::<Job>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<Reply>();

        let handle = tokio::spawn(run(chat, task_rx, result_tx));
        info!(name: "worker.started", "Inference worker started");

        Self {
            tasks: task_tx,
            results: result_rx,
            handle,
        }
    }

    /// Enqueue a task. Fails only if the worker has already exited.
    pub fn submit(&self, task: Task) -> Result<()> {
        self.tasks
            .send(Job::Run(task))
            .map_err(|_| Error::Inference("inference worker is not running".to_string()))
    }

    /// Wait for the next reply. `None` once the worker has exited and every
    /// reply has been taken.
    pub async fn next_result(&mut self) -> Option<Reply> {
        self.results.recv().await
    }

    /// Submit a task and wait for its reply.
    pub async fn request(&mut self, task: Task) -> Result<Reply> {
        self.submit(task)?;
        self.next_result()
            .await
            .ok_or_else(|| Error::Inference("inference worker exited".to_string()))
    }

    /// Enqueue the shutdown sentinel and wait for the worker to exit.
    ///
    /// Everything queued ahead of the sentinel still runs. Replies nobody
    /// collected are returned in submission order.
    pub async fn shutdown(mut self) -> Vec<Reply> {
        // A send error means the loop is already gone; joining still applies.
        let _ = self.tasks.send(Job::Shutdown);

        if let Err(e) = (&mut self.handle).await {
            error!(name: "worker.join.failed", error = %e, "Inference worker did not exit cleanly");
        }

        let mut leftover = Vec::new();
        while let Ok(reply) = self.results.try_recv() {
            leftover.push(reply);
        }
        info!(name: "worker.stopped", undelivered = leftover.len(), "Inference worker stopped");
        leftover
    }
}

async fn run(
    chat: Arc<dyn ChatClient>,
    mut tasks: mpsc::UnboundedReceiver<Job>,
    results: mpsc::UnboundedSender<Reply>,
) {
    let mut seq: u64 = 0;
    while let Some(job) = tasks.recv().await {
        let Job::Run(task) = job else {
            debug!(name: "worker.sentinel", "Shutdown sentinel received");
            break;
        };
        seq += 1;
        debug!(name: "worker.task.running", seq, messages = task.transcript.len(), "Task running");

        let reply = execute(chat.as_ref(), &task).await;

        debug!(name: "worker.task.completed", seq, "Task completed");
        if results.send(reply).is_err() {
            debug!(name: "worker.result.dropped", seq, "Result receiver gone");
        }
    }
}

async fn execute(chat: &dyn ChatClient, task: &Task) -> Reply {
    match AssertUnwindSafe(chat.chat(&task.transcript))
        .catch_unwind()
        .await
    {
        Ok(Ok(text)) => Reply::completed(text),
        Ok(Err(e)) => {
            error!(name: "worker.inference.failed", error = %e, "Chat request failed");
            Reply::failed(APOLOGY.to_string())
        }
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            error!(name: "worker.task.panicked", error = %msg, "Chat client panicked");
            Reply::failed(format!("Error: {msg}"))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChat;
    use std::time::Duration;

    fn task(content: &str) -> Task {
        Task::new(vec![Message::user(content)])
    }

    #[tokio::test]
    async fn test_results_arrive_in_submission_order() {
        let chat = Arc::new(ScriptedChat::new().with_delay(Duration::from_millis(5)));
        let mut worker = InferenceWorker::spawn(chat.clone());

        for i in 0..10 {
            worker.submit(task(&format!("msg {i}"))).unwrap();
        }
        for i in 0..10 {
            let reply = worker.next_result().await.unwrap();
            assert_eq!(reply.text, ScriptedChat::reply_for(&format!("msg {i}")));
            assert!(!reply.failed);
        }

        assert_eq!(chat.max_concurrent(), 1);
        assert!(worker.shutdown().await.is_empty());
    }

    #[tokio::test]
    async fn test_inference_failure_becomes_apology() {
        let chat = Arc::new(ScriptedChat::new().fail_on("boom"));
        let mut worker = InferenceWorker::spawn(chat);

        let reply = worker.request(task("boom")).await.unwrap();
        assert_eq!(reply.text, APOLOGY);
        assert!(reply.failed);
        // Worker is still alive for the next task
        assert_eq!(
            worker.request(task("next")).await.unwrap().text,
            ScriptedChat::reply_for("next")
        );
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_panic_becomes_error_reply() {
        let chat = Arc::new(ScriptedChat::new().panic_on("explode"));
        let mut worker = InferenceWorker::spawn(chat);

        let reply = worker.request(task("explode")).await.unwrap();
        assert_eq!(reply.text, "Error: chat client blew up");
        assert!(reply.failed);
        assert_eq!(
            worker.request(task("after")).await.unwrap().text,
            ScriptedChat::reply_for("after")
        );
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_in_flight_task() {
        let chat = Arc::new(ScriptedChat::new().with_delay(Duration::from_millis(50)));
        let worker = InferenceWorker::spawn(chat.clone());

        worker.submit(task("slow")).unwrap();
        // Give the worker time to pick the task up before the sentinel lands
        tokio::time::sleep(Duration::from_millis(10)).await;
        let leftover = worker.shutdown().await;

        let expected = Reply::completed(ScriptedChat::reply_for("slow"));
        assert_eq!(leftover, vec![expected]);
        assert_eq!(chat.transcripts().len(), 1);
    }

    #[tokio::test]
    async fn test_tasks_queued_before_sentinel_still_run() {
        let chat = Arc::new(ScriptedChat::new());
        let worker = InferenceWorker::spawn(chat);

        worker.submit(task("a")).unwrap();
        worker.submit(task("b")).unwrap();
        let leftover = worker.shutdown().await;
        let texts: Vec<String> = leftover.into_iter().map(|r| r.text).collect();
        assert_eq!(
            texts,
            vec![ScriptedChat::reply_for("a"), ScriptedChat::reply_for("b")]
        );
    }

    #[tokio::test]
    async fn test_worker_sees_snapshot_not_later_mutations() {
        let chat = Arc::new(ScriptedChat::new());
        let mut worker = InferenceWorker::spawn(chat.clone());

        let mut transcript = vec![Message::user("first")];
        worker.submit(Task::new(transcript.clone())).unwrap();
        transcript.push(Message::user("mutated after submit"));
        worker.next_result().await.unwrap();

        assert_eq!(chat.transcripts()[0], vec![Message::user("first")]);
        worker.shutdown().await;
    }
}
