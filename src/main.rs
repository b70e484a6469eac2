//! Memory Assistant
//!
//! Entry point for the interactive retrieval-augmented chat loop.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{info, warn};

use memory_assistant::config::AppConfig;
use memory_assistant::llm::{ChatCompletionsClient, EmbeddingsClient};
use memory_assistant::persistence::ConversationStore;
use memory_assistant::persistence::providers::{memory::InMemoryStore, postgres::PostgresStore};
use memory_assistant::session::Session;
use memory_assistant::telemetry;

#[tokio::main]
async fn main() {
    // Load .env (if present)
    let _ = dotenv();

    telemetry::init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    let settings = config.llm_settings();

    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        chat_model = %settings.chat_model,
        embedding_model = %settings.embedding_model,
        provider = ?settings.provider,
        "Model configuration loaded"
    );

    let chat = Arc::new(ChatCompletionsClient::new(settings.clone())?);
    let embedder = Arc::new(EmbeddingsClient::new(settings)?);

    let dimension = config.persistence.vector_dimension;
    let store: Arc<dyn ConversationStore> = if config.persistence.ephemeral {
        warn!(
            name: "store.ephemeral",
            "Memories are kept in process and lost on exit"
        );
        Arc::new(InMemoryStore::new(dimension))
    } else {
        Arc::new(
            PostgresStore::connect(
                &config.persistence.database_url,
                dimension,
                config.persistence.max_connections,
            )
            .await
            .context("conversation store is unreachable")?,
        )
    };

    match store.count().await {
        Ok(total) => {
            info!(name: "store.loaded", exchanges = total, "Long-term memory available");
        }
        Err(e) => {
            warn!(name: "store.count.failed", error = %e, "Could not count stored exchanges");
        }
    }

    let session = Session::new(chat, embedder, store, config.retrieval.context_limit);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    session
        .run(stdin, tokio::io::stdout())
        .await
        .context("terminal input or output failed")?;

    Ok(())
}
