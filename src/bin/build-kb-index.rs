//! Offline builder for the KB embedding index

use ticket_triage::index_builder::{build_embedding_index, write_embedding_index};
use ticket_triage::*;
use tracing::info;

const CONCURRENCY: usize = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let settings = Settings::from_env()?;
    let Some(config) = settings.provider_config() else {
        anyhow::bail!("OPENAI_API_KEY must be set to build the embedding index");
    };

    let kb = KnowledgeBase::from_json_file(&settings.kb_path)?;
    let provider = HttpModelProvider::new(config)?;

    info!("Embedding {} KB entries with {}", kb.len(), settings.embedding_model);
    let embeddings = build_embedding_index(&kb, &provider, &settings.retry_policy(), CONCURRENCY).await;
    write_embedding_index(&settings.embeddings_path, &embeddings)?;

    Ok(())
}
