//! Offline generation of the KB embedding index

use crate::knowledge_base::KnowledgeBase;
use crate::provider::{ModelProvider, ProviderError};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::PrecomputedEmbedding;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{info, warn};

/// Embed every KB entry, `concurrency` requests at a time.
/// Entries whose embedding fails are left out; the search path tolerates gaps.
pub async fn build_embedding_index(
    kb: &KnowledgeBase,
    provider: &dyn ModelProvider,
    retry: &RetryPolicy,
    concurrency: usize,
) -> Vec<PrecomputedEmbedding> {
    let results: Vec<Option<PrecomputedEmbedding>> = stream::iter(kb.entries())
        .map(|entry| async move {
            let text = entry.search_text();
            let label = format!("embed {}", entry.id);
            match retry_with_backoff(retry, &label, ProviderError::is_transient, || provider.embed(&text)).await {
                Ok(vector) => Some(PrecomputedEmbedding {
                    id: entry.id.clone(),
                    vector,
                }),
                Err(e) => {
                    warn!("Failed to embed KB entry id={} title={}: {}", entry.id, entry.title, e);
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let embeddings: Vec<PrecomputedEmbedding> = results.into_iter().flatten().collect();
    info!("Embedded {}/{} KB entries", embeddings.len(), kb.len());
    embeddings
}

pub fn write_embedding_index(path: impl AsRef<Path>, embeddings: &[PrecomputedEmbedding]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(embeddings)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved embedding index to {}", path.display());
    Ok(())
}
