//! Similarity search over the knowledge base

use crate::config::SearchStrategy;
use crate::embedding_index::EmbeddingIndex;
use crate::knowledge_base::{EmbeddingStore, SharedKnowledgeBase};
use crate::lexical_index::LexicalIndex;
use crate::provider::{ModelProvider, ProviderError};
use crate::retry::RetryPolicy;
use crate::types::ScoredKbEntry;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] ProviderError),

    #[error("query embedding has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for pluggable KB search strategies.
///
/// Implementations return at most `top_n` entries, best first, and never
/// modify the shared knowledge base.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, top_n: usize) -> Result<Vec<ScoredKbEntry>, SearchError>;
}

/// Pick the process-wide search strategy.
///
/// The embedding strategy needs a readable, non-empty index and a provider.
/// When any of those is missing it is refused with a warning and lexical
/// search is used instead; startup never fails on the index file.
pub fn select_index(
    strategy: SearchStrategy,
    embeddings_path: &Path,
    kb: SharedKnowledgeBase,
    provider: Option<Arc<dyn ModelProvider>>,
    retry: RetryPolicy,
) -> Arc<dyn SimilarityIndex> {
    if strategy == SearchStrategy::Lexical {
        return Arc::new(LexicalIndex::new(kb));
    }

    let store = match EmbeddingStore::load(embeddings_path, &kb) {
        Ok(Some(store)) if !store.is_empty() => store,
        Ok(Some(_)) => {
            warn!("Embedding strategy unavailable: index is empty; using lexical search");
            return Arc::new(LexicalIndex::new(kb));
        }
        Ok(None) => {
            warn!(
                "Embedding strategy unavailable: no index at {} (run build-kb-index); using lexical search",
                embeddings_path.display()
            );
            return Arc::new(LexicalIndex::new(kb));
        }
        Err(e) => {
            warn!("Embedding strategy unavailable: {:#}; using lexical search", e);
            return Arc::new(LexicalIndex::new(kb));
        }
    };

    match provider {
        Some(provider) => Arc::new(EmbeddingIndex::new(kb, Arc::new(store), provider, retry)),
        None => {
            warn!("Embedding strategy unavailable: OPENAI_API_KEY is not set; using lexical search");
            Arc::new(LexicalIndex::new(kb))
        }
    }
}
