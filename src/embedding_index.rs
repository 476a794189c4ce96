//! Embedding-based search against precomputed KB vectors

use crate::knowledge_base::{EmbeddingStore, SharedKnowledgeBase};
use crate::provider::{ModelProvider, ProviderError};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::scoring::{cosine_similarity, rank_top_n, round3};
use crate::search::{SearchError, SimilarityIndex};
use crate::types::ScoredKbEntry;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Cosine strategy. Entries without a precomputed vector are never scored.
pub struct EmbeddingIndex {
    kb: SharedKnowledgeBase,
    store: Arc<EmbeddingStore>,
    provider: Arc<dyn ModelProvider>,
    retry: RetryPolicy,
}

impl EmbeddingIndex {
    pub fn new(
        kb: SharedKnowledgeBase,
        store: Arc<EmbeddingStore>,
        provider: Arc<dyn ModelProvider>,
        retry: RetryPolicy,
    ) -> Self {
        Self { kb, store, provider, retry }
    }

    /// Rank stored vectors against an already-computed query vector.
    /// Ordering uses the raw cosine; reported scores are clamped to [0, 1].
    pub fn rank(&self, query_vector: &[f32], top_n: usize) -> Result<Vec<ScoredKbEntry>, SearchError> {
        if !self.store.is_empty() && query_vector.len() != self.store.dimension() {
            return Err(SearchError::DimensionMismatch {
                expected: self.store.dimension(),
                actual: query_vector.len(),
            });
        }

        let scored: Vec<(f32, usize)> = self
            .store
            .vectors()
            .iter()
            .map(|(pos, vector)| (cosine_similarity(query_vector, vector), *pos))
            .collect();

        Ok(rank_top_n(scored, top_n)
            .into_iter()
            .map(|(score, pos)| ScoredKbEntry {
                entry: self.kb.entries()[pos].clone(),
                match_score: round3(score.clamp(0.0, 1.0)),
            })
            .collect())
    }
}

#[async_trait]
impl SimilarityIndex for EmbeddingIndex {
    fn name(&self) -> &'static str {
        "embedding"
    }

    async fn search(&self, query: &str, top_n: usize) -> Result<Vec<ScoredKbEntry>, SearchError> {
        let start = Instant::now();

        // No fallback here: a failed query embedding has no numeric substitute
        let query_vector = retry_with_backoff(
            &self.retry,
            "query embedding",
            ProviderError::is_transient,
            || self.provider.embed(query),
        )
        .await?;

        let matches = self.rank(&query_vector, top_n)?;

        info!(
            "Embedding search: {} of {} entries indexed, {} matches in {:.1}ms",
            self.store.len(),
            self.kb.len(),
            matches.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(matches)
    }
}
