//! Token-overlap search over KB titles and symptoms

use crate::knowledge_base::SharedKnowledgeBase;
use crate::scoring::{overlap_score, rank_top_n, round3, tokenize};
use crate::search::{SearchError, SimilarityIndex};
use crate::types::ScoredKbEntry;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

/// Lexical strategy; entry token sets are computed once at construction
pub struct LexicalIndex {
    kb: SharedKnowledgeBase,
    entry_tokens: Vec<HashSet<String>>,
}

impl LexicalIndex {
    pub fn new(kb: SharedKnowledgeBase) -> Self {
        let entry_tokens = kb
            .entries()
            .iter()
            .map(|entry| tokenize(&entry.search_text()))
            .collect();
        Self { kb, entry_tokens }
    }

    /// Synchronous ranking; the trait method just wraps this
    pub fn rank(&self, query: &str, top_n: usize) -> Vec<ScoredKbEntry> {
        let query_tokens = tokenize(query);

        let scored: Vec<(f32, usize)> = self
            .entry_tokens
            .iter()
            .enumerate()
            .map(|(idx, tokens)| (overlap_score(&query_tokens, tokens), idx))
            .collect();

        let ranked: Vec<ScoredKbEntry> = rank_top_n(scored, top_n)
            .into_iter()
            .map(|(score, idx)| ScoredKbEntry {
                entry: self.kb.entries()[idx].clone(),
                match_score: round3(score),
            })
            .collect();

        debug!(
            "Lexical search: {} query tokens, top score {:?}",
            query_tokens.len(),
            ranked.first().map(|m| m.match_score)
        );
        ranked
    }
}

#[async_trait]
impl SimilarityIndex for LexicalIndex {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn search(&self, query: &str, top_n: usize) -> Result<Vec<ScoredKbEntry>, SearchError> {
        Ok(self.rank(query, top_n))
    }
}
