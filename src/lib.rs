//! Ticket Triage - support ticket decision engine
//!
//! Triages free-text ticket descriptions with:
//! - Summary, category and severity extraction (keyword rules or a remote model with fallback)
//! - Knowledge-base similarity search (token overlap or precomputed embeddings)
//! - Known/new issue verdict and a recommended next action

pub mod types;
pub mod config;
pub mod knowledge_base;
pub mod scoring;
pub mod retry;
pub mod provider;
pub mod classifier;
pub mod search;
pub mod lexical_index;
pub mod embedding_index;
pub mod decision;
pub mod triage_engine;
pub mod index_builder;
pub mod rate_limit;
pub mod server;

pub use types::*;
pub use config::{SearchStrategy, Settings};
pub use knowledge_base::{EmbeddingStore, KnowledgeBase, SharedKnowledgeBase};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use provider::{HttpModelProvider, ModelProvider, ProviderConfig, ProviderError};
pub use classifier::{classify_by_rules, LlmClassifier, RuleClassifier, TicketClassifier};
pub use search::{select_index, SearchError, SimilarityIndex};
pub use lexical_index::LexicalIndex;
pub use embedding_index::EmbeddingIndex;
pub use decision::{Decision, DecisionPolicy};
pub use triage_engine::{SharedTriageEngine, TriageEngine, TriageError};
pub use rate_limit::RateLimiter;

#[cfg(test)]
mod tests;
