//! Read-only knowledge base and precomputed embedding store

use crate::types::{KbEntry, PrecomputedEmbedding};
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Immutable KB corpus, shared across requests
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    entries: Vec<KbEntry>,
    by_id: HashMap<String, usize>,
}

pub type SharedKnowledgeBase = Arc<KnowledgeBase>;

impl KnowledgeBase {
    /// Build from entries, rejecting duplicate ids
    pub fn from_entries(entries: Vec<KbEntry>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            if by_id.insert(entry.id.clone(), idx).is_some() {
                anyhow::bail!("Duplicate KB entry id '{}'", entry.id);
            }
        }
        Ok(Self { entries, by_id })
    }

    /// Load a JSON array of KB entries
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read KB file {}", path.display()))?;
        let entries: Vec<KbEntry> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse KB file {}", path.display()))?;

        let kb = Self::from_entries(entries)?;
        info!("Loaded {} KB entries from {}", kb.len(), path.display());
        Ok(kb)
    }

    pub fn entries(&self) -> &[KbEntry] {
        &self.entries
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Precomputed vectors keyed by KB entry, in index-file order.
///
/// Only records that resolve to a KB entry and share the dimension of the
/// first accepted vector are kept; the rest are dropped at load time so the
/// search path never has to consider them.
#[derive(Debug, Default)]
pub struct EmbeddingStore {
    vectors: Vec<(usize, Vec<f32>)>, // (KB position, vector)
    dimension: usize,
}

impl EmbeddingStore {
    pub fn from_embeddings(kb: &KnowledgeBase, embeddings: Vec<PrecomputedEmbedding>) -> Self {
        let mut vectors = Vec::with_capacity(embeddings.len());
        let mut seen = HashSet::new();
        let mut dimension = 0;

        for emb in embeddings {
            let Some(pos) = kb.position(&emb.id) else {
                warn!("Skipping embedding for unknown KB id '{}'", emb.id);
                continue;
            };
            if emb.vector.is_empty() {
                warn!("Skipping empty embedding for KB id '{}'", emb.id);
                continue;
            }
            if dimension == 0 {
                dimension = emb.vector.len();
            } else if emb.vector.len() != dimension {
                warn!(
                    "Skipping embedding for KB id '{}': dimension {} != {}",
                    emb.id,
                    emb.vector.len(),
                    dimension
                );
                continue;
            }
            if !seen.insert(pos) {
                warn!("Skipping duplicate embedding for KB id '{}'", emb.id);
                continue;
            }
            vectors.push((pos, emb.vector));
        }

        Self { vectors, dimension }
    }

    /// Load the index file. A missing file is not an error: it yields `None`.
    pub fn load(path: impl AsRef<Path>, kb: &KnowledgeBase) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Embedding index not found at {}", path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read embedding index {}", path.display()))?;
        let embeddings: Vec<PrecomputedEmbedding> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse embedding index {}", path.display()))?;

        let store = Self::from_embeddings(kb, embeddings);
        let missing = kb.len().saturating_sub(store.len());
        info!(
            "Loaded {} embeddings (dim {}) from {}; {} KB entries have no embedding",
            store.len(),
            store.dimension,
            path.display(),
            missing
        );
        Ok(Some(store))
    }

    /// (KB position, vector) pairs in index order
    pub fn vectors(&self) -> &[(usize, Vec<f32>)] {
        &self.vectors
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
