//! In-memory vector store with cosine similarity search.
//!
//! Holds passage embeddings for one collection alongside their text and
//! provenance. Search is brute-force cosine similarity over all entries,
//! which is fine for statute corpora of a few thousand chunks.

use serde::{Deserialize, Serialize};

use crate::embeddings::cosine_similarity;

/// A single stored passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub text: String,
    /// Document and section the passage came from.
    pub source: String,
    pub embedding: Vec<f32>,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub source: String,
    /// Cosine similarity (higher = more similar).
    pub score: f32,
}

#[derive(Debug, Default)]
pub struct VectorStore {
    entries: Vec<VectorEntry>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: String, text: String, source: String, embedding: Vec<f32>) {
        self.entries.push(VectorEntry {
            id,
            text,
            source,
            embedding,
        });
    }

    /// Top-k entries by descending cosine similarity. Equal scores keep
    /// insertion order.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
        if self.entries.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                id: entry.id.clone(),
                text: entry.text.clone(),
                source: entry.source.clone(),
                score: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[VectorEntry] {
        &self.entries
    }
}
