//! Statute corpus loading and the local retriever.
//!
//! A corpus file is a JSON object with one array per collection:
//!
//! ```json
//! {
//!   "civil":    [{"text": "...", "source": "Hindu Marriage Act, 1955, s.13"}],
//!   "criminal": [{"text": "...", "source": "Indian Penal Code, 1860, s.378"}]
//! }
//! ```
//!
//! [`LocalRetriever`] embeds every passage once at build time and answers
//! queries by cosine similarity against one [`VectorStore`] per collection.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lexrag_types::model::{LawDomain, RetrievedPassage};
use lexrag_types::{LexragError, Result, ServiceError};

use crate::embeddings::Embedder;
use crate::pipeline::traits::Retriever;
use crate::vector_store::VectorStore;

/// One passage of statute text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusPassage {
    pub text: String,
    #[serde(default)]
    pub source: String,
}

/// Passages grouped by collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    #[serde(default)]
    pub civil: Vec<CorpusPassage>,
    #[serde(default)]
    pub criminal: Vec<CorpusPassage>,
}

impl Corpus {
    /// Load a corpus from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LexragError::Corpus(format!("cannot read {}: {e}", path.display()))
        })?;
        let corpus: Corpus = serde_json::from_str(&raw)?;
        info!(
            path = %path.display(),
            civil = corpus.civil.len(),
            criminal = corpus.criminal.len(),
            "corpus loaded"
        );
        Ok(corpus)
    }

    pub fn passages(&self, domain: LawDomain) -> &[CorpusPassage] {
        match domain {
            LawDomain::Civil => &self.civil,
            LawDomain::Criminal => &self.criminal,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.civil.is_empty() && self.criminal.is_empty()
    }
}

/// Embedding retriever over an in-memory corpus.
pub struct LocalRetriever {
    embedder: Arc<dyn Embedder>,
    collections: HashMap<LawDomain, VectorStore>,
}

impl LocalRetriever {
    /// Embed every passage of `corpus` and index it by collection.
    pub async fn build(corpus: &Corpus, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let mut collections = HashMap::new();
        for domain in [LawDomain::Civil, LawDomain::Criminal] {
            let passages = corpus.passages(domain);
            if passages.is_empty() {
                continue;
            }
            let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
            let vectors = embedder
                .embed_batch(&texts)
                .await
                .map_err(|e| LexragError::Corpus(format!("embedding {domain} corpus: {e}")))?;

            let mut store = VectorStore::new();
            for (i, (passage, vector)) in passages.iter().zip(vectors).enumerate() {
                store.add(
                    format!("{}-{i}", domain.collection()),
                    passage.text.clone(),
                    passage.source.clone(),
                    vector,
                );
            }
            debug!(collection = %domain, entries = store.len(), "collection indexed");
            collections.insert(domain, store);
        }
        Ok(Self {
            embedder,
            collections,
        })
    }

    /// Number of indexed passages in `domain`.
    pub fn collection_len(&self, domain: LawDomain) -> usize {
        self.collections.get(&domain).map_or(0, VectorStore::len)
    }
}

#[async_trait]
impl Retriever for LocalRetriever {
    async fn retrieve(
        &self,
        query: &str,
        domain: LawDomain,
        top_k: usize,
    ) -> std::result::Result<Vec<RetrievedPassage>, ServiceError> {
        let Some(store) = self.collections.get(&domain) else {
            debug!(collection = %domain, "collection not indexed");
            return Ok(Vec::new());
        };
        let query_vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| ServiceError::Unavailable(format!("query embedding: {e}")))?;

        Ok(store
            .search(&query_vector, top_k)
            .into_iter()
            .map(|hit| RetrievedPassage {
                text: hit.text,
                source: hit.source,
                domain,
                score: hit.score,
            })
            .collect())
    }
}
