//! SimHash-based local embedder.
//!
//! Each token is hashed once per block of 64 dimensions; every bit of the
//! block hash casts a +1 or -1 vote in its dimension. Token votes are summed
//! and the result normalized to unit length. Texts that share tokens end up
//! with a positive cosine similarity, which is enough for small statute
//! corpora and for the embedding metric when no neural model is configured.

use std::hash::{DefaultHasher, Hash, Hasher};

use async_trait::async_trait;

use super::{Embedder, EmbeddingError};
use crate::scoring::tokenize;

/// Deterministic local embedder. The default dimension is 384.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn default_dimension() -> Self {
        Self::new(384)
    }

    fn compute_embedding(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return vector;
        }

        for token in &tokens {
            for (block_index, block) in vector.chunks_mut(64).enumerate() {
                let mut hasher = DefaultHasher::new();
                token.hash(&mut hasher);
                block_index.hash(&mut hasher);
                let bits = hasher.finish();

                for (bit, val) in block.iter_mut().enumerate() {
                    if (bits >> bit) & 1 == 1 {
                        *val += 1.0;
                    } else {
                        *val -= 1.0;
                    }
                }
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut vector {
                *val /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.compute_embedding(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.compute_embedding(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "simhash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;

    #[tokio::test]
    async fn deterministic() {
        let embedder = HashEmbedder::default_dimension();
        let e1 = embedder.embed("Hindu Marriage Act").await.unwrap();
        let e2 = embedder.embed("Hindu Marriage Act").await.unwrap();
        assert_eq!(e1, e2);
    }

    #[tokio::test]
    async fn case_and_punctuation_insensitive() {
        let embedder = HashEmbedder::default_dimension();
        let e1 = embedder.embed("Section 13, divorce.").await.unwrap();
        let e2 = embedder.embed("section 13 DIVORCE").await.unwrap();
        assert_eq!(e1, e2);
    }

    #[tokio::test]
    async fn dimension_not_multiple_of_64() {
        let embedder = HashEmbedder::new(100);
        let emb = embedder.embed("theft").await.unwrap();
        assert_eq!(emb.len(), 100);
        assert_eq!(embedder.dimension(), 100);
    }

    #[tokio::test]
    async fn unit_length() {
        let embedder = HashEmbedder::default_dimension();
        let emb = embedder.embed("punishment for theft").await.unwrap();
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01, "norm was {norm}");
    }

    #[tokio::test]
    async fn empty_text_is_zero_vector() {
        let embedder = HashEmbedder::default_dimension();
        let emb = embedder.embed("  \n ").await.unwrap();
        assert_eq!(emb.len(), 384);
        assert!(emb.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn shared_tokens_raise_similarity() {
        let embedder = HashEmbedder::default_dimension();
        let a = embedder.embed("grounds for divorce under hindu law").await.unwrap();
        let b = embedder.embed("divorce under hindu law").await.unwrap();
        let c = embedder.embed("bail conditions for cyber fraud").await.unwrap();
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }

    #[tokio::test]
    async fn batch_matches_single() {
        let embedder = HashEmbedder::default_dimension();
        let texts = vec!["theft".to_string(), "cruelty".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch[0], embedder.embed("theft").await.unwrap());
        assert_eq!(batch[1], embedder.embed("cruelty").await.unwrap());
    }
}
