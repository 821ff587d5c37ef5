//! Default metric scorers and text classifiers.
//!
//! Lexical metrics compare a candidate answer against the reference text
//! built from the top retrieved passages:
//!
//! - [`BleuScorer`] -- BLEU-4 with add-one smoothing on the 2..4-gram
//!   precisions and the standard brevity penalty.
//! - [`RougeLScorer`] -- F1 over the longest common subsequence.
//! - [`MeteorScorer`] -- unigram F-mean (recall weighted 9:1) with a chunk
//!   fragmentation penalty. Exact matches only; no stemming or synonyms.
//! - [`EmbeddingScorer`] -- cosine similarity of embeddings, clamped to
//!   [0, 1].
//!
//! [`LexiconClassifier`] is the default toxicity/bias classifier: a small
//! weighted phrase list, combined as independent probabilities.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use lexrag_types::ServiceError;

use crate::embeddings::{Embedder, cosine_similarity};
use crate::pipeline::traits::{MetricScorer, TextClassifier};

pub const BLEU: &str = "bleu";
pub const ROUGE_L: &str = "rouge_l";
pub const METEOR: &str = "meteor";
pub const EMBEDDING: &str = "embedding";

/// Lowercased alphanumeric tokens. Everything else separates tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

// ── BLEU ────────────────────────────────────────────────────────────────

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for window in tokens.windows(n) {
            *counts.entry(window).or_insert(0) += 1;
        }
    }
    counts
}

/// Sentence-level BLEU-4 of `candidate` against a single `reference`.
pub fn bleu(reference: &str, candidate: &str) -> f64 {
    let reference = tokenize(reference);
    let candidate = tokenize(candidate);
    if candidate.is_empty() || reference.is_empty() {
        return 0.0;
    }

    let mut log_precision_sum = 0.0;
    for n in 1..=4 {
        let cand_counts = ngram_counts(&candidate, n);
        let ref_counts = ngram_counts(&reference, n);
        let total: usize = cand_counts.values().sum();
        let matched: usize = cand_counts
            .iter()
            .map(|(gram, count)| (*count).min(ref_counts.get(gram).copied().unwrap_or(0)))
            .sum();

        let precision = if n == 1 {
            if matched == 0 {
                return 0.0;
            }
            matched as f64 / total as f64
        } else {
            (matched as f64 + 1.0) / (total as f64 + 1.0)
        };
        log_precision_sum += precision.ln();
    }

    let c = candidate.len() as f64;
    let r = reference.len() as f64;
    let brevity_penalty = if c > r { 1.0 } else { (1.0 - r / c).exp() };

    brevity_penalty * (log_precision_sum / 4.0).exp()
}

// ── ROUGE-L ─────────────────────────────────────────────────────────────

fn lcs_len(a: &[String], b: &[String]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// ROUGE-L F1.
pub fn rouge_l(reference: &str, candidate: &str) -> f64 {
    let reference = tokenize(reference);
    let candidate = tokenize(candidate);
    if candidate.is_empty() || reference.is_empty() {
        return 0.0;
    }
    let lcs = lcs_len(&reference, &candidate) as f64;
    if lcs == 0.0 {
        return 0.0;
    }
    let precision = lcs / candidate.len() as f64;
    let recall = lcs / reference.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

// ── METEOR ──────────────────────────────────────────────────────────────

/// METEOR-style score with exact unigram alignment.
pub fn meteor(reference: &str, candidate: &str) -> f64 {
    let reference = tokenize(reference);
    let candidate = tokenize(candidate);
    if candidate.is_empty() || reference.is_empty() {
        return 0.0;
    }

    // Greedy left-to-right alignment: each candidate token takes the first
    // unused identical reference token.
    let mut used = vec![false; reference.len()];
    let mut alignment: Vec<(usize, usize)> = Vec::new();
    for (ci, token) in candidate.iter().enumerate() {
        if let Some(ri) = reference
            .iter()
            .enumerate()
            .position(|(ri, r)| !used[ri] && r == token)
        {
            used[ri] = true;
            alignment.push((ci, ri));
        }
    }

    let matches = alignment.len() as f64;
    if matches == 0.0 {
        return 0.0;
    }

    let precision = matches / candidate.len() as f64;
    let recall = matches / reference.len() as f64;
    let f_mean = 10.0 * precision * recall / (recall + 9.0 * precision);

    let mut chunks = 1usize;
    for pair in alignment.windows(2) {
        let (c0, r0) = pair[0];
        let (c1, r1) = pair[1];
        if c1 != c0 + 1 || r1 != r0 + 1 {
            chunks += 1;
        }
    }
    let penalty = 0.5 * (chunks as f64 / matches).powi(3);

    f_mean * (1.0 - penalty)
}

// ── Scorer wrappers ─────────────────────────────────────────────────────

pub struct BleuScorer;

#[async_trait]
impl MetricScorer for BleuScorer {
    fn name(&self) -> &str {
        BLEU
    }

    async fn score(&self, reference: &str, candidate: &str) -> Result<f64, ServiceError> {
        Ok(bleu(reference, candidate))
    }
}

pub struct RougeLScorer;

#[async_trait]
impl MetricScorer for RougeLScorer {
    fn name(&self) -> &str {
        ROUGE_L
    }

    async fn score(&self, reference: &str, candidate: &str) -> Result<f64, ServiceError> {
        Ok(rouge_l(reference, candidate))
    }
}

pub struct MeteorScorer;

#[async_trait]
impl MetricScorer for MeteorScorer {
    fn name(&self) -> &str {
        METEOR
    }

    async fn score(&self, reference: &str, candidate: &str) -> Result<f64, ServiceError> {
        Ok(meteor(reference, candidate))
    }
}

/// Cosine similarity of reference and candidate embeddings.
pub struct EmbeddingScorer {
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl MetricScorer for EmbeddingScorer {
    fn name(&self) -> &str {
        EMBEDDING
    }

    async fn score(&self, reference: &str, candidate: &str) -> Result<f64, ServiceError> {
        let texts = [reference.to_string(), candidate.to_string()];
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| ServiceError::Unavailable(format!("embedder {}: {e}", self.embedder.name())))?;
        match vectors.as_slice() {
            [r, c] => Ok(f64::from(cosine_similarity(r, c)).clamp(0.0, 1.0)),
            _ => Err(ServiceError::InvalidOutput(format!(
                "expected 2 embeddings, got {}",
                vectors.len()
            ))),
        }
    }
}

/// Build scorers for the configured metric names, in order.
///
/// Unknown names are skipped with a warning; the evaluation stage scores
/// them 0.0.
pub fn default_scorers(metrics: &[String], embedder: Arc<dyn Embedder>) -> Vec<Arc<dyn MetricScorer>> {
    let mut scorers: Vec<Arc<dyn MetricScorer>> = Vec::new();
    for name in metrics {
        match name.as_str() {
            BLEU => scorers.push(Arc::new(BleuScorer)),
            ROUGE_L => scorers.push(Arc::new(RougeLScorer)),
            METEOR => scorers.push(Arc::new(MeteorScorer)),
            EMBEDDING => scorers.push(Arc::new(EmbeddingScorer::new(Arc::clone(&embedder)))),
            other => warn!(metric = other, "no built-in scorer for metric"),
        }
    }
    scorers
}

// ── Lexicon classifier ──────────────────────────────────────────────────

const TOXIC_TERMS: &[(&str, f64)] = &[
    ("idiot", 0.75),
    ("idiots", 0.75),
    ("stupid", 0.6),
    ("moron", 0.75),
    ("imbecile", 0.75),
    ("scum", 0.8),
    ("bastard", 0.85),
    ("worthless", 0.5),
    ("pathetic", 0.45),
    ("disgusting", 0.45),
    ("shut up", 0.6),
    ("hate you", 0.7),
    ("go to hell", 0.8),
    ("damn", 0.35),
];

const BIAS_TERMS: &[(&str, f64)] = &[
    ("all women are", 0.8),
    ("all men are", 0.8),
    ("women are always", 0.8),
    ("men are always", 0.8),
    ("women can never", 0.8),
    ("inferior caste", 0.85),
    ("lower caste people", 0.8),
    ("naturally inferior", 0.85),
    ("those people", 0.4),
    ("typical of their religion", 0.8),
    ("people like them", 0.45),
    ("never trust a", 0.6),
];

/// Phrase-list classifier.
///
/// Each phrase found in the text (on token boundaries) contributes its
/// weight `w`; the score is `1 - Π(1 - w)`.
pub struct LexiconClassifier {
    name: &'static str,
    terms: Vec<(Vec<String>, f64)>,
}

impl LexiconClassifier {
    pub fn new(name: &'static str, terms: &[(&str, f64)]) -> Self {
        Self {
            name,
            terms: terms
                .iter()
                .map(|(phrase, weight)| (tokenize(phrase), weight.clamp(0.0, 1.0)))
                .filter(|(tokens, _)| !tokens.is_empty())
                .collect(),
        }
    }

    pub fn toxicity() -> Self {
        Self::new("toxicity-lexicon", TOXIC_TERMS)
    }

    pub fn bias() -> Self {
        Self::new("bias-lexicon", BIAS_TERMS)
    }

    fn compute(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let mut clean = 1.0;
        for (phrase, weight) in &self.terms {
            if tokens.windows(phrase.len()).any(|w| w == phrase.as_slice()) {
                clean *= 1.0 - weight;
            }
        }
        1.0 - clean
    }
}

#[async_trait]
impl TextClassifier for LexiconClassifier {
    fn name(&self) -> &str {
        self.name
    }

    async fn score(&self, text: &str) -> Result<f64, ServiceError> {
        Ok(self.compute(text))
    }
}
