//! Collaborator trait definitions.
//!
//! Every external service the pipeline consults sits behind one of these
//! traits. The stages own all decoding and fallback behavior, so most
//! collaborators hand back raw text exactly as the backing model produced
//! it.
//!
//! | Trait | Used by | Returns |
//! |-------|---------|---------|
//! | [`ClassifierBackend`] | classification | raw verdict / label |
//! | [`Retriever`] | retrieval | ranked passages |
//! | [`Generator`] | generation | raw batch text (JSON array expected) |
//! | [`MetricScorer`] | evaluation | score in [0, 1] |
//! | [`RelevanceGrader`] | verification | raw grader text |
//! | [`Embedder`] | evaluation, verification, retrieval | vectors |
//! | [`Summarizer`] | summarization | raw summary text (JSON object expected) |
//! | [`EntityRecognizer`] | safety | entities |
//! | [`TextClassifier`] | safety (toxicity, bias) | score in [0, 1] |
//! | [`Detoxifier`] | safety | rewritten text |
//!
//! All traits are `Send + Sync` and used behind `Arc<dyn _>`.

use async_trait::async_trait;

use lexrag_security::Entity;
use lexrag_types::ServiceError;
use lexrag_types::model::{LawDomain, RetrievedPassage};

pub use crate::embeddings::Embedder;

/// Two-phase query classifier.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Admissibility verdict: `Safe`, or a sentence explaining why the query
    /// cannot be answered.
    async fn check_admissibility(&self, query: &str) -> Result<String, ServiceError>;

    /// Domain label: `civil_law`, `criminal_law`, `both` or `na`.
    async fn classify_domain(&self, query: &str) -> Result<String, ServiceError>;
}

/// Passage retrieval over one statute collection.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `top_k` passages from `domain`, most relevant first.
    async fn retrieve(
        &self,
        query: &str,
        domain: LawDomain,
        top_k: usize,
    ) -> Result<Vec<RetrievedPassage>, ServiceError>;
}

/// Candidate answer generator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a batch of `n` candidate answers for `query` grounded in
    /// `context`. The output should be a JSON array of objects with
    /// `response_id`, `response` and `citations` fields.
    async fn generate(&self, query: &str, context: &str, n: usize)
    -> Result<String, ServiceError>;
}

/// One evaluation metric.
#[async_trait]
pub trait MetricScorer: Send + Sync {
    /// Metric name, matched against the configured metric list.
    fn name(&self) -> &str;

    /// Score `candidate` against `reference`. Values outside [0, 1] are
    /// clamped by the evaluation stage.
    async fn score(&self, reference: &str, candidate: &str) -> Result<f64, ServiceError>;
}

/// LLM-as-judge grader for the verification stage.
///
/// Each method returns the grader's raw answer; the stage extracts the score.
#[async_trait]
pub trait RelevanceGrader: Send + Sync {
    /// How relevant `answer` is to `query`.
    async fn answer_relevance(&self, query: &str, answer: &str) -> Result<String, ServiceError>;

    /// How relevant the retrieved `context` is to `query`.
    async fn context_relevance(&self, query: &str, context: &str)
    -> Result<String, ServiceError>;

    /// How well `answer` is supported by `context`.
    async fn groundedness(&self, context: &str, answer: &str) -> Result<String, ServiceError>;
}

/// One ranked answer handed to the summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarySlot {
    pub text: String,
    pub citations: String,
}

impl SummarySlot {
    /// Placeholder for a missing rank.
    pub fn not_found() -> Self {
        Self {
            text: "Not Found".into(),
            citations: "Not Found".into(),
        }
    }
}

/// Merges the two best answers into one summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Output should be a JSON object `{query, summary, citations}`.
    async fn summarize(
        &self,
        query: &str,
        first: &SummarySlot,
        second: &SummarySlot,
        context: &str,
    ) -> Result<String, ServiceError>;
}

/// Named-entity recognizer used for anonymization.
#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    async fn recognize(&self, text: &str) -> Result<Vec<Entity>, ServiceError>;
}

/// A scalar text classifier (toxicity or bias probability).
#[async_trait]
pub trait TextClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Probability in [0, 1] that `text` belongs to the flagged class.
    async fn score(&self, text: &str) -> Result<f64, ServiceError>;
}

/// Rewrites text to remove toxic or biased language.
#[async_trait]
pub trait Detoxifier: Send + Sync {
    async fn detoxify(&self, text: &str) -> Result<String, ServiceError>;
}
