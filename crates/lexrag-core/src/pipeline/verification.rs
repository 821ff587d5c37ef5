//! Hallucination checks on the ranked selection.
//!
//! Each selected candidate is graded for answer relevance and groundedness
//! by the LLM grader; context relevance is graded once per query. The
//! embedding similarity between query and answer decides, together with
//! groundedness, the hallucination class. The report is advisory unless
//! gating is enabled.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, warn};

use lexrag_types::StageError;
use lexrag_types::config::VerificationConfig;
use lexrag_types::model::{
    CandidateVerification, HallucinationClass, RankedSelection, VerificationReport,
};

use super::traits::{Embedder, RelevanceGrader};
use crate::embeddings::cosine_similarity;

static SCORE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn score_pattern() -> Option<&'static Regex> {
    SCORE_PATTERN
        .get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").ok())
        .as_ref()
}

/// First number in a grader answer, clamped to [0, 1]. Anything
/// unparseable scores 0.0.
pub fn parse_score(raw: &str) -> f64 {
    let parsed = score_pattern()
        .and_then(|re| re.find(raw))
        .and_then(|m| m.as_str().parse::<f64>().ok());
    match parsed {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => {
            debug!(
                stage = "verification",
                error = %StageError::VerificationParseFailure { raw: raw.to_string() },
                "grader output scored as 0.0"
            );
            0.0
        }
    }
}

/// Hallucination class from query/answer similarity and groundedness.
pub fn classify_hallucination(
    similarity: f64,
    groundedness: f64,
    config: &VerificationConfig,
) -> HallucinationClass {
    if similarity > config.similarity_threshold {
        if groundedness > config.groundedness_threshold {
            HallucinationClass::None
        } else {
            HallucinationClass::Partial
        }
    } else {
        HallucinationClass::Hallucinated
    }
}

pub struct VerificationStage {
    grader: Arc<dyn RelevanceGrader>,
    embedder: Arc<dyn Embedder>,
    config: VerificationConfig,
}

impl VerificationStage {
    pub fn new(
        grader: Arc<dyn RelevanceGrader>,
        embedder: Arc<dyn Embedder>,
        config: VerificationConfig,
    ) -> Self {
        Self {
            grader,
            embedder,
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn verify(
        &self,
        query: &str,
        selection: &RankedSelection,
        context: &str,
    ) -> VerificationReport {
        if selection.is_empty() {
            return VerificationReport::default();
        }

        let context_relevance = self.graded(self.grader.context_relevance(query, context).await);
        let mut entries = Vec::with_capacity(selection.len());
        for scored in selection.iter() {
            let answer = &scored.candidate.text;
            let answer_relevance = self.graded(self.grader.answer_relevance(query, answer).await);
            let groundedness = self.graded(self.grader.groundedness(context, answer).await);
            let embedding_similarity = self.similarity(query, answer).await;
            let hallucination =
                classify_hallucination(embedding_similarity, groundedness, &self.config);

            debug!(
                stage = "verification",
                candidate = %scored.candidate.id,
                similarity = embedding_similarity,
                groundedness,
                verdict = %hallucination,
                "candidate verified"
            );
            entries.push(CandidateVerification {
                candidate_id: scored.candidate.id.clone(),
                answer_relevance,
                context_relevance,
                groundedness,
                embedding_similarity,
                hallucination,
            });
        }
        VerificationReport { entries }
    }

    fn graded(&self, result: Result<String, lexrag_types::ServiceError>) -> f64 {
        match result {
            Ok(raw) => parse_score(&raw),
            Err(e) => {
                warn!(stage = "verification", error = %e, "grader failed");
                0.0
            }
        }
    }

    async fn similarity(&self, query: &str, answer: &str) -> f64 {
        let texts = [query.to_string(), answer.to_string()];
        match self.embedder.embed_batch(&texts).await {
            Ok(vectors) if vectors.len() == 2 => {
                f64::from(cosine_similarity(&vectors[0], &vectors[1])).clamp(0.0, 1.0)
            }
            Ok(vectors) => {
                warn!(stage = "verification", got = vectors.len(), "unexpected embedding count");
                0.0
            }
            Err(e) => {
                warn!(stage = "verification", error = %e, "embedding failed");
                0.0
            }
        }
    }

    /// Drop hallucinated candidates when gating is enabled.
    pub fn gate(&self, selection: RankedSelection, report: &VerificationReport) -> RankedSelection {
        if !self.config.gate_hallucinated {
            return selection;
        }
        let hallucinated = report.hallucinated_ids();
        let before = selection.len();
        let candidates: Vec<_> = selection
            .candidates
            .into_iter()
            .filter(|c| !hallucinated.contains(&c.candidate.id.as_str()))
            .collect();
        if candidates.len() < before {
            warn!(
                stage = "verification",
                dropped = before - candidates.len(),
                "hallucinated candidates removed"
            );
        }
        RankedSelection { candidates }
    }
}
