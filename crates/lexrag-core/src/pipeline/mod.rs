//! Seven-stage legal question-answering pipeline.
//!
//! Stages: Classification -> Retrieval -> Generation -> Evaluation ->
//! Verification -> Summarization -> Safety
//!
//! Stages run strictly in sequence for one query. A [`Pipeline`] holds no
//! per-query state, so many queries can run through it concurrently.

pub mod classifier;
pub mod evaluation;
pub mod generation;
pub mod llm_adapter;
pub mod prompts;
pub mod retrieval;
pub mod safety;
pub mod state;
pub mod summarizer;
pub mod traits;
pub mod verification;

use std::sync::Arc;

use tracing::{info, warn};

use lexrag_security::Anonymized;
use lexrag_types::StageError;
use lexrag_types::config::{Config, PipelineConfig, UnknownPolicy};
use lexrag_types::model::{
    Classification, DomainClassification, FinalResponse, RejectionReason, StageName,
};

use self::classifier::ClassificationStage;
use self::evaluation::{EvaluationStage, build_reference_text, select_top_k};
use self::generation::GenerationStage;
use self::retrieval::{RetrievalStage, context_text};
use self::safety::{SafetyOutcome, SafetyStage};
use self::summarizer::{NO_VALID_RESPONSES, SUMMARIZATION_FAILED, SummarizationStage};
use self::traits::{
    ClassifierBackend, Detoxifier, Embedder, EntityRecognizer, Generator, MetricScorer,
    RelevanceGrader, Retriever, Summarizer, TextClassifier,
};
use self::verification::VerificationStage;

pub use self::state::PipelineState;

/// Returned when classification is inconclusive and the policy is `reject`.
pub const UNKNOWN_DOMAIN_MESSAGE: &str = "Unable to determine the legal domain of this query. Please rephrase it as a question about Indian civil or criminal law.";

/// Returned when retrieval finds nothing.
pub const INSUFFICIENT_INFORMATION: &str =
    "Insufficient information: no relevant legal provisions were found for this query.";

/// External collaborators, one per role.
pub struct PipelineServices {
    pub classifier: Arc<dyn ClassifierBackend>,
    pub retriever: Arc<dyn Retriever>,
    pub generator: Arc<dyn Generator>,
    pub scorers: Vec<Arc<dyn MetricScorer>>,
    pub grader: Arc<dyn RelevanceGrader>,
    pub embedder: Arc<dyn Embedder>,
    pub summarizer: Arc<dyn Summarizer>,
    pub recognizer: Arc<dyn EntityRecognizer>,
    pub toxicity: Arc<dyn TextClassifier>,
    pub bias: Arc<dyn TextClassifier>,
    pub detoxifier: Arc<dyn Detoxifier>,
}

/// The assembled pipeline.
pub struct Pipeline {
    classification: ClassificationStage,
    retrieval: RetrievalStage,
    generation: GenerationStage,
    evaluation: EvaluationStage,
    verification: VerificationStage,
    summarization: SummarizationStage,
    safety: SafetyStage,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(services: PipelineServices, config: &Config) -> Self {
        let pipeline = &config.pipeline;
        Self {
            classification: ClassificationStage::new(services.classifier),
            retrieval: RetrievalStage::new(services.retriever, pipeline.retrieval_top_k),
            generation: GenerationStage::new(services.generator, pipeline.batch_size),
            evaluation: EvaluationStage::new(services.scorers, pipeline),
            verification: VerificationStage::new(
                services.grader,
                services.embedder,
                pipeline.verification.clone(),
            ),
            summarization: SummarizationStage::new(services.summarizer),
            safety: SafetyStage::new(
                services.recognizer,
                services.toxicity,
                services.bias,
                services.detoxifier,
                config.safety.clone(),
            ),
            config: pipeline.clone(),
        }
    }

    /// Answer `query`.
    pub async fn run(&self, query: &str) -> FinalResponse {
        self.run_with_state(query).await.into_final_response()
    }

    /// Answer `query` and return every intermediate result.
    pub async fn run_with_state(&self, query: &str) -> PipelineState {
        let mut state = PipelineState::new(query);
        self.drive(&mut state).await;
        if let Some(response) = &state.final_response {
            info!(
                stages = state.stages_run.len(),
                answered = response.is_answer(),
                "pipeline finished"
            );
        }
        state
    }

    /// Run only the classification stage.
    pub async fn classify(&self, query: &str) -> Classification {
        self.classification.classify(query).await
    }

    /// Run only the anonymizer of the safety stage.
    pub async fn anonymize(&self, text: &str) -> Anonymized {
        self.safety.anonymize(text).await
    }

    async fn drive(&self, state: &mut PipelineState) {
        let query = state.query.clone();

        // Classification
        state.enter(StageName::Classification);
        let classification = self.classification.classify(&query).await;
        state.classification = Some(classification.clone());
        let Some(domain) = self.admitted_domain(&classification, state) else {
            return;
        };

        // Retrieval
        state.enter(StageName::Retrieval);
        let passages = self.retrieval.retrieve(&query, domain).await;
        if passages.is_empty() {
            let err = StageError::RetrievalEmpty {
                domain: domain.to_string(),
            };
            warn!(stage = "retrieval", error = %err, "stopping");
            state.passages = Some(passages);
            state.finish(FinalResponse::Failed {
                stage: StageName::Retrieval,
                message: INSUFFICIENT_INFORMATION.into(),
            });
            return;
        }
        let context = context_text(&passages);
        let reference = build_reference_text(&passages, self.config.reference_passages);
        state.passages = Some(passages);
        state.context = Some(context.clone());

        // Generation
        state.enter(StageName::Generation);
        let candidates = self.generation.generate(&query, &context).await;

        // Evaluation
        state.enter(StageName::Evaluation);
        let scored = self.evaluation.evaluate(&candidates, &reference).await;
        let mut selection = select_top_k(scored.clone(), self.config.select_top_k);
        state.candidates = Some(candidates);
        state.scored = Some(scored);
        state.reference_text = Some(reference.clone());

        // Verification
        if self.verification.is_enabled() && !selection.is_empty() {
            state.enter(StageName::Verification);
            let report = self.verification.verify(&query, &selection, &reference).await;
            selection = self.verification.gate(selection, &report);
            state.verification = Some(report);
        }
        state.selection = Some(selection.clone());

        // Summarization
        state.enter(StageName::Summarization);
        if selection.is_empty() {
            warn!(stage = "summarization", "no candidates survived ranking");
            state.finish(FinalResponse::Failed {
                stage: StageName::Summarization,
                message: NO_VALID_RESPONSES.into(),
            });
            return;
        }
        let summary = match self.summarization.summarize(&query, &selection, &context).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(stage = "summarization", error = %e, "stopping");
                state.finish(FinalResponse::Failed {
                    stage: StageName::Summarization,
                    message: SUMMARIZATION_FAILED.into(),
                });
                return;
            }
        };
        let answer = summary.summary.clone();
        state.summary = Some(summary);

        // Safety
        state.enter(StageName::Safety);
        let response = match self.safety.sanitize(&answer).await {
            SafetyOutcome::Passed { text, redacted } => FinalResponse::Answer { text, redacted },
            SafetyOutcome::Rejected { reason, message } => {
                FinalResponse::Rejected { reason, message }
            }
        };
        state.finish(response);
    }

    /// The domain to search, or `None` after recording a rejection.
    fn admitted_domain(
        &self,
        classification: &Classification,
        state: &mut PipelineState,
    ) -> Option<DomainClassification> {
        let domain = classification.domain;
        if domain.is_admissible() {
            return Some(domain);
        }

        if domain == DomainClassification::Unknown {
            if self.config.unknown_policy == UnknownPolicy::Degrade {
                info!(
                    stage = "classification",
                    fallback = %self.config.fallback_domain,
                    "unknown domain, continuing with fallback"
                );
                return Some(self.config.fallback_domain);
            }
            state.finish(FinalResponse::Rejected {
                reason: RejectionReason::Unknown,
                message: UNKNOWN_DOMAIN_MESSAGE.into(),
            });
            return None;
        }

        let message = classification
            .rejection
            .clone()
            .unwrap_or_else(|| UNKNOWN_DOMAIN_MESSAGE.to_string());
        info!(stage = "classification", domain = %domain, "query rejected");
        state.finish(FinalResponse::Rejected {
            reason: RejectionReason::from_domain(domain),
            message,
        });
        None
    }
}
