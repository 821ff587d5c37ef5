//! Error types for the lexrag pipeline.
//!
//! - [`LexragError`] covers setup failures (configuration, I/O, corpus
//!   loading) that happen before a query ever reaches the pipeline.
//! - [`ServiceError`] is returned by external collaborators (LLM backends,
//!   retrievers, classifiers).
//! - [`StageError`] is the stage-level taxonomy. Stages absorb the
//!   recoverable variants with a safe default and turn the terminal ones
//!   into a failure response; none of them escape `Pipeline::run`.

use thiserror::Error;

use crate::model::StageName;

/// Top-level error type for lexrag setup and tooling.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LexragError {
    /// Configuration is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The passage corpus could not be loaded.
    #[error("corpus error: {0}")]
    Corpus(String),

    /// A collaborator failed outside of a pipeline run.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reported by external collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ServiceError {
    /// The backing service (usually an LLM provider) failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// The service answered, but the answer was unusable.
    #[error("invalid output: {0}")]
    InvalidOutput(String),

    /// A required resource (model, collection, lexicon) is not available.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Stage-level failure taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    /// The classifier produced something outside the known labels.
    #[error("classification unclear: {raw}")]
    ClassificationUnclear { raw: String },

    /// No passages were found for the query.
    #[error("retrieval returned no passages for domain {domain}")]
    RetrievalEmpty { domain: String },

    /// The generator's batch could not be decoded.
    #[error("malformed generation batch: {reason}")]
    GenerationMalformed { reason: String },

    /// One metric could not be computed. Non-fatal.
    #[error("metric {metric} unavailable: {reason}")]
    EvaluationMetricUnavailable { metric: String, reason: String },

    /// A grader answer could not be parsed. Non-fatal.
    #[error("verification output unparseable: {raw}")]
    VerificationParseFailure { raw: String },

    /// The summarizer's output was not a valid summary record.
    #[error("malformed summary: {reason}")]
    SummarizationMalformed { reason: String },

    /// The safety pipeline refused the text.
    #[error("safety rejected: {reason}")]
    SafetyRejected { reason: String },
}

impl StageError {
    /// The stage that raises this error.
    pub fn stage(&self) -> StageName {
        match self {
            Self::ClassificationUnclear { .. } => StageName::Classification,
            Self::RetrievalEmpty { .. } => StageName::Retrieval,
            Self::GenerationMalformed { .. } => StageName::Generation,
            Self::EvaluationMetricUnavailable { .. } => StageName::Evaluation,
            Self::VerificationParseFailure { .. } => StageName::Verification,
            Self::SummarizationMalformed { .. } => StageName::Summarization,
            Self::SafetyRejected { .. } => StageName::Safety,
        }
    }

    /// Whether the pipeline must stop when this error occurs.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::ClassificationUnclear { .. }
                | Self::EvaluationMetricUnavailable { .. }
                | Self::VerificationParseFailure { .. }
        )
    }
}

/// A convenience result type for lexrag setup operations.
pub type Result<T> = std::result::Result<T, LexragError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_display() {
        let err = LexragError::ConfigInvalid {
            reason: "select_top_k must be at least 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config: select_top_k must be at least 1"
        );
    }

    #[test]
    fn service_error_is_transparent() {
        let err: LexragError = ServiceError::Provider("timeout".into()).into();
        assert_eq!(err.to_string(), "provider error: timeout");
    }

    #[test]
    fn json_error_converts() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: LexragError = bad.into();
        assert!(err.to_string().starts_with("json error:"));
    }

    #[test]
    fn stage_errors_know_their_stage() {
        let err = StageError::RetrievalEmpty {
            domain: "criminal".into(),
        };
        assert_eq!(err.stage(), StageName::Retrieval);
        assert!(err.is_terminal());
    }

    #[test]
    fn recoverable_stage_errors() {
        let metric = StageError::EvaluationMetricUnavailable {
            metric: "bleu".into(),
            reason: "lexicon missing".into(),
        };
        let parse = StageError::VerificationParseFailure { raw: "n/a".into() };
        assert!(!metric.is_terminal());
        assert!(!parse.is_terminal());
        assert_eq!(
            metric.to_string(),
            "metric bleu unavailable: lexicon missing"
        );
    }
}
