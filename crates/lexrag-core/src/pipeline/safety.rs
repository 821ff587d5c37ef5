//! Responsible-AI checks on the final answer.
//!
//! Order of checks:
//!
//! 1. Anonymize recognized entities.
//! 2. Reject if any privacy pattern still matches.
//! 3. Toxicity, then bias: above threshold, the text gets one
//!    detoxification pass and is re-scored. Still above threshold rejects.
//!
//! Classifier failures score 0.0 (the check passes). A failed
//! detoxification rejects.

use std::sync::Arc;

use tracing::{debug, info, warn};

use lexrag_security::{Anonymized, Anonymizer, PrivacyScanner};
use lexrag_types::StageError;
use lexrag_types::config::SafetyConfig;
use lexrag_types::model::RejectionReason;

use super::traits::{Detoxifier, EntityRecognizer, TextClassifier};

pub const PRIVACY_VIOLATION: &str = "Privacy Violation: The generated response contains sensitive private information and cannot be displayed.";
pub const TOXICITY_REJECTED: &str = "Toxicity Rejected: The generated response remains toxic after detoxification and cannot be displayed.";
pub const BIAS_REJECTED: &str = "Bias Rejected: The generated response contains significant bias and cannot be displayed.";

/// Result of [`SafetyStage::sanitize`].
#[derive(Debug, Clone, PartialEq)]
pub enum SafetyOutcome {
    /// The text may be shown. `redacted` answers carry the notice already.
    Passed { text: String, redacted: bool },
    Rejected {
        reason: RejectionReason,
        message: String,
    },
}

impl SafetyOutcome {
    fn rejected(reason: RejectionReason, message: &str) -> Self {
        let err = StageError::SafetyRejected {
            reason: format!("{reason:?}"),
        };
        info!(stage = "safety", error = %err, "answer withheld");
        Self::Rejected {
            reason,
            message: message.to_string(),
        }
    }
}

pub struct SafetyStage {
    recognizer: Arc<dyn EntityRecognizer>,
    toxicity: Arc<dyn TextClassifier>,
    bias: Arc<dyn TextClassifier>,
    detoxifier: Arc<dyn Detoxifier>,
    scanner: PrivacyScanner,
    anonymizer: Anonymizer,
    config: SafetyConfig,
}

impl SafetyStage {
    pub fn new(
        recognizer: Arc<dyn EntityRecognizer>,
        toxicity: Arc<dyn TextClassifier>,
        bias: Arc<dyn TextClassifier>,
        detoxifier: Arc<dyn Detoxifier>,
        config: SafetyConfig,
    ) -> Self {
        Self {
            recognizer,
            toxicity,
            bias,
            detoxifier,
            scanner: PrivacyScanner::new(),
            anonymizer: Anonymizer::new(),
            config,
        }
    }

    /// Replace recognized entities in `text` with placeholders.
    ///
    /// A recognizer failure leaves the text unchanged.
    pub async fn anonymize(&self, text: &str) -> Anonymized {
        let entities = match self.recognizer.recognize(text).await {
            Ok(entities) => entities,
            Err(e) => {
                warn!(stage = "safety", error = %e, "entity recognition failed");
                Vec::new()
            }
        };
        let result = self.anonymizer.anonymize(text, &entities);
        debug!(
            stage = "safety",
            entities = entities.len(),
            redacted = result.redacted,
            "anonymized"
        );
        result
    }

    /// Run every check on `text`.
    pub async fn sanitize(&self, text: &str) -> SafetyOutcome {
        let Anonymized { text, redacted } = self.anonymize(text).await;

        if let Some(outcome) = self.privacy_check(&text) {
            return outcome;
        }

        let text = match self
            .moderate(
                text,
                &self.toxicity,
                self.config.toxicity_threshold,
                RejectionReason::Toxicity,
                TOXICITY_REJECTED,
            )
            .await
        {
            Ok(text) => text,
            Err(outcome) => return outcome,
        };
        let text = match self
            .moderate(
                text,
                &self.bias,
                self.config.bias_threshold,
                RejectionReason::Bias,
                BIAS_REJECTED,
            )
            .await
        {
            Ok(text) => text,
            Err(outcome) => return outcome,
        };

        let text = if redacted {
            format!("{text}{}", self.config.redaction_notice)
        } else {
            text
        };
        SafetyOutcome::Passed { text, redacted }
    }

    fn privacy_check(&self, text: &str) -> Option<SafetyOutcome> {
        let findings = self.scanner.scan(text);
        if findings.is_empty() {
            return None;
        }
        for finding in &findings {
            warn!(
                stage = "safety",
                check = %finding.check_id,
                category = %finding.category,
                "privacy pattern matched"
            );
        }
        Some(SafetyOutcome::rejected(
            RejectionReason::PrivacyViolation,
            PRIVACY_VIOLATION,
        ))
    }

    /// Score `text`; above `threshold`, detoxify once and re-score.
    async fn moderate(
        &self,
        text: String,
        classifier: &Arc<dyn TextClassifier>,
        threshold: f64,
        reason: RejectionReason,
        message: &str,
    ) -> Result<String, SafetyOutcome> {
        let score = self.classify(classifier, &text).await;
        if score <= threshold {
            return Ok(text);
        }

        info!(
            stage = "safety",
            classifier = classifier.name(),
            score,
            threshold,
            "detoxifying"
        );
        let rewritten = match self.detoxifier.detoxify(&text).await {
            Ok(rewritten) => rewritten,
            Err(e) => {
                warn!(stage = "safety", error = %e, "detoxification failed");
                return Err(SafetyOutcome::rejected(reason, message));
            }
        };

        if let Some(outcome) = self.privacy_check(&rewritten) {
            return Err(outcome);
        }
        let rescored = self.classify(classifier, &rewritten).await;
        if rescored > threshold {
            return Err(SafetyOutcome::rejected(reason, message));
        }
        Ok(rewritten)
    }

    async fn classify(&self, classifier: &Arc<dyn TextClassifier>, text: &str) -> f64 {
        match classifier.score(text).await {
            Ok(score) if score.is_finite() => score.clamp(0.0, 1.0),
            Ok(_) => 0.0,
            Err(e) => {
                warn!(
                    stage = "safety",
                    classifier = classifier.name(),
                    error = %e,
                    "classifier failed, treating as clean"
                );
                0.0
            }
        }
    }
}
