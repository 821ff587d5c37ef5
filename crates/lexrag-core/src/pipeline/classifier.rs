//! Two-phase query classification.
//!
//! Phase one asks the backend whether the query may be answered at all
//! (`Safe`, or a sentence explaining why not). Only a `Safe` query reaches
//! phase two, which assigns the legal domain. Backend answers are free text;
//! the mapping below is deliberately forgiving about case, quoting and
//! trailing punctuation.

use std::sync::Arc;

use tracing::{debug, warn};

use lexrag_types::StageError;
use lexrag_types::model::{Classification, DomainClassification};

use super::traits::ClassifierBackend;

/// Rejection text for domain answers of `na`.
pub const NOT_APPLICABLE_MESSAGE: &str = "Not Applicable in Indian Law.";

/// Classification stage.
pub struct ClassificationStage {
    backend: Arc<dyn ClassifierBackend>,
}

impl ClassificationStage {
    pub fn new(backend: Arc<dyn ClassifierBackend>) -> Self {
        Self { backend }
    }

    /// Classify `query`. Never fails: anything inconclusive is `Unknown`.
    pub async fn classify(&self, query: &str) -> Classification {
        if query.trim().is_empty() {
            debug!(stage = "classification", "blank query");
            return Classification::new(DomainClassification::Unknown);
        }

        let verdict = match self.backend.check_admissibility(query).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(stage = "classification", error = %e, "admissibility check failed");
                return Classification::new(DomainClassification::Unknown);
            }
        };

        match map_admissibility(&verdict) {
            Admissibility::Safe => {}
            Admissibility::Rejected(domain) => {
                debug!(stage = "classification", domain = %domain, "query rejected");
                return Classification::rejected(domain, verdict.trim());
            }
            Admissibility::Unclear => {
                warn!(
                    stage = "classification",
                    error = %StageError::ClassificationUnclear { raw: verdict.clone() },
                    "unrecognized admissibility verdict"
                );
                return Classification::new(DomainClassification::Unknown);
            }
        }

        let label = match self.backend.classify_domain(query).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(stage = "classification", error = %e, "domain classification failed");
                return Classification::new(DomainClassification::Unknown);
            }
        };

        let domain = map_domain(&label);
        debug!(stage = "classification", domain = %domain, raw = %label.trim(), "domain assigned");
        match domain {
            DomainClassification::NotApplicable => {
                Classification::rejected(domain, NOT_APPLICABLE_MESSAGE)
            }
            DomainClassification::Unknown => {
                warn!(
                    stage = "classification",
                    error = %StageError::ClassificationUnclear { raw: label },
                    "unrecognized domain label"
                );
                Classification::new(domain)
            }
            _ => Classification::new(domain),
        }
    }
}

/// Outcome of the admissibility phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admissibility {
    Safe,
    Rejected(DomainClassification),
    Unclear,
}

fn normalize(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .trim_end_matches('.')
        .to_lowercase()
}

/// Map an admissibility verdict.
pub fn map_admissibility(raw: &str) -> Admissibility {
    let verdict = normalize(raw);
    if verdict == "safe" {
        return Admissibility::Safe;
    }
    if verdict.contains("harm") || verdict.contains("unethical") {
        Admissibility::Rejected(DomainClassification::Unsafe)
    } else if verdict.contains("not a legal") {
        Admissibility::Rejected(DomainClassification::NotLegal)
    } else if verdict.contains("not applicable") {
        Admissibility::Rejected(DomainClassification::NotApplicable)
    } else {
        Admissibility::Unclear
    }
}

/// Map a domain label.
pub fn map_domain(raw: &str) -> DomainClassification {
    let label = normalize(raw);
    match label.as_str() {
        "civil_law" | "civil" | "general_law" => DomainClassification::Civil,
        "criminal_law" | "criminal" => DomainClassification::Criminal,
        "both" => DomainClassification::Both,
        "na" | "n/a" => DomainClassification::NotApplicable,
        other if other.contains("not applicable") => DomainClassification::NotApplicable,
        _ => DomainClassification::Unknown,
    }
}
