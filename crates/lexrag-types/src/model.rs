//! Records passed between pipeline stages.
//!
//! Every stage reads the outputs of its predecessors from these types and
//! writes exactly one new record. Nothing here performs I/O; the stages in
//! `lexrag-core` own all behavior.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Classification ──────────────────────────────────────────────────────

/// Legal domain assigned to a query by the classification stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainClassification {
    /// Private disputes: family, property, contracts, consumer matters.
    Civil,
    /// Offences punishable under criminal statutes.
    Criminal,
    /// Both a civil dispute and a criminal offence are involved.
    Both,
    /// The query is not a legal question.
    NotLegal,
    /// The query incites harm or unethical actions.
    Unsafe,
    /// The query concerns a jurisdiction the corpus does not cover.
    NotApplicable,
    /// Classification was inconclusive or malformed.
    #[default]
    Unknown,
}

impl DomainClassification {
    /// Whether the query may proceed to retrieval.
    pub fn is_admissible(&self) -> bool {
        matches!(self, Self::Civil | Self::Criminal | Self::Both)
    }

    /// The collections that must be searched for this classification.
    pub fn retrieval_domains(&self) -> &'static [LawDomain] {
        match self {
            Self::Civil => &[LawDomain::Civil],
            Self::Criminal => &[LawDomain::Criminal],
            Self::Both => &[LawDomain::Civil, LawDomain::Criminal],
            _ => &[],
        }
    }

    /// Stable snake_case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Civil => "civil",
            Self::Criminal => "criminal",
            Self::Both => "both",
            Self::NotLegal => "not_legal",
            Self::Unsafe => "unsafe",
            Self::NotApplicable => "not_applicable",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DomainClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the two-phase classification stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// The assigned domain.
    pub domain: DomainClassification,

    /// Verbatim message from the admissibility check when the query was
    /// turned away (unsafe, non-legal, foreign law).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
}

impl Classification {
    /// An admissible (or unknown) classification with no rejection text.
    pub fn new(domain: DomainClassification) -> Self {
        Self {
            domain,
            rejection: None,
        }
    }

    /// A rejected classification carrying the checker's message.
    pub fn rejected(domain: DomainClassification, message: impl Into<String>) -> Self {
        Self {
            domain,
            rejection: Some(message.into()),
        }
    }
}

/// A searchable collection of statute text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LawDomain {
    Civil,
    Criminal,
}

impl LawDomain {
    /// Collection name used by retrievers and corpus files.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Civil => "civil",
            Self::Criminal => "criminal",
        }
    }
}

impl fmt::Display for LawDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

impl FromStr for LawDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "civil" | "civil_law" | "general_law" => Ok(Self::Civil),
            "criminal" | "criminal_law" => Ok(Self::Criminal),
            other => Err(format!("unknown law domain: {other}")),
        }
    }
}

// ── Retrieval ───────────────────────────────────────────────────────────

/// A chunk of statute text returned by a retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Passage text.
    pub text: String,

    /// Provenance (document name, section).
    pub source: String,

    /// Collection the passage came from.
    pub domain: LawDomain,

    /// Relevance assigned by the retriever (higher is better).
    #[serde(default)]
    pub score: f32,
}

// ── Generation / evaluation ─────────────────────────────────────────────

/// One generated answer draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Identifier, unique within its batch.
    pub id: String,

    /// Answer text.
    pub text: String,

    /// Citation metadata as produced by the generator.
    #[serde(default)]
    pub citations: String,
}

impl Candidate {
    pub fn new(id: impl Into<String>, text: impl Into<String>, citations: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            citations: citations.into(),
        }
    }

    /// Whether the answer text is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A candidate with its per-metric and composite scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,

    /// Score for every configured metric, keyed by metric name.
    pub per_metric_scores: BTreeMap<String, f64>,

    /// Weighted combination of `per_metric_scores`.
    pub composite_score: f64,

    /// Position of the candidate in the generated batch.
    pub batch_index: usize,
}

/// Top-ranked candidates, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedSelection {
    pub candidates: Vec<ScoredCandidate>,
}

impl RankedSelection {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, rank: usize) -> Option<&ScoredCandidate> {
        self.candidates.get(rank)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredCandidate> {
        self.candidates.iter()
    }
}

// ── Verification ────────────────────────────────────────────────────────

/// Hallucination verdict for a single candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HallucinationClass {
    None,
    Partial,
    Hallucinated,
}

impl fmt::Display for HallucinationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "no hallucination"),
            Self::Partial => write!(f, "partial hallucination"),
            Self::Hallucinated => write!(f, "hallucinated"),
        }
    }
}

/// Relevance and groundedness scores for one selected candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateVerification {
    pub candidate_id: String,
    pub answer_relevance: f64,
    pub context_relevance: f64,
    pub groundedness: f64,
    pub embedding_similarity: f64,
    pub hallucination: HallucinationClass,
}

/// Verification results for the whole selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub entries: Vec<CandidateVerification>,
}

impl VerificationReport {
    /// Look up the verification for a candidate id.
    pub fn for_candidate(&self, id: &str) -> Option<&CandidateVerification> {
        self.entries.iter().find(|e| e.candidate_id == id)
    }

    /// Ids of candidates classified as [`HallucinationClass::Hallucinated`].
    pub fn hallucinated_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.hallucination == HallucinationClass::Hallucinated)
            .map(|e| e.candidate_id.as_str())
            .collect()
    }
}

// ── Summarization ───────────────────────────────────────────────────────

/// Structured summary produced from the ranked selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub query: String,
    pub summary: String,
    #[serde(default)]
    pub citations: Vec<String>,
}

// ── Final response ──────────────────────────────────────────────────────

/// Pipeline stage identifiers, used in logs and failure responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Classification,
    Retrieval,
    Generation,
    Evaluation,
    Verification,
    Summarization,
    Safety,
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Classification => "classification",
            Self::Retrieval => "retrieval",
            Self::Generation => "generation",
            Self::Evaluation => "evaluation",
            Self::Verification => "verification",
            Self::Summarization => "summarization",
            Self::Safety => "safety",
        };
        f.write_str(s)
    }
}

/// Why a query or answer was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    Unsafe,
    NotLegal,
    NotApplicable,
    Unknown,
    PrivacyViolation,
    Toxicity,
    Bias,
}

impl RejectionReason {
    /// The rejection reason that corresponds to an inadmissible domain.
    pub fn from_domain(domain: DomainClassification) -> Self {
        match domain {
            DomainClassification::Unsafe => Self::Unsafe,
            DomainClassification::NotLegal => Self::NotLegal,
            DomainClassification::NotApplicable => Self::NotApplicable,
            _ => Self::Unknown,
        }
    }
}

/// The only artifact returned to the caller.
///
/// Callers that only want text use [`FinalResponse::text`]; the variant tells
/// them whether that text is an answer or an explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FinalResponse {
    /// A sanitized answer. `redacted` is set when anonymization replaced
    /// personal data (the notice is already appended to `text`).
    Answer { text: String, redacted: bool },
    /// The query or the answer was refused.
    Rejected {
        reason: RejectionReason,
        message: String,
    },
    /// A stage could not produce its output.
    Failed { stage: StageName, message: String },
}

impl FinalResponse {
    /// The user-visible text, whatever the outcome.
    pub fn text(&self) -> &str {
        match self {
            Self::Answer { text, .. } => text,
            Self::Rejected { message, .. } => message,
            Self::Failed { message, .. } => message,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Answer { text, .. } => text,
            Self::Rejected { message, .. } => message,
            Self::Failed { message, .. } => message,
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Answer { .. })
    }
}

impl fmt::Display for FinalResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
