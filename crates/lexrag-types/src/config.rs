//! Configuration schema types.
//!
//! All structs accept both `snake_case` and `camelCase` field names in JSON
//! via `#[serde(alias)]`. Every field has a default, so an empty object (or
//! no config file at all) yields a working configuration. Unknown fields are
//! silently ignored.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LexragError, Result};
use crate::model::DomainClassification;

/// Shared default function: returns `true`.
pub(crate) fn default_true() -> bool {
    true
}

// ── Root config ──────────────────────────────────────────────────────────

/// Root configuration for lexrag.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider endpoint and credentials.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Model identifiers for each LLM-backed collaborator.
    #[serde(default)]
    pub models: ModelsConfig,

    /// Stage parameters.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Responsible-AI thresholds.
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Passage corpus and embedding settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Config {
    /// Default location of the user config file (`~/.lexrag/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".lexrag").join("config.json"))
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let p = &self.pipeline;
        if p.batch_size == 0 {
            return Err(invalid("pipeline.batch_size must be at least 1"));
        }
        if p.select_top_k == 0 {
            return Err(invalid("pipeline.select_top_k must be at least 1"));
        }
        if p.retrieval_top_k == 0 {
            return Err(invalid("pipeline.retrieval_top_k must be at least 1"));
        }
        if p.metric_weights.values().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(invalid("pipeline.metric_weights must be finite and non-negative"));
        }
        if !p.fallback_domain.is_admissible() {
            return Err(invalid(
                "pipeline.fallback_domain must be civil, criminal or both",
            ));
        }
        for (name, value) in [
            ("safety.toxicity_threshold", self.safety.toxicity_threshold),
            ("safety.bias_threshold", self.safety.bias_threshold),
            (
                "pipeline.verification.similarity_threshold",
                p.verification.similarity_threshold,
            ),
            (
                "pipeline.verification.groundedness_threshold",
                p.verification.groundedness_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(&format!("{name} must be within [0, 1]")));
            }
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> LexragError {
    LexragError::ConfigInvalid {
        reason: reason.to_string(),
    }
}

// ── Provider ─────────────────────────────────────────────────────────────

/// OpenAI-compatible endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name used in logs.
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// Base URL of the chat-completion API.
    #[serde(default = "default_base_url", alias = "baseUrl")]
    pub base_url: String,

    /// Environment variable holding the API key. Empty for keyless local
    /// servers.
    #[serde(default = "default_api_key_env", alias = "apiKeyEnv")]
    pub api_key_env: String,

    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request timeout in seconds.
    #[serde(default, alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

fn default_provider_name() -> String {
    "openai".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            headers: HashMap::new(),
            timeout_secs: None,
        }
    }
}

// ── Models ───────────────────────────────────────────────────────────────

/// Model identifiers per collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_small_model")]
    pub classifier: String,

    #[serde(default = "default_large_model")]
    pub generator: String,

    #[serde(default = "default_small_model")]
    pub grader: String,

    #[serde(default = "default_large_model")]
    pub summarizer: String,

    #[serde(default = "default_small_model")]
    pub detoxifier: String,

    #[serde(default = "default_small_model")]
    pub recognizer: String,

    /// Sampling temperature shared by all calls.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_small_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_large_model() -> String {
    "gpt-4".into()
}
fn default_temperature() -> f64 {
    0.1
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            classifier: default_small_model(),
            generator: default_large_model(),
            grader: default_small_model(),
            summarizer: default_large_model(),
            detoxifier: default_small_model(),
            recognizer: default_small_model(),
            temperature: default_temperature(),
        }
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────

/// What to do when classification is inconclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Stop and return the "unable to determine" message.
    #[default]
    Reject,
    /// Log and continue with [`PipelineConfig::fallback_domain`].
    Degrade,
}

/// Stage parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Passages requested per collection.
    #[serde(default = "default_retrieval_top_k", alias = "retrievalTopK")]
    pub retrieval_top_k: usize,

    /// Candidates requested from the generator.
    #[serde(default = "default_batch_size", alias = "batchSize")]
    pub batch_size: usize,

    /// Candidates kept after ranking.
    #[serde(default = "default_select_top_k", alias = "selectTopK")]
    pub select_top_k: usize,

    /// Leading passages joined into the evaluation reference text.
    #[serde(default = "default_reference_passages", alias = "referencePassages")]
    pub reference_passages: usize,

    /// Metric names, in evaluation order.
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,

    /// Per-metric weights. Metrics without an entry weigh 1.0.
    #[serde(default, alias = "metricWeights")]
    pub metric_weights: BTreeMap<String, f64>,

    /// Handling of `unknown` classifications.
    #[serde(default, alias = "unknownPolicy")]
    pub unknown_policy: UnknownPolicy,

    /// Domain searched when `unknown_policy` is `degrade`.
    #[serde(default = "default_fallback_domain", alias = "fallbackDomain")]
    pub fallback_domain: DomainClassification,

    /// Verification stage settings.
    #[serde(default)]
    pub verification: VerificationConfig,
}

fn default_retrieval_top_k() -> usize {
    5
}
fn default_batch_size() -> usize {
    4
}
fn default_select_top_k() -> usize {
    2
}
fn default_reference_passages() -> usize {
    2
}
fn default_metrics() -> Vec<String> {
    ["bleu", "rouge_l", "meteor", "embedding"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}
fn default_fallback_domain() -> DomainClassification {
    DomainClassification::Both
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retrieval_top_k: default_retrieval_top_k(),
            batch_size: default_batch_size(),
            select_top_k: default_select_top_k(),
            reference_passages: default_reference_passages(),
            metrics: default_metrics(),
            metric_weights: BTreeMap::new(),
            unknown_policy: UnknownPolicy::default(),
            fallback_domain: default_fallback_domain(),
            verification: VerificationConfig::default(),
        }
    }
}

/// Verification stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Run the verification stage at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Query/answer similarity above which an answer counts as on-topic.
    #[serde(default = "default_hallucination_threshold", alias = "similarityThreshold")]
    pub similarity_threshold: f64,

    /// Groundedness above which an answer counts as supported.
    #[serde(default = "default_hallucination_threshold", alias = "groundednessThreshold")]
    pub groundedness_threshold: f64,

    /// Drop hallucinated candidates before summarization.
    #[serde(default, alias = "gateHallucinated")]
    pub gate_hallucinated: bool,
}

fn default_hallucination_threshold() -> f64 {
    0.7
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_threshold: default_hallucination_threshold(),
            groundedness_threshold: default_hallucination_threshold(),
            gate_hallucinated: false,
        }
    }
}

// ── Safety ───────────────────────────────────────────────────────────────

/// Responsible-AI thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_toxicity_threshold", alias = "toxicityThreshold")]
    pub toxicity_threshold: f64,

    #[serde(default = "default_bias_threshold", alias = "biasThreshold")]
    pub bias_threshold: f64,

    /// Appended to answers that had personal data redacted.
    #[serde(default = "default_redaction_notice", alias = "redactionNotice")]
    pub redaction_notice: String,
}

fn default_toxicity_threshold() -> f64 {
    0.7
}
fn default_bias_threshold() -> f64 {
    0.75
}
fn default_redaction_notice() -> String {
    "\n\n(Note: Some sensitive information has been anonymized.)".into()
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            toxicity_threshold: default_toxicity_threshold(),
            bias_threshold: default_bias_threshold(),
            redaction_notice: default_redaction_notice(),
        }
    }
}

// ── Retrieval ────────────────────────────────────────────────────────────

/// Passage corpus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// JSON corpus file (`{"civil": [...], "criminal": [...]}`).
    #[serde(default, alias = "corpusPath")]
    pub corpus_path: Option<PathBuf>,

    /// Dimension of the local hash embedder.
    #[serde(default = "default_embedding_dimension", alias = "embeddingDimension")]
    pub embedding_dimension: usize,
}

fn default_embedding_dimension() -> usize {
    384
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            corpus_path: None,
            embedding_dimension: default_embedding_dimension(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.pipeline.batch_size, 4);
        assert_eq!(cfg.pipeline.select_top_k, 2);
        assert_eq!(cfg.pipeline.retrieval_top_k, 5);
        assert_eq!(cfg.pipeline.reference_passages, 2);
        assert_eq!(cfg.pipeline.unknown_policy, UnknownPolicy::Reject);
        assert_eq!(cfg.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(cfg.models.generator, "gpt-4");
        assert!(cfg.pipeline.verification.enabled);
        assert!(!cfg.pipeline.verification.gate_hallucinated);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn camel_case_aliases_accepted() {
        let json = r#"{
            "pipeline": {"batchSize": 6, "selectTopK": 3, "unknownPolicy": "degrade",
                         "fallbackDomain": "civil", "metricWeights": {"bleu": 2.0}},
            "safety": {"toxicityThreshold": 0.5},
            "provider": {"baseUrl": "http://localhost:8080/v1"}
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.pipeline.batch_size, 6);
        assert_eq!(cfg.pipeline.select_top_k, 3);
        assert_eq!(cfg.pipeline.unknown_policy, UnknownPolicy::Degrade);
        assert_eq!(cfg.pipeline.fallback_domain, DomainClassification::Civil);
        assert_eq!(cfg.pipeline.metric_weights.get("bleu"), Some(&2.0));
        assert!((cfg.safety.toxicity_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn default_metrics_cover_four_scorers() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.metrics, vec!["bleu", "rouge_l", "meteor", "embedding"]);
    }

    #[test]
    fn validate_rejects_zero_batch() {
        let mut cfg = Config::default();
        cfg.pipeline.batch_size = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn validate_rejects_inadmissible_fallback() {
        let mut cfg = Config::default();
        cfg.pipeline.fallback_domain = DomainClassification::Unsafe;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut cfg = Config::default();
        cfg.safety.bias_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_weight() {
        let mut cfg = Config::default();
        cfg.pipeline.metric_weights.insert("rouge_l".into(), -1.0);
        assert!(cfg.validate().is_err());
    }
}
