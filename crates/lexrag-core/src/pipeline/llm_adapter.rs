//! Bridge between the pipeline's collaborator traits and `lexrag-llm`'s
//! [`Provider`] trait.
//!
//! This module provides:
//!
//! - [`LlmClient`] -- one model on one provider, with rate-limit retry and
//!   [`ProviderError`] to [`ServiceError`] mapping.
//! - `Llm*` collaborators -- prompt builders plus an [`LlmClient`] for each
//!   LLM-backed role (classifier, generator, grader, summarizer, entity
//!   recognizer, detoxifier).
//! - [`create_provider`] and [`build_live_pipeline`] -- factories that wire a
//!   [`Pipeline`] from a [`Config`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use lexrag_llm::{
    ChatMessage, ChatRequest, LlmProviderConfig, OpenAiCompatProvider, Provider, ProviderError,
};
use lexrag_security::{Entity, EntityKind};
use lexrag_types::ServiceError;
use lexrag_types::config::Config;

use super::prompts;
use super::traits::{
    ClassifierBackend, Detoxifier, EntityRecognizer, Generator, RelevanceGrader, Retriever,
    SummarySlot, Summarizer,
};
use super::{Pipeline, PipelineServices};
use crate::embeddings::hash_embedder::HashEmbedder;
use crate::json_repair::parse_with_repair;
use crate::scoring::{LexiconClassifier, default_scorers};

const MAX_RETRIES: u32 = 3;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Map a provider failure onto the collaborator error taxonomy.
pub fn provider_error(err: ProviderError) -> ServiceError {
    match err {
        ProviderError::NotConfigured(_) | ProviderError::ModelNotFound(_) => {
            ServiceError::Unavailable(err.to_string())
        }
        ProviderError::InvalidResponse(_) => {
            ServiceError::InvalidOutput(err.to_string())
        }
        other => ServiceError::Provider(other.to_string()),
    }
}

/// A single model on a provider.
#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f64,
    max_tokens: Option<i32>,
    backoff_base_ms: u64,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            backoff_base_ms: 1000,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: i32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Base of the exponential backoff floor between rate-limited attempts.
    pub fn with_backoff_base_ms(mut self, ms: u64) -> Self {
        self.backoff_base_ms = ms;
        self
    }

    /// Send a system + user prompt and return the trimmed first choice.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, ServiceError> {
        let mut request = ChatRequest::new(
            self.model.clone(),
            vec![ChatMessage::system(system), ChatMessage::user(user)],
        )
        .with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        debug!(
            provider = %self.provider.name(),
            model = %self.model,
            "sending completion request"
        );

        for attempt in 0..=MAX_RETRIES {
            match self.provider.complete(&request).await {
                Ok(response) => {
                    return response.first_text().map(str::to_string).ok_or_else(|| {
                        ServiceError::InvalidOutput(format!("{} returned no choices", self.model))
                    });
                }
                Err(ProviderError::RateLimited { retry_after_ms }) if attempt < MAX_RETRIES => {
                    // Provider-suggested wait, with an exponential backoff floor.
                    let backoff_floor = self.backoff_base_ms * 2u64.pow(attempt);
                    let wait = retry_after_ms.max(backoff_floor);
                    warn!(
                        provider = %self.provider.name(),
                        attempt = attempt + 1,
                        wait_ms = wait,
                        "rate limited, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(wait)).await;
                }
                Err(e) => return Err(provider_error(e)),
            }
        }

        Err(ServiceError::Provider(format!(
            "rate limited after {MAX_RETRIES} retries"
        )))
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

pub struct LlmClassifier {
    client: LlmClient,
}

impl LlmClassifier {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClassifierBackend for LlmClassifier {
    async fn check_admissibility(&self, query: &str) -> Result<String, ServiceError> {
        let (system, user) = prompts::admissibility(query);
        self.client.complete(&system, &user).await
    }

    async fn classify_domain(&self, query: &str) -> Result<String, ServiceError> {
        let (system, user) = prompts::domain(query);
        self.client.complete(&system, &user).await
    }
}

pub struct LlmGenerator {
    client: LlmClient,
}

impl LlmGenerator {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, query: &str, context: &str, n: usize) -> Result<String, ServiceError> {
        let (system, user) = prompts::generation(query, context, n);
        self.client.complete(&system, &user).await
    }
}

pub struct LlmGrader {
    client: LlmClient,
}

impl LlmGrader {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RelevanceGrader for LlmGrader {
    async fn answer_relevance(&self, query: &str, answer: &str) -> Result<String, ServiceError> {
        let (system, user) = prompts::answer_relevance(query, answer);
        self.client.complete(&system, &user).await
    }

    async fn context_relevance(&self, query: &str, context: &str) -> Result<String, ServiceError> {
        let (system, user) = prompts::context_relevance(query, context);
        self.client.complete(&system, &user).await
    }

    async fn groundedness(&self, context: &str, answer: &str) -> Result<String, ServiceError> {
        let (system, user) = prompts::groundedness(context, answer);
        self.client.complete(&system, &user).await
    }
}

pub struct LlmSummarizer {
    client: LlmClient,
}

impl LlmSummarizer {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(
        &self,
        query: &str,
        first: &SummarySlot,
        second: &SummarySlot,
        context: &str,
    ) -> Result<String, ServiceError> {
        let (system, user) = prompts::summary(query, first, second, context);
        self.client.complete(&system, &user).await
    }
}

/// Entity recognition by prompting for a JSON entity list.
pub struct LlmEntityRecognizer {
    client: LlmClient,
}

impl LlmEntityRecognizer {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EntityRecognizer for LlmEntityRecognizer {
    async fn recognize(&self, text: &str) -> Result<Vec<Entity>, ServiceError> {
        let (system, user) = prompts::entities(text);
        let raw = self.client.complete(&system, &user).await?;
        decode_entities(&raw, text)
    }
}

/// Decode `[{"text", "kind"}]`, keeping only spans that occur in `source`.
pub fn decode_entities(raw: &str, source: &str) -> Result<Vec<Entity>, ServiceError> {
    let value =
        parse_with_repair(raw).map_err(|e| ServiceError::InvalidOutput(format!("entities: {e}")))?;
    let Value::Array(items) = value else {
        return Err(ServiceError::InvalidOutput("entities: expected a JSON array".into()));
    };

    let mut entities = Vec::new();
    for item in &items {
        let Some(span) = item.get("text").and_then(Value::as_str).map(str::trim) else {
            continue;
        };
        let Some(kind) = ["kind", "type", "entity", "label"]
            .iter()
            .find_map(|key| item.get(*key).and_then(Value::as_str))
        else {
            continue;
        };
        match kind.parse::<EntityKind>() {
            Ok(kind) if !span.is_empty() && source.contains(span) => {
                entities.push(Entity::new(span, kind));
            }
            Ok(_) => debug!(entity = span, "entity not found in text"),
            Err(e) => debug!(error = %e, "skipping entity"),
        }
    }
    Ok(entities)
}

pub struct LlmDetoxifier {
    client: LlmClient,
}

impl LlmDetoxifier {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Detoxifier for LlmDetoxifier {
    async fn detoxify(&self, text: &str) -> Result<String, ServiceError> {
        let (system, user) = prompts::detoxify(text);
        let rewritten = self.client.complete(&system, &user).await?;
        if rewritten.is_empty() {
            return Err(ServiceError::InvalidOutput("empty detoxified text".into()));
        }
        Ok(rewritten)
    }
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

/// Create the configured OpenAI-compatible provider.
pub fn create_provider(config: &Config) -> Arc<dyn Provider> {
    let p = &config.provider;
    let llm_config = LlmProviderConfig {
        name: p.name.clone(),
        base_url: p.base_url.clone(),
        api_key_env: p.api_key_env.clone(),
        headers: p.headers.clone(),
        timeout_secs: p.timeout_secs,
    };
    debug!(
        provider = %llm_config.name,
        base_url = %llm_config.base_url,
        "creating LLM provider from config"
    );
    Arc::new(OpenAiCompatProvider::new(llm_config))
}

/// Wire a full pipeline with LLM-backed collaborators on `provider`.
///
/// The embedder is the local hash embedder; metrics follow
/// `config.pipeline.metrics`; toxicity and bias use the built-in lexicons.
pub fn build_pipeline_with_provider(
    config: &Config,
    provider: Arc<dyn Provider>,
    retriever: Arc<dyn Retriever>,
) -> Pipeline {
    let models = &config.models;
    let client = |model: &str| LlmClient::new(Arc::clone(&provider), model, models.temperature);

    let embedder: Arc<HashEmbedder> =
        Arc::new(HashEmbedder::new(config.retrieval.embedding_dimension));
    let services = PipelineServices {
        classifier: Arc::new(LlmClassifier::new(client(&models.classifier))),
        retriever,
        generator: Arc::new(LlmGenerator::new(
            client(&models.generator).with_max_tokens(2048),
        )),
        scorers: default_scorers(&config.pipeline.metrics, embedder.clone()),
        grader: Arc::new(LlmGrader::new(client(&models.grader).with_max_tokens(16))),
        embedder,
        summarizer: Arc::new(LlmSummarizer::new(
            client(&models.summarizer).with_max_tokens(512),
        )),
        recognizer: Arc::new(LlmEntityRecognizer::new(client(&models.recognizer))),
        toxicity: Arc::new(LexiconClassifier::toxicity()),
        bias: Arc::new(LexiconClassifier::bias()),
        detoxifier: Arc::new(LlmDetoxifier::new(client(&models.detoxifier))),
    };
    Pipeline::new(services, config)
}

/// [`build_pipeline_with_provider`] over the provider from [`create_provider`].
pub fn build_live_pipeline(config: &Config, retriever: Arc<dyn Retriever>) -> Pipeline {
    build_pipeline_with_provider(config, create_provider(config), retriever)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrag_llm::{ChatResponse, Choice};
    use std::sync::Mutex;

    /// Replays queued results and records requests.
    struct ScriptedProvider {
        results: Mutex<Vec<lexrag_llm::Result<ChatResponse>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedProvider {
        fn new(mut results: Vec<lexrag_llm::Result<ChatResponse>>) -> Arc<Self> {
            results.reverse();
            Arc::new(Self {
                results: Mutex::new(results),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &ChatRequest) -> lexrag_llm::Result<ChatResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ProviderError::InvalidResponse("script exhausted".into())))
        }
    }

    fn reply(text: &str) -> lexrag_llm::Result<ChatResponse> {
        Ok(ChatResponse {
            id: "r".into(),
            choices: vec![Choice {
                index: 0,
                message: ChatMessage::assistant(text),
                finish_reason: Some("stop".into()),
            }],
            usage: None,
            model: "m".into(),
        })
    }

    fn rate_limited() -> lexrag_llm::Result<ChatResponse> {
        Err(ProviderError::RateLimited { retry_after_ms: 1 })
    }

    #[test]
    fn provider_errors_map_to_service_errors() {
        assert!(matches!(
            provider_error(ProviderError::NotConfigured("key".into())),
            ServiceError::Unavailable(_)
        ));
        assert!(matches!(
            provider_error(ProviderError::ModelNotFound("gpt-9".into())),
            ServiceError::Unavailable(_)
        ));
        assert!(matches!(
            provider_error(ProviderError::InvalidResponse("bad".into())),
            ServiceError::InvalidOutput(_)
        ));
        assert!(matches!(
            provider_error(ProviderError::Timeout),
            ServiceError::Provider(_)
        ));
        assert!(matches!(
            provider_error(ProviderError::AuthFailed("401".into())),
            ServiceError::Provider(_)
        ));
    }

    #[tokio::test]
    async fn client_sends_system_and_user_messages() {
        let provider = ScriptedProvider::new(vec![reply("  Safe \n")]);
        let client = LlmClient::new(provider.clone(), "gpt-3.5-turbo", 0.1).with_max_tokens(16);
        assert_eq!(client.complete("sys", "usr").await.unwrap(), "Safe");

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].model, "gpt-3.5-turbo");
        assert_eq!(requests[0].messages[0], ChatMessage::system("sys"));
        assert_eq!(requests[0].messages[1], ChatMessage::user("usr"));
        assert_eq!(requests[0].max_tokens, Some(16));
        assert_eq!(requests[0].temperature, Some(0.1));
    }

    #[tokio::test]
    async fn client_retries_rate_limits() {
        let provider = ScriptedProvider::new(vec![rate_limited(), rate_limited(), reply("ok")]);
        let client = LlmClient::new(provider.clone(), "m", 0.0).with_backoff_base_ms(1);
        assert_eq!(client.complete("s", "u").await.unwrap(), "ok");
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn client_gives_up_after_max_retries() {
        let provider = ScriptedProvider::new((0..=MAX_RETRIES).map(|_| rate_limited()).collect());
        let client = LlmClient::new(provider.clone(), "m", 0.0).with_backoff_base_ms(1);
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, ServiceError::Provider(_)));
        assert_eq!(provider.calls(), (MAX_RETRIES + 1) as usize);
    }

    #[tokio::test]
    async fn client_does_not_retry_other_errors() {
        let provider = ScriptedProvider::new(vec![Err(ProviderError::AuthFailed("no".into()))]);
        let client = LlmClient::new(provider.clone(), "m", 0.0);
        assert!(client.complete("s", "u").await.is_err());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn empty_choices_is_invalid_output() {
        let provider = ScriptedProvider::new(vec![Ok(ChatResponse {
            id: "r".into(),
            choices: Vec::new(),
            usage: None,
            model: "m".into(),
        })]);
        let client = LlmClient::new(provider, "m", 0.0);
        assert!(matches!(
            client.complete("s", "u").await,
            Err(ServiceError::InvalidOutput(_))
        ));
    }

    #[test]
    fn entities_decoded_and_filtered() {
        let source = "Ravi Kumar lives in Pune and works at Infosys.";
        let raw = r#"```json
        [{"text": "Ravi Kumar", "kind": "person"},
         {"text": "Pune", "type": "B-LOC"},
         {"text": "Infosys", "kind": "ORG"},
         {"text": "Mumbai", "kind": "location"},
         {"text": "x", "kind": "date"}]
        ```"#;
        let entities = decode_entities(raw, source).unwrap();
        assert_eq!(
            entities,
            vec![
                Entity::new("Ravi Kumar", EntityKind::Person),
                Entity::new("Pune", EntityKind::Location),
                Entity::new("Infosys", EntityKind::Organization),
            ]
        );
    }

    #[test]
    fn entities_require_array() {
        assert!(decode_entities(r#"{"text": "a"}"#, "a").is_err());
        assert!(decode_entities("[]", "a").unwrap().is_empty());
    }

    #[tokio::test]
    async fn classifier_uses_two_prompts() {
        let provider = ScriptedProvider::new(vec![reply("Safe"), reply("civil_law")]);
        let classifier = LlmClassifier::new(LlmClient::new(provider.clone(), "m", 0.1));
        assert_eq!(classifier.check_admissibility("q").await.unwrap(), "Safe");
        assert_eq!(classifier.classify_domain("q").await.unwrap(), "civil_law");

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].messages[0].content, prompts::ADMISSIBILITY_SYSTEM);
        assert_eq!(requests[1].messages[0].content, prompts::DOMAIN_SYSTEM);
    }
}
