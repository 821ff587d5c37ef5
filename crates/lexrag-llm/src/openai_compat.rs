//! OpenAI-compatible chat completion client.
//!
//! Works against OpenAI itself and against any server that speaks the same
//! `/chat/completions` protocol (Groq, Together, OpenRouter, Ollama, vLLM).
//! Local servers usually need no key: leave `api_key_env` empty and no
//! `Authorization` header is sent.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::LlmProviderConfig;
use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::types::{ChatRequest, ChatResponse};

/// Wait suggested to callers when a 429 carries no hint.
const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

pub struct OpenAiCompatProvider {
    config: LlmProviderConfig,
    http: reqwest::Client,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    /// Provider whose key is read from `config.api_key_env` on every call.
    pub fn new(config: LlmProviderConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_default();
        Self {
            config,
            http,
            api_key: None,
        }
    }

    /// Provider with a fixed key; the environment is not consulted.
    pub fn with_api_key(config: LlmProviderConfig, api_key: String) -> Self {
        Self {
            api_key: Some(api_key),
            ..Self::new(config)
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// `Ok(None)` means the endpoint is keyless.
    fn bearer_token(&self) -> Result<Option<String>> {
        if let Some(key) = &self.api_key {
            return Ok(Some(key.clone()));
        }
        let var = self.config.api_key_env.trim();
        if var.is_empty() {
            return Ok(None);
        }
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(key)),
            _ => Err(ProviderError::NotConfigured(format!("set {var} env var"))),
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let token = self.bearer_token()?;

        let mut builder = self.http.post(self.endpoint()).json(request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &self.config.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!(
            provider = %self.config.name,
            model = %request.model,
            messages = request.messages.len(),
            "POST chat/completions"
        );

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Transport(e)
            }
        })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let header = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            let err = status_error(status, header.as_deref(), body, &request.model);
            warn!(provider = %self.config.name, error = %err, "completion failed");
            return Err(err);
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("not a chat completion: {e}")))?;
        debug!(
            provider = %self.config.name,
            model = %completion.model,
            choices = completion.choices.len(),
            "completion received"
        );
        Ok(completion)
    }
}

/// Classify a non-success response.
fn status_error(
    status: u16,
    retry_after_header: Option<&str>,
    body: String,
    model: &str,
) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_ms: retry_after_ms(retry_after_header, &body),
        },
        401 | 403 => ProviderError::AuthFailed(body),
        404 => ProviderError::ModelNotFound(format!("{model}: {body}")),
        _ => ProviderError::Status { status, body },
    }
}

/// Wait before retrying a 429: the `Retry-After` header (seconds) wins over
/// `retry_after_ms` / `retry_after` in a JSON body.
fn retry_after_ms(header: Option<&str>, body: &str) -> u64 {
    let from_header = header
        .and_then(|h| h.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| (secs * 1000.0) as u64);
    from_header
        .or_else(|| {
            let value: serde_json::Value = serde_json::from_str(body).ok()?;
            value
                .get("retry_after_ms")
                .and_then(serde_json::Value::as_u64)
                .or_else(|| {
                    value
                        .get("retry_after")
                        .and_then(serde_json::Value::as_f64)
                        .map(|secs| (secs * 1000.0) as u64)
                })
        })
        .unwrap_or(DEFAULT_RETRY_AFTER_MS)
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.config.name)
            .field("base_url", &self.config.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}
