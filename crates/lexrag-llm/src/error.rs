//! Provider error types for lexrag-llm.

use thiserror::Error;

/// Failure of a single chat completion call.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No API key could be found for the provider.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// HTTP 401/403.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// HTTP 429. The wait comes from `Retry-After` or the error body.
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// HTTP 404, usually an unknown model id.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx body that is not a chat completion.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timeout")]
    Timeout,

    /// Connection-level failure before a status was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
