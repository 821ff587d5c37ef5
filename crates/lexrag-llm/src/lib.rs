//! LLM provider abstraction for lexrag.
//!
//! Every language-model call in the pipeline (classification, generation,
//! grading, summarization, detoxification, entity recognition) goes through
//! the [`Provider`] trait. The crate has no dependency on other lexrag
//! crates.
//!
//! # Architecture
//!
//! - [`Provider`] trait defines the chat completion interface
//! - [`OpenAiCompatProvider`] implements it for any OpenAI-compatible API
//! - [`LlmProviderConfig`] describes how to connect to a provider
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lexrag_llm::{ChatMessage, ChatRequest, LlmProviderConfig, OpenAiCompatProvider, Provider};
//!
//! let provider = OpenAiCompatProvider::new(LlmProviderConfig::openai());
//! let request = ChatRequest::new("gpt-4", vec![
//!     ChatMessage::system("You are an Indian legal assistant."),
//!     ChatMessage::user("What is Section 13 of the Hindu Marriage Act?"),
//! ]);
//! let response = provider.complete(&request).await?;
//! println!("{}", response.first_text().unwrap_or_default());
//! ```

pub mod config;
pub mod error;
pub mod openai_compat;
pub mod provider;
pub mod types;

pub use config::LlmProviderConfig;
pub use error::{ProviderError, Result};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::Provider;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Choice, Usage};
