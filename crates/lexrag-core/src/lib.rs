//! Core engine for lexrag.
//!
//! Answers questions about Indian civil and criminal law through a
//! seven-stage pipeline: classification, retrieval, generation, evaluation,
//! verification, summarization and safety.
//!
//! # Modules
//!
//! - [`pipeline`] -- stages, the [`Pipeline`](pipeline::Pipeline)
//!   orchestrator, collaborator traits and the LLM adapter
//! - [`scoring`] -- BLEU, ROUGE-L, METEOR and embedding metrics plus the
//!   lexicon toxicity/bias classifiers
//! - [`corpus`] -- statute corpus loading and the local retriever
//! - [`embeddings`] -- the [`Embedder`](embeddings::Embedder) trait and the
//!   SimHash embedder
//! - [`vector_store`] -- in-memory cosine similarity search
//! - [`json_repair`] -- recovery of almost-JSON model output

pub mod corpus;
pub mod embeddings;
pub mod json_repair;
pub mod pipeline;
pub mod scoring;
pub mod vector_store;

pub use pipeline::{Pipeline, PipelineServices, PipelineState};
