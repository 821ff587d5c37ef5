//! # lexrag-types
//!
//! Core type definitions for the lexrag legal question-answering pipeline.
//!
//! This crate is the foundation of the dependency graph -- all other
//! lexrag crates depend on it. It contains:
//!
//! - **[`error`]** -- [`LexragError`], [`StageError`] and [`ServiceError`]
//! - **[`config`]** -- Configuration schema (provider, models, pipeline, safety)
//! - **[`model`]** -- The data records threaded through the pipeline stages

pub mod config;
pub mod error;
pub mod model;

pub use error::{LexragError, Result, ServiceError, StageError};
