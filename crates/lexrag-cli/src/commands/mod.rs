//! CLI command implementations for `lexrag`.
//!
//! - [`ask`] -- run the full pipeline for one question.
//! - [`classify`] -- classification stage only.
//! - [`anonymize`] -- anonymizer of the safety stage only.
//! - [`config_cmd`] -- configuration display.

pub mod anonymize;
pub mod ask;
pub mod classify;
pub mod config_cmd;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use lexrag_core::Pipeline;
use lexrag_core::corpus::{Corpus, LocalRetriever};
use lexrag_core::embeddings::hash_embedder::HashEmbedder;
use lexrag_core::pipeline::llm_adapter::build_live_pipeline;
use lexrag_types::config::Config;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "LEXRAG_CONFIG";

/// Load configuration from the given path override or via auto-discovery.
///
/// Discovery order:
/// 1. `config_override` (must exist)
/// 2. `LEXRAG_CONFIG` env var
/// 3. `~/.lexrag/config.json`
///
/// Returns a default `Config` if no config file is found. The result is
/// validated before it is returned.
pub fn load_config(config_override: Option<&str>) -> anyhow::Result<Config> {
    let env_path = std::env::var(CONFIG_ENV).ok();
    let config = match resolve_config_path(config_override, env_path.as_deref())? {
        Some(path) => read_config(&path)?,
        None => {
            debug!("no config file found, using defaults");
            Config::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Pick the config file to read, if any.
fn resolve_config_path(
    config_override: Option<&str>,
    env_path: Option<&str>,
) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path_str) = config_override {
        let path = PathBuf::from(path_str);
        if !path.exists() {
            anyhow::bail!("config file not found: {path_str}");
        }
        return Ok(Some(path));
    }
    if let Some(path_str) = env_path.filter(|p| !p.trim().is_empty()) {
        let path = PathBuf::from(path_str);
        if !path.exists() {
            anyhow::bail!("config file not found: {path_str} (from {CONFIG_ENV})");
        }
        return Ok(Some(path));
    }
    Ok(Config::default_path().filter(|p| p.exists()))
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
    let config: Config = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config {}: {e}", path.display()))?;
    debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Build the live pipeline over the corpus at `corpus_override` or the
/// configured corpus path.
///
/// Without any corpus the pipeline still classifies and anonymizes, but
/// every admitted query ends with "insufficient information".
pub async fn build_pipeline(
    config: &Config,
    corpus_override: Option<&Path>,
) -> anyhow::Result<Pipeline> {
    let corpus_path = corpus_override.or(config.retrieval.corpus_path.as_deref());
    let corpus = match corpus_path {
        Some(path) => Corpus::load(path)?,
        None => Corpus::default(),
    };
    if corpus.is_empty() {
        warn!("corpus is empty, retrieval will find nothing");
    }

    let embedder = Arc::new(HashEmbedder::new(config.retrieval.embedding_dimension));
    let retriever = LocalRetriever::build(&corpus, embedder).await?;
    Ok(build_live_pipeline(config, Arc::new(retriever)))
}
