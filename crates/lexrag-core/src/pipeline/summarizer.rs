//! Summarization of the two best answers.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use lexrag_types::StageError;
use lexrag_types::model::{RankedSelection, SummaryResult};

use super::traits::{SummarySlot, Summarizer};
use crate::json_repair::parse_with_repair;

/// Returned when there is nothing to summarize.
pub const NO_VALID_RESPONSES: &str = "Summarization Failed: No valid responses.";

/// Returned when the summarizer output cannot be used.
pub const SUMMARIZATION_FAILED: &str = "Summarization Failed.";

pub struct SummarizationStage {
    summarizer: Arc<dyn Summarizer>,
}

impl SummarizationStage {
    pub fn new(summarizer: Arc<dyn Summarizer>) -> Self {
        Self { summarizer }
    }

    /// Summarize the top two candidates of `selection`.
    ///
    /// An empty selection fails without calling the summarizer.
    pub async fn summarize(
        &self,
        query: &str,
        selection: &RankedSelection,
        context: &str,
    ) -> Result<SummaryResult, StageError> {
        if selection.is_empty() {
            return Err(StageError::SummarizationMalformed {
                reason: "no candidates to summarize".into(),
            });
        }

        let first = slot(selection, 0);
        let second = slot(selection, 1);
        let raw = self
            .summarizer
            .summarize(query, &first, &second, context)
            .await
            .map_err(|e| StageError::SummarizationMalformed {
                reason: e.to_string(),
            })?;

        let summary = decode_summary(&raw, query)?;
        debug!(
            stage = "summarization",
            chars = summary.summary.len(),
            citations = summary.citations.len(),
            "summary decoded"
        );
        Ok(summary)
    }
}

fn slot(selection: &RankedSelection, rank: usize) -> SummarySlot {
    match selection.get(rank) {
        Some(scored) => SummarySlot {
            text: scored.candidate.text.clone(),
            citations: scored.candidate.citations.clone(),
        },
        None => SummarySlot::not_found(),
    }
}

/// Decode a `{query, summary, citations}` object.
///
/// `summary` is required and must be non-blank. A missing `query` falls back
/// to the asked question; `citations` may be a string or a list.
pub fn decode_summary(raw: &str, query: &str) -> Result<SummaryResult, StageError> {
    let malformed = |reason: String| {
        warn!(stage = "summarization", %reason, "summary rejected");
        StageError::SummarizationMalformed { reason }
    };

    let value = parse_with_repair(raw).map_err(|e| malformed(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(malformed("expected a JSON object".into()));
    };

    let summary = map
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed("missing summary".into()))?
        .to_string();

    let echoed_query = map
        .get("query")
        .and_then(Value::as_str)
        .filter(|q| !q.trim().is_empty())
        .unwrap_or(query)
        .to_string();

    let citations = match map.get("citations") {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Ok(SummaryResult {
        query: echoed_query,
        summary,
        citations,
    })
}
