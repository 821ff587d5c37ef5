//! Generation stage.
//!
//! Asks the generator for a batch of candidate answers and decodes its raw
//! output. Decoding never fails the pipeline: a batch that cannot be read
//! becomes an empty candidate list and the later stages deal with it.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use lexrag_types::StageError;
use lexrag_types::model::Candidate;

use super::traits::Generator;
use crate::json_repair::parse_with_repair;

pub struct GenerationStage {
    generator: Arc<dyn Generator>,
    batch_size: usize,
}

impl GenerationStage {
    pub fn new(generator: Arc<dyn Generator>, batch_size: usize) -> Self {
        Self {
            generator,
            batch_size,
        }
    }

    /// Generate up to `batch_size` candidates for `query` over `context`.
    pub async fn generate(&self, query: &str, context: &str) -> Vec<Candidate> {
        let raw = match self.generator.generate(query, context, self.batch_size).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(stage = "generation", error = %e, "generator failed");
                return Vec::new();
            }
        };

        match decode_batch(&raw, self.batch_size) {
            Ok(candidates) => {
                debug!(
                    stage = "generation",
                    requested = self.batch_size,
                    candidates = candidates.len(),
                    "batch decoded"
                );
                candidates
            }
            Err(e) => {
                warn!(stage = "generation", error = %e, "discarding batch");
                Vec::new()
            }
        }
    }
}

/// Decode a generator batch into at most `n` candidates.
///
/// The batch must be a JSON array (after repair). Non-object entries are
/// skipped. Ids come from `response_id` or `id`; text from `response` or
/// `text`; `citations` may be a string or an array of strings. Missing or
/// repeated ids are replaced with `resp_NNN`.
pub fn decode_batch(raw: &str, n: usize) -> Result<Vec<Candidate>, StageError> {
    let value = parse_with_repair(raw).map_err(|e| StageError::GenerationMalformed {
        reason: e.to_string(),
    })?;
    let Value::Array(entries) = value else {
        return Err(StageError::GenerationMalformed {
            reason: "expected a JSON array of responses".into(),
        });
    };

    let mut taken: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();
    for entry in entries.iter().filter_map(Value::as_object) {
        if candidates.len() == n {
            break;
        }

        let proposed = ["response_id", "id"]
            .iter()
            .find_map(|key| entry.get(*key).and_then(scalar_text))
            .filter(|id| !id.trim().is_empty());
        let id = match proposed {
            Some(id) if !taken.contains(&id) => id,
            _ => next_free_id(&taken, candidates.len() + 1),
        };
        taken.insert(id.clone());

        let text = ["response", "text"]
            .iter()
            .find_map(|key| entry.get(*key).and_then(Value::as_str))
            .unwrap_or_default();
        let citations = entry.get("citations").map(citations_text).unwrap_or_default();

        candidates.push(Candidate::new(id, text, citations));
    }
    Ok(candidates)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn citations_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    }
}

fn next_free_id(taken: &HashSet<String>, start: usize) -> String {
    (start..)
        .map(|i| format!("resp_{i:03}"))
        .find(|id| !taken.contains(id))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lexrag_types::ServiceError;

    #[test]
    fn decodes_well_formed_batch() {
        let raw = r#"[
            {"response_id": "resp_001", "response": "Section 13 HMA.", "citations": "HMA s.13"},
            {"response_id": "resp_002", "response": "Cruelty is a ground.", "citations": ["HMA s.13", "case law"]}
        ]"#;
        let candidates = decode_batch(raw, 4).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], Candidate::new("resp_001", "Section 13 HMA.", "HMA s.13"));
        assert_eq!(candidates[1].citations, "HMA s.13; case law");
    }

    #[test]
    fn accepts_alternate_keys_and_numeric_ids() {
        let raw = r#"[{"id": 7, "text": "Answer"}]"#;
        let candidates = decode_batch(raw, 4).unwrap();
        assert_eq!(candidates[0].id, "7");
        assert_eq!(candidates[0].text, "Answer");
        assert_eq!(candidates[0].citations, "");
    }

    #[test]
    fn reindexes_missing_and_duplicate_ids() {
        let raw = r#"[
            {"response_id": "a", "response": "1"},
            {"response_id": "a", "response": "2"},
            {"response": "3"}
        ]"#;
        let ids: Vec<_> = decode_batch(raw, 4)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["a", "resp_002", "resp_003"]);
    }

    #[test]
    fn generated_ids_avoid_existing_ones() {
        let raw = r#"[{"response": "x"}, {"response_id": "resp_001", "response": "y"}]"#;
        let ids: Vec<_> = decode_batch(raw, 4)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["resp_001", "resp_002"]);
    }

    #[test]
    fn skips_non_objects_and_truncates() {
        let raw = r#"["noise", {"response": "a"}, 42, {"response": "b"}, {"response": "c"}]"#;
        let candidates = decode_batch(raw, 2).unwrap();
        let texts: Vec<_> = candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn repairs_fenced_output() {
        let raw = "```json\n[{\"response_id\": \"resp_001\", \"response\": \"ok\",},]\n```";
        assert_eq!(decode_batch(raw, 4).unwrap().len(), 1);
    }

    #[test]
    fn non_array_is_malformed() {
        assert!(matches!(
            decode_batch(r#"{"response": "single"}"#, 4),
            Err(StageError::GenerationMalformed { .. })
        ));
        assert!(decode_batch("I am unable to help.", 4).is_err());
    }

    struct FixedGenerator(Result<String, ServiceError>);

    #[async_trait]
    impl Generator for FixedGenerator {
        async fn generate(&self, _q: &str, _c: &str, _n: usize) -> Result<String, ServiceError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn stage_absorbs_malformed_output() {
        let stage = GenerationStage::new(Arc::new(FixedGenerator(Ok("not json".into()))), 4);
        assert!(stage.generate("q", "ctx").await.is_empty());
    }

    #[tokio::test]
    async fn stage_absorbs_generator_error() {
        let stage = GenerationStage::new(
            Arc::new(FixedGenerator(Err(ServiceError::Provider("boom".into())))),
            4,
        );
        assert!(stage.generate("q", "ctx").await.is_empty());
    }
}
