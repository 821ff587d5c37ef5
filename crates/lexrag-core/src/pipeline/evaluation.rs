//! Evaluation and ranking.
//!
//! Every candidate is scored against a reference text (the leading
//! retrieved passages) with each configured metric. The composite score is
//! the weighted mean of the metric scores; metrics without a configured
//! weight count 1.0.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use lexrag_types::StageError;
use lexrag_types::config::PipelineConfig;
use lexrag_types::model::{Candidate, RankedSelection, RetrievedPassage, ScoredCandidate};

use super::traits::MetricScorer;

pub struct EvaluationStage {
    metrics: Vec<String>,
    weights: BTreeMap<String, f64>,
    scorers: HashMap<String, Arc<dyn MetricScorer>>,
}

impl EvaluationStage {
    pub fn new(scorers: Vec<Arc<dyn MetricScorer>>, config: &PipelineConfig) -> Self {
        let scorers = scorers
            .into_iter()
            .map(|s| (s.name().to_string(), s))
            .collect();
        Self {
            metrics: config.metrics.clone(),
            weights: config.metric_weights.clone(),
            scorers,
        }
    }

    /// Score every candidate, preserving batch order.
    pub async fn evaluate(&self, candidates: &[Candidate], reference: &str) -> Vec<ScoredCandidate> {
        let mut scored = Vec::with_capacity(candidates.len());
        for (batch_index, candidate) in candidates.iter().enumerate() {
            let per_metric_scores = self.score_candidate(candidate, reference).await;
            let composite_score = self.composite(&per_metric_scores);
            debug!(
                stage = "evaluation",
                candidate = %candidate.id,
                composite = composite_score,
                "candidate scored"
            );
            scored.push(ScoredCandidate {
                candidate: candidate.clone(),
                per_metric_scores,
                composite_score,
                batch_index,
            });
        }
        scored
    }

    async fn score_candidate(&self, candidate: &Candidate, reference: &str) -> BTreeMap<String, f64> {
        let mut scores = BTreeMap::new();
        if candidate.is_blank() {
            for metric in &self.metrics {
                scores.insert(metric.clone(), 0.0);
            }
            return scores;
        }

        for metric in &self.metrics {
            let score = match self.scorers.get(metric) {
                Some(scorer) => match scorer.score(reference, &candidate.text).await {
                    Ok(value) => sanitize_score(value),
                    Err(e) => {
                        self.metric_unavailable(metric, e.to_string());
                        0.0
                    }
                },
                None => {
                    self.metric_unavailable(metric, "no scorer registered".into());
                    0.0
                }
            };
            scores.insert(metric.clone(), score);
        }
        scores
    }

    fn metric_unavailable(&self, metric: &str, reason: String) {
        let err = StageError::EvaluationMetricUnavailable {
            metric: metric.to_string(),
            reason,
        };
        warn!(stage = "evaluation", error = %err, "metric scored as 0.0");
    }

    /// Weighted mean of `scores`. Zero total weight gives 0.0.
    pub fn composite(&self, scores: &BTreeMap<String, f64>) -> f64 {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for (metric, score) in scores {
            let weight = self.weights.get(metric).copied().unwrap_or(1.0);
            weighted += weight * score;
            total_weight += weight;
        }
        if total_weight <= 0.0 {
            0.0
        } else {
            sanitize_score(weighted / total_weight)
        }
    }
}

fn sanitize_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// The `k` best candidates by composite score. Ties keep batch order.
pub fn select_top_k(mut scored: Vec<ScoredCandidate>, k: usize) -> RankedSelection {
    scored.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));
    scored.truncate(k);
    RankedSelection { candidates: scored }
}

/// Reference text for the lexical metrics: the first `n` passages separated
/// by blank lines.
pub fn build_reference_text(passages: &[RetrievedPassage], n: usize) -> String {
    passages
        .iter()
        .take(n)
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lexrag_types::ServiceError;
    use lexrag_types::model::LawDomain;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedScorer {
        name: &'static str,
        result: Result<f64, ServiceError>,
        calls: AtomicUsize,
    }

    impl FixedScorer {
        fn new(name: &'static str, result: Result<f64, ServiceError>) -> Arc<Self> {
            Arc::new(Self {
                name,
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    fn fixed(name: &'static str, result: Result<f64, ServiceError>) -> Arc<dyn MetricScorer> {
        FixedScorer::new(name, result)
    }

    #[async_trait]
    impl MetricScorer for FixedScorer {
        fn name(&self) -> &str {
            self.name
        }

        async fn score(&self, _reference: &str, _candidate: &str) -> Result<f64, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn config(metrics: &[&str]) -> PipelineConfig {
        PipelineConfig {
            metrics: metrics.iter().map(|m| (*m).to_string()).collect(),
            ..PipelineConfig::default()
        }
    }

    fn scored(id: &str, composite: f64, batch_index: usize) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate::new(id, "text", ""),
            per_metric_scores: BTreeMap::new(),
            composite_score: composite,
            batch_index,
        }
    }

    #[tokio::test]
    async fn composite_is_mean_of_metrics() {
        let stage = EvaluationStage::new(
            vec![fixed("a", Ok(0.2)), fixed("b", Ok(0.6))],
            &config(&["a", "b"]),
        );
        let result = stage.evaluate(&[Candidate::new("c1", "answer", "")], "ref").await;
        assert!((result[0].composite_score - 0.4).abs() < 1e-9);
        assert_eq!(result[0].per_metric_scores.len(), 2);
    }

    #[tokio::test]
    async fn weights_override_per_metric() {
        let mut cfg = config(&["a", "b"]);
        cfg.metric_weights.insert("a".into(), 3.0);
        let stage = EvaluationStage::new(
            vec![fixed("a", Ok(1.0)), fixed("b", Ok(0.0))],
            &cfg,
        );
        let result = stage.evaluate(&[Candidate::new("c1", "answer", "")], "ref").await;
        assert!((result[0].composite_score - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn zero_total_weight_gives_zero() {
        let mut cfg = config(&["a"]);
        cfg.metric_weights.insert("a".into(), 0.0);
        let stage = EvaluationStage::new(vec![fixed("a", Ok(1.0))], &cfg);
        let result = stage.evaluate(&[Candidate::new("c1", "answer", "")], "ref").await;
        assert_eq!(result[0].composite_score, 0.0);
    }

    #[tokio::test]
    async fn blank_candidate_skips_metrics() {
        let scorer = FixedScorer::new("a", Ok(0.9));
        let stage = EvaluationStage::new(vec![scorer.clone() as Arc<dyn MetricScorer>], &config(&["a"]));
        let result = stage.evaluate(&[Candidate::new("c1", "  \n ", "")], "ref").await;
        assert_eq!(result[0].composite_score, 0.0);
        assert_eq!(result[0].per_metric_scores.get("a"), Some(&0.0));
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_metric_scores_zero_only_for_itself() {
        let stage = EvaluationStage::new(
            vec![
                fixed("a", Err(ServiceError::Unavailable("lexicon".into()))),
                fixed("b", Ok(0.8)),
            ],
            &config(&["a", "b", "missing"]),
        );
        let result = stage.evaluate(&[Candidate::new("c1", "answer", "")], "ref").await;
        let scores = &result[0].per_metric_scores;
        assert_eq!(scores["a"], 0.0);
        assert_eq!(scores["b"], 0.8);
        assert_eq!(scores["missing"], 0.0);
    }

    #[tokio::test]
    async fn out_of_range_and_nan_are_sanitized() {
        let stage = EvaluationStage::new(
            vec![
                fixed("high", Ok(7.5)),
                fixed("low", Ok(-1.0)),
                fixed("nan", Ok(f64::NAN)),
            ],
            &config(&["high", "low", "nan"]),
        );
        let result = stage.evaluate(&[Candidate::new("c1", "answer", "")], "ref").await;
        let scores = &result[0].per_metric_scores;
        assert_eq!(scores["high"], 1.0);
        assert_eq!(scores["low"], 0.0);
        assert_eq!(scores["nan"], 0.0);
    }

    #[test]
    fn selection_is_stable_on_ties() {
        let selection = select_top_k(
            vec![scored("a", 0.5, 0), scored("b", 0.9, 1), scored("c", 0.5, 2), scored("d", 0.5, 3)],
            3,
        );
        let ids: Vec<_> = selection.iter().map(|s| s.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn selection_size_is_min_of_len_and_k() {
        assert_eq!(select_top_k(vec![scored("a", 0.1, 0)], 2).len(), 1);
        assert_eq!(select_top_k(Vec::new(), 2).len(), 0);
        let three = vec![scored("a", 0.1, 0), scored("b", 0.2, 1), scored("c", 0.3, 2)];
        assert_eq!(select_top_k(three, 2).len(), 2);
    }

    #[test]
    fn reference_uses_leading_passages() {
        let passages: Vec<_> = ["one", "two", "three"]
            .iter()
            .map(|t| RetrievedPassage {
                text: (*t).into(),
                source: String::new(),
                domain: LawDomain::Civil,
                score: 0.0,
            })
            .collect();
        assert_eq!(build_reference_text(&passages, 2), "one\n\ntwo");
        assert_eq!(build_reference_text(&passages[..1], 2), "one");
    }
}
