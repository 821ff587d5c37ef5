//! Per-query pipeline state.

use serde::Serialize;

use lexrag_types::model::{
    Candidate, Classification, FinalResponse, RankedSelection, RetrievedPassage, ScoredCandidate,
    StageName, SummaryResult, VerificationReport,
};

/// Everything produced while answering one query.
///
/// Each stage fills exactly one field; fields of stages that never ran stay
/// `None`. Owned by a single `Pipeline::run_with_state` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineState {
    pub query: String,
    pub classification: Option<Classification>,
    pub passages: Option<Vec<RetrievedPassage>>,
    pub context: Option<String>,
    pub candidates: Option<Vec<Candidate>>,
    pub reference_text: Option<String>,
    pub scored: Option<Vec<ScoredCandidate>>,
    pub selection: Option<RankedSelection>,
    pub verification: Option<VerificationReport>,
    pub summary: Option<SummaryResult>,
    pub final_response: Option<FinalResponse>,
    /// Stages in the order they ran.
    pub stages_run: Vec<StageName>,
}

impl PipelineState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub(crate) fn enter(&mut self, stage: StageName) {
        self.stages_run.push(stage);
    }

    pub fn ran(&self, stage: StageName) -> bool {
        self.stages_run.contains(&stage)
    }

    pub(crate) fn finish(&mut self, response: FinalResponse) {
        self.final_response = Some(response);
    }

    /// The final response, or a failure naming the last stage that ran.
    pub fn into_final_response(self) -> FinalResponse {
        match self.final_response {
            Some(response) => response,
            None => FinalResponse::Failed {
                stage: self
                    .stages_run
                    .last()
                    .copied()
                    .unwrap_or(StageName::Classification),
                message: "The pipeline stopped without producing a response.".into(),
            },
        }
    }
}
