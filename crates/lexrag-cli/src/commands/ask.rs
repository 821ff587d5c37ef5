//! `lexrag ask` -- answer one legal question.
//!
//! Answers are followed by the citations the summarizer kept. With `--json`
//! the outcome is printed as the tagged [`FinalResponse`] object, with a
//! `citations` array added to answers.
//!
//! # Examples
//!
//! ```text
//! lexrag ask "What is the punishment for theft?" --corpus statutes.json
//! lexrag ask "Can I divorce my spouse for cruelty?" --json
//! ```

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use lexrag_types::model::FinalResponse;

/// Arguments for `lexrag ask`.
#[derive(Args)]
pub struct AskArgs {
    /// The question to answer.
    pub query: String,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,

    /// Statute corpus file (overrides `retrieval.corpus_path`).
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Print the full outcome as JSON instead of the answer text.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let pipeline = super::build_pipeline(&config, args.corpus.as_deref()).await?;

    let mut state = pipeline.run_with_state(&args.query).await;
    let citations = state
        .summary
        .take()
        .map(|summary| summary.citations)
        .unwrap_or_default();
    let response = state.into_final_response();
    info!(answered = response.is_answer(), "query complete");
    println!("{}", render(&response, &citations, args.json)?);
    Ok(())
}

/// Citations are only shown alongside an answer.
fn render(response: &FinalResponse, citations: &[String], json: bool) -> anyhow::Result<String> {
    let citations: &[String] = if response.is_answer() { citations } else { &[] };
    if json {
        let mut value = serde_json::to_value(response)?;
        if response.is_answer()
            && let Some(object) = value.as_object_mut()
        {
            object.insert("citations".into(), serde_json::json!(citations));
        }
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut out = response.text().to_string();
    if !citations.is_empty() {
        out.push_str("\n\nCitations:");
        for citation in citations {
            out.push_str("\n- ");
            out.push_str(citation);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrag_types::model::RejectionReason;

    fn answer() -> FinalResponse {
        FinalResponse::Answer {
            text: "Theft is punishable under IPC s.379.".into(),
            redacted: false,
        }
    }

    fn citations() -> Vec<String> {
        vec![
            "Indian Penal Code, 1860, s.378".into(),
            "Indian Penal Code, 1860, s.379".into(),
        ]
    }

    #[test]
    fn render_text_lists_citations() {
        let out = render(&answer(), &citations(), false).unwrap();
        assert_eq!(
            out,
            "Theft is punishable under IPC s.379.\n\nCitations:\n\
             - Indian Penal Code, 1860, s.378\n- Indian Penal Code, 1860, s.379"
        );
    }

    #[test]
    fn render_text_without_citations_is_plain() {
        let out = render(&answer(), &[], false).unwrap();
        assert_eq!(out, "Theft is punishable under IPC s.379.");
    }

    #[test]
    fn render_json_includes_citations() {
        let out = render(&answer(), &citations(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["status"], "answer");
        assert_eq!(value["redacted"], false);
        assert_eq!(value["citations"][1], "Indian Penal Code, 1860, s.379");
    }

    #[test]
    fn rejections_carry_no_citations() {
        let response = FinalResponse::Rejected {
            reason: RejectionReason::PrivacyViolation,
            message: "Privacy Violation".into(),
        };
        assert_eq!(
            render(&response, &citations(), false).unwrap(),
            "Privacy Violation"
        );
        let value: serde_json::Value =
            serde_json::from_str(&render(&response, &citations(), true).unwrap()).unwrap();
        assert!(value.get("citations").is_none());
    }
}
