//! `lexrag classify` -- run the classification stage on its own.
//!
//! Prints the assigned domain and, for rejected queries, the message the
//! admissibility check returned.

use clap::Args;

use lexrag_types::model::Classification;

/// Arguments for `lexrag classify`.
#[derive(Args)]
pub struct ClassifyArgs {
    /// The query to classify.
    pub query: String,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print the classification as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ClassifyArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let pipeline = super::build_pipeline(&config, None).await?;
    let classification = pipeline.classify(&args.query).await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
    } else {
        println!("{}", describe(&classification));
    }
    Ok(())
}

fn describe(classification: &Classification) -> String {
    match &classification.rejection {
        Some(message) => format!("{} ({message})", classification.domain),
        None => classification.domain.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrag_types::model::DomainClassification;

    #[test]
    fn describe_admitted() {
        let c = Classification::new(DomainClassification::Criminal);
        assert_eq!(describe(&c), DomainClassification::Criminal.to_string());
    }

    #[test]
    fn describe_rejected_includes_message() {
        let c = Classification::rejected(DomainClassification::NotLegal, "Not a legal query.");
        let text = describe(&c);
        assert!(text.ends_with("(Not a legal query.)"));
    }
}
