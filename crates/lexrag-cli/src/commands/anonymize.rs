//! `lexrag anonymize` -- replace personal data with placeholders.
//!
//! Uses the same recognizer and anonymizer as the safety stage, then
//! reports anything the regex privacy scan still flags.

use clap::Args;
use tracing::warn;

use lexrag_security::PrivacyScanner;

/// Arguments for `lexrag anonymize`.
#[derive(Args)]
pub struct AnonymizeArgs {
    /// Text to anonymize.
    pub text: String,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print `{"text": ..., "redacted": ...}` instead of the text.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: AnonymizeArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let pipeline = super::build_pipeline(&config, None).await?;
    let anonymized = pipeline.anonymize(&args.text).await;

    for finding in PrivacyScanner::new().scan(&anonymized.text) {
        warn!(
            check = %finding.check_id,
            name = %finding.check_name,
            "personal data remains after anonymization"
        );
    }

    if args.json {
        let value = serde_json::json!({
            "text": anonymized.text,
            "redacted": anonymized.redacted,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", anonymized.text);
    }
    Ok(())
}
