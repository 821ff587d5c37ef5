//! `lexrag` -- command-line interface for the lexrag legal QA pipeline.
//!
//! Provides subcommands for:
//! - `lexrag ask` -- answer a question about Indian civil or criminal law.
//! - `lexrag classify` -- show how a query would be classified.
//! - `lexrag anonymize` -- redact personal data from a piece of text.
//! - `lexrag config show` -- display the resolved configuration.

use clap::{Parser, Subcommand};

mod commands;

/// lexrag -- legal question answering over Indian statutes.
#[derive(Parser)]
#[command(name = "lexrag", about = "Legal question answering over Indian law", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a legal question.
    Ask(commands::ask::AskArgs),

    /// Classify a query without answering it.
    Classify(commands::classify::ClassifyArgs),

    /// Redact names, places and contact details from text.
    Anonymize(commands::anonymize::AnonymizeArgs),

    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
enum ConfigAction {
    /// Show the full resolved configuration as JSON.
    Show {
        /// Config file path (overrides auto-discovery).
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask(args) => commands::ask::run(args).await?,
        Commands::Classify(args) => commands::classify::run(args).await?,
        Commands::Anonymize(args) => commands::anonymize::run(args).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show { config } => {
                let cfg = commands::load_config(config.as_deref())?;
                commands::config_cmd::config_show(&cfg);
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_without_error() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_help_contains_binary_name() {
        let help = Cli::command().render_help().to_string();
        assert!(help.contains("lexrag"));
    }

    #[test]
    fn cli_has_all_subcommands() {
        let cmd = Cli::command();
        let sub_names: Vec<&str> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        for name in ["ask", "classify", "anonymize", "config"] {
            assert!(sub_names.contains(&name), "missing subcommand {name}");
        }
    }

    #[test]
    fn cli_verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["lexrag", "ask", "Is bigamy a crime?", "--verbose"])
            .unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn ask_parses_all_options() {
        let cli = Cli::try_parse_from([
            "lexrag",
            "ask",
            "What is the punishment for theft?",
            "--config",
            "/tmp/lexrag.json",
            "--corpus",
            "/tmp/corpus.json",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Ask(args) => {
                assert_eq!(args.query, "What is the punishment for theft?");
                assert_eq!(args.config.as_deref(), Some("/tmp/lexrag.json"));
                assert_eq!(
                    args.corpus.as_deref(),
                    Some(std::path::Path::new("/tmp/corpus.json"))
                );
                assert!(args.json);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn ask_requires_query() {
        assert!(Cli::try_parse_from(["lexrag", "ask"]).is_err());
    }

    #[test]
    fn config_show_parses() {
        let cli = Cli::try_parse_from(["lexrag", "config", "show", "-c", "cfg.json"]).unwrap();
        match cli.command {
            Commands::Config {
                action: ConfigAction::Show { config },
            } => assert_eq!(config.as_deref(), Some("cfg.json")),
            _ => panic!("expected config show"),
        }
    }

    #[test]
    fn anonymize_takes_text() {
        let cli = Cli::try_parse_from(["lexrag", "anonymize", "Call Ravi on 9876543210"]).unwrap();
        match cli.command {
            Commands::Anonymize(args) => assert_eq!(args.text, "Call Ravi on 9876543210"),
            _ => panic!("expected anonymize"),
        }
    }
}
