//! `lexrag config` -- display resolved configuration.
//!
//! ```text
//! lexrag config show
//! lexrag config show --config ./lexrag.json
//! ```

use lexrag_types::config::Config;

/// Display the resolved configuration as formatted JSON.
pub fn config_show(config: &Config) {
    match render(config) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: failed to serialize config: {e}"),
    }
}

fn render(config: &Config) -> serde_json::Result<String> {
    serde_json::to_string_pretty(config)
}
