//! Show command implementation

use clap::Args;
use layerconf_core::{ConfigError, Configuration};
use tracing::debug;

/// Show command arguments
#[derive(Args, Debug)]
pub struct ShowCommand {
    /// Only print keys below this section
    #[arg(short, long)]
    pub section: Option<String>,

    /// Print a JSON object instead of `key = value` lines
    #[arg(long)]
    pub json: bool,
}

impl ShowCommand {
    pub fn execute(&self, configuration: &Configuration) -> Result<(), ConfigError> {
        println!("{}", self.render(configuration)?);
        Ok(())
    }

    /// Every leaf value of the selected subtree
    pub fn render(&self, configuration: &Configuration) -> Result<String, ConfigError> {
        let entries = match &self.section {
            Some(section) => configuration.section(section).entries(),
            None => configuration.entries(),
        };
        debug!("Rendering {} configuration entries", entries.len());

        if self.json {
            let map: serde_json::Map<String, serde_json::Value> = entries
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect();
            return Ok(serde_json::to_string_pretty(&map)?);
        }

        Ok(entries
            .iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
