use clap::Parser;
use wispgc::config::Config;

use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ConfigCommand {}

impl ConfigCommand {
    pub fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
            OutputFormat::Table => {
                let rendered = toml::to_string_pretty(config)
                    .map_err(|e| CliError(format!("TOML error: {e}")))?;
                print!("{rendered}");
            }
        }
        Ok(())
    }
}
