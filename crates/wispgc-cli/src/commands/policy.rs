use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use wispgc::config::Config;
use wispgc::policy::{format_ttl, resolve_policy};
use wispgc::store::ProcessStore;

use crate::commands::{resolve_role, resolve_scope};
use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct PolicyCommand {
    #[clap(long, short, help = "Scope whose overrides apply")]
    pub scope: Option<String>,

    #[clap(long, help = "Role whose overrides apply")]
    pub role: Option<String>,
}

impl PolicyCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        let store = ProcessStore::new(&config.store);
        let scope = resolve_scope(self.scope.as_deref(), config);
        let role = resolve_role(self.role.as_deref(), config);
        let policy = resolve_policy(&store, scope.as_deref(), role.as_deref()).await;

        match format {
            OutputFormat::Json => {
                let output: serde_json::Map<String, serde_json::Value> = policy
                    .entries()
                    .into_iter()
                    .map(|(kind, ttl)| (kind, serde_json::Value::String(format_ttl(ttl))))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Effective TTL policy");
                if let Some(scope) = &scope {
                    println!("  scope: {scope}");
                }
                if let Some(role) = &role {
                    println!("  role: {role}");
                }
                println!();

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Kind", "TTL"]);
                for (kind, ttl) in policy.entries() {
                    table.add_row([kind.as_str(), &format_ttl(ttl)]);
                }
                println!("{table}");
            }
        }

        Ok(())
    }
}
