use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use wispgc::compactor::Compactor;
use wispgc::config::Config;
use wispgc::policy::resolve_policy;
use wispgc::store::ProcessStore;

use crate::commands::{resolve_role, resolve_scope};
use crate::error::CliResult;
use crate::output::{OutputFormat, truncate_string};

#[derive(Parser)]
pub struct CompactCommand {
    #[clap(long, help = "Preview compaction without making changes")]
    pub dry_run: bool,

    #[clap(long, short, help = "Compact a specific scope (default: configured scope)")]
    pub scope: Option<String>,
}

impl CompactCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        let store = ProcessStore::new(&config.store);
        let scope = resolve_scope(self.scope.as_deref(), config);
        let role = resolve_role(None, config);
        let policy = resolve_policy(&store, scope.as_deref(), role.as_deref()).await;

        let result = Compactor::new(&store, policy)
            .dry_run(self.dry_run)
            .run()
            .await?;

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            OutputFormat::Table => {
                if self.dry_run {
                    println!("Dry run complete: {} wisps scanned\n", result.total());
                } else {
                    println!("Compaction complete: {} wisps scanned\n", result.total());
                }

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Outcome", "Count"]);
                table.add_row(["Promoted", &result.promoted.len().to_string()]);
                table.add_row(["Deleted", &result.deleted.len().to_string()]);
                table.add_row(["Skipped (within TTL)", &result.skipped.to_string()]);
                if !result.errors.is_empty() {
                    table.add_row(["Errors", &result.errors.len().to_string()]);
                }
                println!("{table}");

                if !result.promoted.is_empty() {
                    println!("\nPromotions:");
                    for p in &result.promoted {
                        println!("  {}: {} ({})", p.id, truncate_string(&p.title, 50), p.reason);
                    }
                }

                if !result.errors.is_empty() {
                    println!("\nErrors:");
                    for e in &result.errors {
                        println!("  - {e}");
                    }
                }
            }
        }

        Ok(())
    }
}
