use chrono::{Duration, NaiveDate, Utc};
use clap::Parser;
use wispgc::compactor::Compactor;
use wispgc::config::Config;
use wispgc::delivery::{ProcessMailer, ReportMailer};
use wispgc::policy::resolve_policy;
use wispgc::report::{
    build_report, build_rollup, collect_reports, detect_anomalies, format_daily_digest,
    format_weekly_rollup, persist_report,
};
use wispgc::store::{ProcessStore, WispStore};

use crate::commands::{resolve_role, resolve_scope};
use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ReportCommand {
    #[clap(long, help = "Preview the report without sending")]
    pub dry_run: bool,

    #[clap(long, help = "Generate the weekly rollup instead of the daily digest")]
    pub weekly: bool,

    #[clap(long, help = "Report for a specific date (YYYY-MM-DD); default: today")]
    pub date: Option<String>,

    #[clap(long, short, help = "Scope whose records are compacted")]
    pub scope: Option<String>,
}

impl ReportCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        let store = ProcessStore::new(&config.store);
        let mailer = ProcessMailer::new(&config.delivery);

        if self.weekly {
            self.weekly_rollup(&store, &mailer, config, format).await
        } else {
            self.daily_digest(&store, &mailer, config, format).await
        }
    }

    async fn daily_digest(
        &self,
        store: &ProcessStore,
        mailer: &ProcessMailer,
        config: &Config,
        format: OutputFormat,
    ) -> CliResult<()> {
        let date = match &self.date {
            Some(d) => {
                NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|e| CliError(format!("invalid date format (use YYYY-MM-DD): {e}")))?;
                d.clone()
            }
            None => Utc::now().format("%Y-%m-%d").to_string(),
        };

        let scope = resolve_scope(self.scope.as_deref(), config);
        let role = resolve_role(None, config);
        let policy = resolve_policy(store, scope.as_deref(), role.as_deref()).await;

        let result = Compactor::new(store, policy)
            .dry_run(self.dry_run)
            .run()
            .await?;

        // Active counts come from re-querying after the batch.
        let active = store.list_ephemeral().await?;
        let mut report = build_report(&date, &result, &active);
        report.anomalies = detect_anomalies(&report);

        if matches!(format, OutputFormat::Json) {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        let rendered = format_daily_digest(&report);

        if self.dry_run {
            println!("[dry-run] Daily compaction digest for {date}:\n");
            println!("{rendered}");
            return Ok(());
        }

        // Best-effort audit trail; the digest is sent either way.
        let event_id = match persist_report(store, &report, &rendered).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to create report record");
                None
            }
        };

        mailer
            .send(
                &config.delivery.digest_to,
                Some(&config.delivery.digest_cc),
                &format!("Wisp Compaction: {date}"),
                &rendered,
            )
            .await?;

        println!("Compaction digest sent for {date}");
        if let Some(id) = event_id {
            println!("  Audit record: {id}");
        }

        Ok(())
    }

    async fn weekly_rollup(
        &self,
        store: &ProcessStore,
        mailer: &ProcessMailer,
        config: &Config,
        format: OutputFormat,
    ) -> CliResult<()> {
        let now = Utc::now();
        let week_end = now.format("%Y-%m-%d").to_string();
        let week_start = (now - Duration::days(7)).format("%Y-%m-%d").to_string();

        let reports = collect_reports(store, &week_start, &week_end).await?;
        let rollup = build_rollup(&week_start, &week_end, &reports);

        if matches!(format, OutputFormat::Json) {
            println!("{}", serde_json::to_string_pretty(&rollup)?);
            return Ok(());
        }

        let rendered = format_weekly_rollup(&rollup);

        if self.dry_run {
            println!("[dry-run] Weekly compaction rollup ({week_start} to {week_end}):\n");
            println!("{rendered}");
            return Ok(());
        }

        mailer
            .send(
                &config.delivery.rollup_to,
                None,
                &format!("Weekly Wisp Compaction: {week_start} to {week_end}"),
                &rendered,
            )
            .await?;

        println!(
            "Weekly compaction rollup sent to {} ({week_start} to {week_end})",
            config.delivery.rollup_to
        );

        Ok(())
    }
}
