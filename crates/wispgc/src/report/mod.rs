//! Daily compaction reports
//!
//! Maps raw batch outcomes into fixed display categories, renders the
//! markdown digest, and persists each daily report as a closed audit event so
//! the weekly rollup can re-read it later.

pub mod anomaly;
pub mod rollup;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::compactor::{CompactionAction, CompactionResult};
use crate::error::{Result, WispError};
use crate::record::{AuditEvent, Wisp};
use crate::store::WispStore;

pub use anomaly::detect_anomalies;
pub use rollup::{WeeklyRollup, build_rollup, collect_reports, format_weekly_rollup};

/// Display order for report categories.
pub const CATEGORY_ORDER: [&str; 4] = ["Heartbeats", "Patrols", "Errors", "Untyped"];

/// Event category tag on persisted report records.
pub const EVENT_CATEGORY: &str = "wisp.compaction";

/// Title prefix for persisted report records; the date follows.
pub const REPORT_TITLE_PREFIX: &str = "Compaction Report ";

/// Display category for a record kind. Unmapped kinds are Untyped.
pub fn category_for(kind: &str) -> &'static str {
    match kind {
        "heartbeat" | "ping" => "Heartbeats",
        "patrol" | "gc_report" => "Patrols",
        "error" | "recovery" | "escalation" => "Errors",
        _ => "Untyped",
    }
}

/// Per-category compaction tallies.
///
/// Deleted and promoted are flow counts from the batch; active is a
/// point-in-time gauge of the still-ephemeral population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    #[serde(default)]
    pub deleted: u32,
    #[serde(default)]
    pub promoted: u32,
    #[serde(default)]
    pub active: u32,
}

impl CategoryStats {
    pub fn is_empty(&self) -> bool {
        self.deleted == 0 && self.promoted == 0 && self.active == 0
    }
}

/// Full daily digest data, also the persisted audit payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    /// Report date, YYYY-MM-DD
    pub date: String,
    /// Always contains all four categories, even when empty
    pub categories: BTreeMap<String, CategoryStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub promotions: Vec<CompactionAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Aggregate a batch outcome and the post-batch active population into a
/// daily report. Anomaly detection is a separate pass ([`detect_anomalies`]).
pub fn build_report(date: &str, result: &CompactionResult, active: &[Wisp]) -> DailyReport {
    let mut categories: BTreeMap<String, CategoryStats> = BTreeMap::new();
    for cat in CATEGORY_ORDER {
        categories.insert(cat.to_string(), CategoryStats::default());
    }

    for action in &result.deleted {
        categories
            .entry(category_for(&action.wisp_type).to_string())
            .or_default()
            .deleted += 1;
    }

    let mut promotions = Vec::with_capacity(result.promoted.len());
    for action in &result.promoted {
        categories
            .entry(category_for(&action.wisp_type).to_string())
            .or_default()
            .promoted += 1;
        promotions.push(action.clone());
    }

    for wisp in active {
        categories
            .entry(category_for(&wisp.wisp_type).to_string())
            .or_default()
            .active += 1;
    }

    DailyReport {
        date: date.to_string(),
        categories,
        promotions,
        anomalies: Vec::new(),
        errors: result.errors.clone(),
    }
}

/// Render the markdown daily digest. All-zero categories are dropped from the
/// summary table; the itemized sections are omitted entirely when empty.
pub fn format_daily_digest(report: &DailyReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("## Wisp Compaction: {}\n\n", report.date));
    out.push_str("### Summary\n");
    out.push_str("| Category | Deleted | Promoted | Active |\n");
    out.push_str("|----------|---------|----------|--------|\n");

    for cat in CATEGORY_ORDER {
        let Some(stats) = report.categories.get(cat) else {
            continue;
        };
        if stats.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            cat, stats.deleted, stats.promoted, stats.active
        ));
    }

    if !report.promotions.is_empty() {
        out.push_str("\n### Promotions\n");
        for p in &report.promotions {
            out.push_str(&format!(
                "- {}: {:?} (reason: {})\n",
                p.id,
                truncate(&p.title, 60),
                p.reason
            ));
        }
    }

    if !report.anomalies.is_empty() {
        out.push_str("\n### Anomalies\n");
        for a in &report.anomalies {
            out.push_str(&format!("- {a}\n"));
        }
    }

    if !report.errors.is_empty() {
        out.push_str("\n### Errors\n");
        for e in &report.errors {
            out.push_str(&format!("- {e}\n"));
        }
    }

    out
}

/// Persist a daily report as a closed audit event, returning the new record
/// id. The close is best-effort; the report record stands either way.
pub async fn persist_report(
    store: &dyn WispStore,
    report: &DailyReport,
    rendered: &str,
) -> Result<String> {
    let payload = serde_json::to_string(report)
        .map_err(|e| WispError::Serialization(format!("encoding report payload: {e}")))?;

    let event = AuditEvent {
        title: format!("{REPORT_TITLE_PREFIX}{}", report.date),
        category: EVENT_CATEGORY.to_string(),
        payload,
        description: rendered.to_string(),
    };
    let id = store.create_event(&event).await?;

    // An audit record, not actionable work.
    if let Err(e) = store.close_record(&id, "daily compaction report").await {
        tracing::warn!(id = %id, error = %e, "failed to close report record");
    }

    Ok(id)
}

/// Shorten a string to `max_len` characters, with "..." when truncated.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}
