//! Weekly rollup over persisted daily reports
//!
//! Folds a date window of audit-event payloads into trend totals. Deleted and
//! promoted are flows and sum across days; active is a gauge, so the latest
//! day's snapshot wins. Reports with missing or unparsable payloads are
//! skipped, not fatal.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::report::{CATEGORY_ORDER, CategoryStats, DailyReport, REPORT_TITLE_PREFIX};
use crate::store::WispStore;

/// Aggregated weekly trend data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyRollup {
    pub week_start: String,
    pub week_end: String,
    /// Number of daily reports found in the window
    pub days: usize,
    pub totals: BTreeMap<String, CategoryStats>,
    #[serde(rename = "total_promotions")]
    pub promotions: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<String>,
}

/// Retrieve persisted daily reports with dates in `[start, end]`, sorted
/// ascending by date. Only the event listing itself is fatal.
pub async fn collect_reports(
    store: &dyn WispStore,
    start: &str,
    end: &str,
) -> Result<Vec<DailyReport>> {
    let events = store.list_events().await?;

    let mut reports = Vec::new();
    for event in events {
        let Some(date) = event.title.strip_prefix(REPORT_TITLE_PREFIX) else {
            continue;
        };
        if date < start || date > end {
            continue;
        }
        if event.event_payload.is_empty() {
            continue;
        }
        let Ok(report) = serde_json::from_str::<DailyReport>(&event.event_payload) else {
            tracing::debug!(id = %event.id, "skipping report with unparsable payload");
            continue;
        };
        reports.push(report);
    }

    reports.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(reports)
}

/// Fold sorted daily reports into weekly totals.
pub fn build_rollup(start: &str, end: &str, reports: &[DailyReport]) -> WeeklyRollup {
    let mut totals: BTreeMap<String, CategoryStats> = BTreeMap::new();
    for cat in CATEGORY_ORDER {
        totals.insert(cat.to_string(), CategoryStats::default());
    }

    let mut rollup = WeeklyRollup {
        week_start: start.to_string(),
        week_end: end.to_string(),
        days: reports.len(),
        totals,
        promotions: 0,
        anomalies: Vec::new(),
    };

    for report in reports {
        for (cat, stats) in &report.categories {
            let entry = rollup.totals.entry(cat.clone()).or_default();
            entry.deleted += stats.deleted;
            entry.promoted += stats.promoted;
            // Gauge, not a flow: reports are date-sorted, so this ends up as
            // the most recent day's snapshot.
            entry.active = stats.active;
        }
        rollup.promotions += report.promotions.len();
        rollup.anomalies.extend(report.anomalies.iter().cloned());
    }

    rollup
}

/// Render the markdown weekly rollup, deduplicating repeated anomalies.
pub fn format_weekly_rollup(rollup: &WeeklyRollup) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "## Weekly Wisp Compaction: {} to {}\n\n",
        rollup.week_start, rollup.week_end
    ));
    out.push_str(&format!("**Days reported:** {}\n\n", rollup.days));

    out.push_str("### Totals\n");
    out.push_str("| Category | Deleted | Promoted | Active (latest) |\n");
    out.push_str("|----------|---------|----------|----------------|\n");

    let mut total_deleted: u64 = 0;
    let mut total_promoted: u64 = 0;

    for cat in CATEGORY_ORDER {
        let Some(stats) = rollup.totals.get(cat) else {
            continue;
        };
        if stats.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            cat, stats.deleted, stats.promoted, stats.active
        ));
        total_deleted += u64::from(stats.deleted);
        total_promoted += u64::from(stats.promoted);
    }

    out.push_str("\n### Rates\n");
    out.push_str(&format!("- **Total deleted:** {total_deleted}\n"));
    out.push_str(&format!("- **Total promoted:** {total_promoted}\n"));
    if total_deleted + total_promoted > 0 {
        let rate = total_promoted as f64 / (total_deleted + total_promoted) as f64 * 100.0;
        out.push_str(&format!("- **Promotion rate:** {rate:.1}%\n"));
    }
    if rollup.days > 0 {
        out.push_str(&format!(
            "- **Avg deleted/day:** {}\n",
            total_deleted / rollup.days as u64
        ));
    }

    if !rollup.anomalies.is_empty() {
        out.push_str("\n### Anomalies This Week\n");
        let mut seen = HashSet::new();
        for anomaly in &rollup.anomalies {
            if seen.insert(anomaly.as_str()) {
                out.push_str(&format!("- {anomaly}\n"));
            }
        }
    }

    out
}
