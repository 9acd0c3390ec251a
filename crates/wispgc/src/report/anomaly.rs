//! Heuristic anomaly checks over daily report statistics
//!
//! A fixed, ordered list of predicate checks; thresholds are constants with
//! no adaptive behavior.

use crate::report::{CATEGORY_ORDER, DailyReport};

/// Heartbeat deletions above this in one day suggest a restart loop.
const HEARTBEAT_DELETED_THRESHOLD: u32 = 1000;

/// Expected heartbeat deletions per day for one scope.
const HEARTBEAT_DAILY_BASELINE: u32 = 300;

/// Minimum resolved records before the promotion-rate check applies.
const PROMOTION_RATE_MIN_TOTAL: u32 = 10;

/// Check a daily report for operationally suspicious patterns.
pub fn detect_anomalies(report: &DailyReport) -> Vec<String> {
    let mut anomalies = Vec::new();

    for cat in CATEGORY_ORDER {
        let Some(stats) = report.categories.get(cat) else {
            continue;
        };

        if cat == "Heartbeats" && stats.deleted > HEARTBEAT_DELETED_THRESHOLD {
            anomalies.push(format!(
                "{}x normal heartbeat volume (possible restart loop)",
                stats.deleted / HEARTBEAT_DAILY_BASELINE
            ));
        }

        // A scope with zero patrol activity in any column usually means the
        // patrol agents themselves are down.
        if cat == "Patrols" && stats.is_empty() {
            anomalies.push("0 patrol wisps (patrol agents may be down)".to_string());
        }

        // More than half of resolved records promoted suggests kinds that
        // should never have been ephemeral in the first place.
        let total = stats.deleted + stats.promoted;
        if total > PROMOTION_RATE_MIN_TOTAL && stats.promoted > total / 2 {
            anomalies.push(format!(
                "{cat}: high promotion rate ({}/{}), review wisp classification",
                stats.promoted, total
            ));
        }
    }

    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CategoryStats;
    use std::collections::BTreeMap;

    fn report_with(stats: &[(&str, CategoryStats)]) -> DailyReport {
        let mut categories: BTreeMap<String, CategoryStats> = BTreeMap::new();
        for cat in CATEGORY_ORDER {
            categories.insert(cat.to_string(), CategoryStats::default());
        }
        // Patrols stay quiet-but-present by default so tests exercise one
        // check at a time.
        categories.insert(
            "Patrols".to_string(),
            CategoryStats {
                active: 1,
                ..Default::default()
            },
        );
        for (cat, s) in stats {
            categories.insert(cat.to_string(), *s);
        }
        DailyReport {
            date: "2026-08-06".to_string(),
            categories,
            promotions: Vec::new(),
            anomalies: Vec::new(),
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_restart_loop_fires_above_threshold() {
        let report = report_with(&[(
            "Heartbeats",
            CategoryStats {
                deleted: 1500,
                ..Default::default()
            },
        )]);

        let anomalies = detect_anomalies(&report);
        assert_eq!(
            anomalies,
            vec!["5x normal heartbeat volume (possible restart loop)".to_string()]
        );
    }

    #[test]
    fn test_restart_loop_quiet_below_threshold() {
        let report = report_with(&[(
            "Heartbeats",
            CategoryStats {
                deleted: 900,
                ..Default::default()
            },
        )]);

        assert!(detect_anomalies(&report).is_empty());
    }

    #[test]
    fn test_silent_patrols_flagged() {
        let report = report_with(&[("Patrols", CategoryStats::default())]);

        let anomalies = detect_anomalies(&report);
        assert_eq!(
            anomalies,
            vec!["0 patrol wisps (patrol agents may be down)".to_string()]
        );
    }

    #[test]
    fn test_any_patrol_activity_suppresses_the_flag() {
        for stats in [
            CategoryStats { active: 1, ..Default::default() },
            CategoryStats { deleted: 1, ..Default::default() },
            CategoryStats { promoted: 1, ..Default::default() },
        ] {
            let report = report_with(&[("Patrols", stats)]);
            assert!(detect_anomalies(&report).is_empty());
        }
    }

    #[test]
    fn test_high_promotion_rate_flagged_with_counts() {
        let report = report_with(&[(
            "Errors",
            CategoryStats {
                deleted: 4,
                promoted: 8,
                ..Default::default()
            },
        )]);

        let anomalies = detect_anomalies(&report);
        assert_eq!(
            anomalies,
            vec!["Errors: high promotion rate (8/12), review wisp classification".to_string()]
        );
    }

    #[test]
    fn test_promotion_rate_needs_enough_volume() {
        // 7 promoted of 9 resolved is a high rate but below the volume floor.
        let report = report_with(&[(
            "Untyped",
            CategoryStats {
                deleted: 2,
                promoted: 7,
                ..Default::default()
            },
        )]);

        assert!(detect_anomalies(&report).is_empty());
    }

    #[test]
    fn test_multiple_anomalies_accumulate() {
        let report = report_with(&[
            (
                "Heartbeats",
                CategoryStats {
                    deleted: 1201,
                    ..Default::default()
                },
            ),
            ("Patrols", CategoryStats::default()),
        ]);

        let anomalies = detect_anomalies(&report);
        assert_eq!(anomalies.len(), 2);
        assert!(anomalies[0].starts_with("4x normal heartbeat volume"));
    }
}
