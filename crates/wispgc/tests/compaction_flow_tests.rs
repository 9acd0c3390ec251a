//! Integration tests for the compaction, digest, and rollup flows
//!
//! Drives the engine end to end against the in-memory collaborators.

use wispgc::compactor::Compactor;
use wispgc::delivery::ReportMailer;
use wispgc::policy::{TtlPolicy, resolve_policy};
use wispgc::record::WispStatus;
use wispgc::store::WispStore;
use wispgc::report::{
    REPORT_TITLE_PREFIX, build_report, build_rollup, collect_reports, detect_anomalies,
    format_daily_digest, format_weekly_rollup, persist_report,
};
use wispgc::testing::{MemoryStore, RecordingMailer, wisp};

/// Test fixture: a store seeded with one record of each textbook outcome.
fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();

    // Closed heartbeat, 30h old, TTL 6h, no force signals: delete.
    store.insert(wisp("w-1", "heartbeat", WispStatus::Closed, 30));

    // Open patrol, 10h old, TTL 24h: skip.
    store.insert(wisp("w-2", "patrol", WispStatus::Open, 10));

    // In-progress error with a comment: promoted on proven value alone.
    let mut commented = wisp("w-3", "error", WispStatus::InProgress, 200);
    commented.comment_count = 1;
    store.insert(commented);

    store
}

mod batch {
    use super::*;

    #[tokio::test]
    async fn test_textbook_outcomes() {
        let store = seeded_store();
        let result = Compactor::new(&store, TtlPolicy::defaults())
            .run()
            .await
            .unwrap();

        assert_eq!(result.deleted.len(), 1);
        assert_eq!(result.deleted[0].id, "w-1");
        assert_eq!(result.deleted[0].reason, "TTL expired");

        assert_eq!(result.skipped, 1);

        assert_eq!(result.promoted.len(), 1);
        assert_eq!(result.promoted[0].id, "w-3");
        assert_eq!(result.promoted[0].reason, "proven value");

        assert!(store.get("w-1").is_none());
        assert!(store.get("w-2").unwrap().ephemeral);
        assert!(!store.get("w-3").unwrap().ephemeral);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let store = seeded_store();
        let compactor = Compactor::new(&store, TtlPolicy::defaults());

        compactor.run().await.unwrap();
        let second = compactor.run().await.unwrap();

        assert!(second.promoted.is_empty());
        assert!(second.deleted.is_empty());
        assert_eq!(second.skipped, 1);
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let store = seeded_store();
        store.fail_listing(true);

        let result = Compactor::new(&store, TtlPolicy::defaults()).run().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_scope_policy_changes_outcomes() {
        let store = MemoryStore::new();
        // 30h-old closed heartbeat survives under a 48h scope override.
        store.insert(wisp("w-1", "heartbeat", WispStatus::Closed, 30));
        store.set_scope_config(
            "forge",
            std::collections::HashMap::from([("heartbeat".to_string(), "48h".to_string())]),
        );

        let policy = resolve_policy(&store, Some("forge"), None).await;
        let result = Compactor::new(&store, policy).run().await.unwrap();

        assert!(result.deleted.is_empty());
        assert_eq!(result.skipped, 1);
    }
}

mod daily_digest {
    use super::*;

    #[tokio::test]
    async fn test_digest_flow_persists_and_delivers() {
        let store = seeded_store();
        let mailer = RecordingMailer::new();

        let result = Compactor::new(&store, TtlPolicy::defaults())
            .run()
            .await
            .unwrap();
        let active = store.list_ephemeral().await.unwrap();
        let mut report = build_report("2026-08-06", &result, &active);
        report.anomalies = detect_anomalies(&report);
        let rendered = format_daily_digest(&report);

        let event_id = persist_report(&store, &report, &rendered).await.unwrap();
        mailer
            .send(
                "supervisor/",
                Some("overseer/"),
                &format!("Wisp Compaction: {}", report.date),
                &rendered,
            )
            .await
            .unwrap();

        // The audit event exists, is closed, and round-trips the report.
        let events = store.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, event_id);
        assert_eq!(events[0].title, format!("{REPORT_TITLE_PREFIX}2026-08-06"));
        assert!(store.closed_ids().contains(&event_id));

        let reports = collect_reports(&store, "2026-08-01", "2026-08-06")
            .await
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].categories["Heartbeats"].deleted, 1);
        assert_eq!(reports[0].categories["Patrols"].active, 1);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Wisp Compaction: 2026-08-06");
        assert!(sent[0].body.contains("| Heartbeats | 1 | 0 | 0 |"));
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_roll_back_compaction() {
        let store = seeded_store();
        let mailer = RecordingMailer::failing();

        let result = Compactor::new(&store, TtlPolicy::defaults())
            .run()
            .await
            .unwrap();
        let report = build_report("2026-08-06", &result, &[]);
        let rendered = format_daily_digest(&report);

        let send = mailer
            .send("supervisor/", Some("overseer/"), "subject", &rendered)
            .await;
        assert!(send.is_err());

        // Compaction already happened and stays applied.
        assert!(store.get("w-1").is_none());
        assert!(!store.get("w-3").unwrap().ephemeral);
    }
}

mod weekly {
    use super::*;

    /// Two days of runs against the same store, then a rollup over the window.
    #[tokio::test]
    async fn test_rollup_over_persisted_reports() {
        let store = MemoryStore::new();

        // Day one: one heartbeat deleted, patrols active.
        store.insert(wisp("hb-1", "heartbeat", WispStatus::Closed, 30));
        store.insert(wisp("p-1", "patrol", WispStatus::Open, 1));
        let result = Compactor::new(&store, TtlPolicy::defaults())
            .run()
            .await
            .unwrap();
        let active = store.list_ephemeral().await.unwrap();
        let day_one = build_report("2026-08-04", &result, &active);
        persist_report(&store, &day_one, &format_daily_digest(&day_one))
            .await
            .unwrap();

        // Day two: another expiry, one more patrol active.
        store.insert(wisp("hb-2", "heartbeat", WispStatus::Closed, 30));
        store.insert(wisp("p-2", "patrol", WispStatus::Open, 1));
        let result = Compactor::new(&store, TtlPolicy::defaults())
            .run()
            .await
            .unwrap();
        let active = store.list_ephemeral().await.unwrap();
        let day_two = build_report("2026-08-05", &result, &active);
        persist_report(&store, &day_two, &format_daily_digest(&day_two))
            .await
            .unwrap();

        let reports = collect_reports(&store, "2026-07-30", "2026-08-06")
            .await
            .unwrap();
        let rollup = build_rollup("2026-07-30", "2026-08-06", &reports);

        assert_eq!(rollup.days, 2);
        assert_eq!(rollup.totals["Heartbeats"].deleted, 2);
        // Active is the latest snapshot: both patrols on day two.
        assert_eq!(rollup.totals["Patrols"].active, 2);

        let rendered = format_weekly_rollup(&rollup);
        assert!(rendered.contains("## Weekly Wisp Compaction: 2026-07-30 to 2026-08-06"));
        assert!(rendered.contains("**Days reported:** 2"));
        assert!(rendered.contains("| Heartbeats | 2 | 0 | 0 |"));
    }
}
