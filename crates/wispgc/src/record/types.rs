//! Record types for the wispgc engine
//!
//! Defines the wire shapes exchanged with the external record store: the
//! ephemeral `Wisp` record itself plus the audit-event shapes used to persist
//! and re-read daily compaction reports.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WispError};

/// An ephemeral work-tracking record as listed by the external store.
///
/// Timestamps stay strings so that a single malformed record surfaces as a
/// per-record error instead of failing the whole listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wisp {
    /// Opaque record identifier
    pub id: String,
    /// Human-readable title
    pub title: String,
    /// Workflow status
    pub status: WispStatus,
    /// Kind tag; empty means "default"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub wisp_type: String,
    /// Only ephemeral records are compaction candidates
    #[serde(default)]
    pub ephemeral: bool,
    /// Free-form labels attached to the record
    #[serde(default)]
    pub labels: Vec<String>,
    /// Number of comments on the record
    #[serde(default)]
    pub comment_count: u32,
    /// Outgoing reference count
    #[serde(default)]
    pub dependency_count: u32,
    /// Incoming reference count
    #[serde(default)]
    pub dependent_count: u32,
    /// Free-form body; role records carry structured overrides here
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Creation timestamp (ISO-8601)
    #[serde(default)]
    pub created_at: String,
    /// Last-update timestamp (ISO-8601), preferred over `created_at` for age
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Wisp {
    /// Kind tag used for TTL lookup and categorization. Empty maps to "default".
    pub fn kind(&self) -> &str {
        if self.wisp_type.is_empty() {
            "default"
        } else {
            &self.wisp_type
        }
    }

    /// Age relative to `now`, from the update timestamp with creation as
    /// fallback. Fails if neither parses as an ISO-8601 instant.
    pub fn age(&self, now: DateTime<Utc>) -> Result<Duration> {
        let ts = self
            .updated_at
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.created_at);
        let t = parse_timestamp(ts)?;
        Ok(now.signed_duration_since(t))
    }

    pub fn has_comments(&self) -> bool {
        self.comment_count > 0
    }

    /// Whether any other record references this one, in either direction.
    pub fn is_referenced(&self) -> bool {
        self.dependent_count > 0 || self.dependency_count > 0
    }

    /// Explicit keep marker; such records are always promoted.
    pub fn has_keep_label(&self) -> bool {
        self.labels.iter().any(|l| l == "keep" || l == "gt:keep")
    }
}

/// Workflow status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WispStatus {
    /// Open and actionable
    Open,
    /// Claimed and being worked
    InProgress,
    /// Resolved
    Closed,
}

impl WispStatus {
    pub fn is_closed(self) -> bool {
        matches!(self, WispStatus::Closed)
    }
}

/// Write shape for a persisted audit event record.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Record title; report events use "Compaction Report <date>"
    pub title: String,
    /// Event category tag
    pub category: String,
    /// Structured JSON payload
    pub payload: String,
    /// Rendered text body
    pub description: String,
}

/// Read shape for listed event records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    /// Structured payload; may be absent or unparsable on old records
    #[serde(default)]
    pub event_payload: String,
}

fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(ts) {
        return Ok(t.with_timezone(&Utc));
    }
    // Zone-less timestamps from older store versions are treated as UTC.
    if let Ok(t) = NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S") {
        return Ok(t.and_utc());
    }
    Err(WispError::Timestamp(format!("parsing timestamp {ts:?}")))
}
