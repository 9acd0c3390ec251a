//! Per-record compaction decisions and batch execution
//!
//! [`classify`] turns one ephemeral record plus the effective TTL table into a
//! terminal decision; [`Compactor`] applies decisions across the whole
//! candidate set, either live or in dry-run mode. A mutation failure is
//! captured as a per-record error and never aborts the batch, so re-running
//! after a partial failure is always safe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::policy::TtlPolicy;
use crate::record::{Wisp, WispStatus};
use crate::store::WispStore;

/// Terminal classification for one record in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Clear the ephemeral flag and append an audit comment
    Promote(&'static str),
    /// Remove the record permanently
    Delete(&'static str),
    /// Leave untouched; still within TTL
    Skip,
}

/// Classify a single ephemeral record against the TTL table.
///
/// Records with comments, references, or a keep label are always promoted.
/// Past their TTL, non-closed records promote (something is stuck and deserves
/// durable visibility) while closed records delete. Fails only on an
/// unparsable timestamp.
pub fn classify(wisp: &Wisp, policy: &TtlPolicy, now: DateTime<Utc>) -> Result<Decision> {
    let age = wisp.age(now)?;
    let ttl = policy.effective(wisp.kind());
    let force_promote = wisp.has_comments() || wisp.is_referenced() || wisp.has_keep_label();

    let decision = if !wisp.status.is_closed() {
        if force_promote {
            Decision::Promote("proven value")
        } else if age > ttl {
            if wisp.status == WispStatus::InProgress {
                Decision::Promote("stuck in_progress past TTL")
            } else {
                Decision::Promote("open past TTL")
            }
        } else {
            Decision::Skip
        }
    } else if force_promote {
        Decision::Promote("proven value")
    } else if age > ttl {
        Decision::Delete("TTL expired")
    } else {
        Decision::Skip
    };

    Ok(decision)
}

/// What happened to one record during compaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionAction {
    pub id: String,
    pub title: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub wisp_type: String,
}

/// Accumulated outcome of one compaction batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompactionResult {
    #[serde(default)]
    pub promoted: Vec<CompactionAction>,
    #[serde(default)]
    pub deleted: Vec<CompactionAction>,
    /// Records still within TTL
    #[serde(default)]
    pub skipped: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl CompactionResult {
    /// Total records scanned, including skips.
    pub fn total(&self) -> usize {
        self.promoted.len() + self.deleted.len() + self.skipped as usize
    }
}

/// Applies TTL-based compaction across the ephemeral candidate set.
pub struct Compactor<'a> {
    store: &'a dyn WispStore,
    policy: TtlPolicy,
    dry_run: bool,
}

impl<'a> Compactor<'a> {
    pub fn new(store: &'a dyn WispStore, policy: TtlPolicy) -> Self {
        Self {
            store,
            policy,
            dry_run: false,
        }
    }

    /// In dry-run mode decisions are recorded but nothing is mutated.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one compaction batch against the current clock.
    pub async fn run(&self) -> Result<CompactionResult> {
        self.run_at(Utc::now()).await
    }

    /// Run one compaction batch with an explicit clock.
    ///
    /// Only the candidate listing is fatal; every per-record failure lands in
    /// `result.errors` and processing continues.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<CompactionResult> {
        let wisps = self.store.list_ephemeral().await?;
        tracing::debug!(candidates = wisps.len(), dry_run = self.dry_run, "compacting");

        let mut result = CompactionResult::default();
        for wisp in &wisps {
            match classify(wisp, &self.policy, now) {
                Ok(Decision::Promote(reason)) => self.promote(wisp, reason, &mut result).await,
                Ok(Decision::Delete(reason)) => self.delete(wisp, reason, &mut result).await,
                Ok(Decision::Skip) => {
                    result.skipped += 1;
                    tracing::debug!(id = %wisp.id, kind = wisp.kind(), "skip: within ttl");
                }
                Err(e) => result.errors.push(format!("{}: {e}", wisp.id)),
            }
        }
        Ok(result)
    }

    async fn promote(&self, wisp: &Wisp, reason: &'static str, result: &mut CompactionResult) {
        if !self.dry_run {
            if let Err(e) = self.store.make_persistent(&wisp.id).await {
                result.errors.push(format!("promote {}: {e}", wisp.id));
                return;
            }
            // Best-effort: the promotion itself stands even if the comment fails.
            let comment = format!("Promoted during compaction: {reason}");
            if let Err(e) = self.store.add_comment(&wisp.id, &comment).await {
                tracing::warn!(id = %wisp.id, error = %e, "failed to comment on promoted record");
            }
        }

        tracing::debug!(id = %wisp.id, kind = wisp.kind(), reason, "promote");
        result.promoted.push(action_for(wisp, reason));
    }

    async fn delete(&self, wisp: &Wisp, reason: &'static str, result: &mut CompactionResult) {
        if !self.dry_run {
            if let Err(e) = self.store.delete(&wisp.id).await {
                result.errors.push(format!("delete {}: {e}", wisp.id));
                return;
            }
        }

        tracing::debug!(id = %wisp.id, kind = wisp.kind(), reason, "delete");
        result.deleted.push(action_for(wisp, reason));
    }
}

fn action_for(wisp: &Wisp, reason: &str) -> CompactionAction {
    CompactionAction {
        id: wisp.id.clone(),
        title: wisp.title.clone(),
        reason: reason.to_string(),
        wisp_type: wisp.wisp_type.clone(),
    }
}
