//! Record-store access
//!
//! The engine only ever touches the external store through the narrow
//! [`WispStore`] trait, so the decision and report logic can run against an
//! in-memory double (see [`crate::testing`]). The production implementation,
//! [`ProcessStore`], drives the record-store CLI as a subprocess.

pub mod process;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::policy::scope_identity_id;
use crate::record::{AuditEvent, EventRecord, Wisp};

pub use process::ProcessStore;

/// Capability interface over the external record store.
#[async_trait]
pub trait WispStore: Send + Sync {
    /// All ephemeral records, across every status, unbounded.
    async fn list_ephemeral(&self) -> Result<Vec<Wisp>>;

    /// Fetch a single record by id.
    async fn show(&self, id: &str) -> Result<Wisp>;

    /// Clear the ephemeral flag, making the record permanent.
    async fn make_persistent(&self, id: &str) -> Result<()>;

    /// Append a comment to a record.
    async fn add_comment(&self, id: &str, text: &str) -> Result<()>;

    /// Remove a record permanently. The store's own history mechanism is
    /// responsible for recoverability.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Persist an audit event record, returning its id.
    async fn create_event(&self, event: &AuditEvent) -> Result<String>;

    /// Close a record with a reason.
    async fn close_record(&self, id: &str, reason: &str) -> Result<()>;

    /// All event records, unbounded.
    async fn list_events(&self) -> Result<Vec<EventRecord>>;

    /// Scope-level kind → duration-string TTL overrides, if configured.
    async fn scope_config(&self, scope: &str) -> Result<Option<HashMap<String, String>>>;

    /// Labels on the scope identity record.
    async fn scope_labels(&self, scope: &str) -> Result<Vec<String>> {
        Ok(self.show(&scope_identity_id(scope)).await?.labels)
    }

    /// Role-record kind → duration-string TTL overrides, if present.
    async fn role_ttls(&self, role: &str) -> Result<Option<HashMap<String, String>>>;
}
