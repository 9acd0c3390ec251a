//! Test utilities for wispgc - shared fixtures and in-memory collaborators
//!
//! The engine's store and mailer seams are traits, so tests run against the
//! in-memory doubles here instead of a real record store or mail transport.
//! Both doubles support targeted failure injection.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::delivery::ReportMailer;
use crate::error::{Result, WispError};
use crate::policy::{role_identity_id, scope_identity_id};
use crate::record::{AuditEvent, EventRecord, Wisp, WispStatus};
use crate::store::WispStore;

/// Build an ephemeral test wisp of the given kind and status, last updated
/// `age_hours` ago.
pub fn wisp(id: &str, kind: &str, status: WispStatus, age_hours: i64) -> Wisp {
    let updated = (Utc::now() - Duration::hours(age_hours)).to_rfc3339();
    wisp_at(id, kind, status, &updated)
}

/// Build an ephemeral test wisp with an explicit update timestamp.
pub fn wisp_at(id: &str, kind: &str, status: WispStatus, updated_at: &str) -> Wisp {
    let label = if kind.is_empty() { "untyped" } else { kind };
    Wisp {
        id: id.to_string(),
        title: format!("{label} wisp"),
        status,
        wisp_type: kind.to_string(),
        ephemeral: true,
        labels: Vec::new(),
        comment_count: 0,
        dependency_count: 0,
        dependent_count: 0,
        description: String::new(),
        created_at: (Utc::now() - Duration::days(30)).to_rfc3339(),
        updated_at: Some(updated_at.to_string()),
    }
}

/// In-memory [`WispStore`] with failure injection for unit tests.
#[derive(Default)]
pub struct MemoryStore {
    wisps: Mutex<BTreeMap<String, Wisp>>,
    comments: Mutex<HashMap<String, Vec<String>>>,
    events: Mutex<Vec<EventRecord>>,
    closed: Mutex<HashSet<String>>,
    scope_configs: Mutex<HashMap<String, HashMap<String, String>>>,
    role_overrides: Mutex<HashMap<String, HashMap<String, String>>>,
    fail_updates: Mutex<HashSet<String>>,
    fail_deletes: Mutex<HashSet<String>>,
    fail_comments: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, wisp: Wisp) {
        self.wisps.lock().unwrap().insert(wisp.id.clone(), wisp);
    }

    pub fn get(&self, id: &str) -> Option<Wisp> {
        self.wisps.lock().unwrap().get(id).cloned()
    }

    pub fn comments_for(&self, id: &str) -> Vec<String> {
        self.comments
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().clone()
    }

    pub fn push_event(&self, event: EventRecord) {
        self.events.lock().unwrap().push(event);
    }

    pub fn closed_ids(&self) -> HashSet<String> {
        self.closed.lock().unwrap().clone()
    }

    pub fn set_scope_config(&self, scope: &str, ttls: HashMap<String, String>) {
        self.scope_configs
            .lock()
            .unwrap()
            .insert(scope.to_string(), ttls);
    }

    /// Attach labels to the scope identity record, creating it if needed.
    pub fn add_scope_labels(&self, scope: &str, labels: &[String]) {
        let id = scope_identity_id(scope);
        let mut wisps = self.wisps.lock().unwrap();
        let record = wisps.entry(id.clone()).or_insert_with(|| {
            let mut identity = wisp_at(&id, "", WispStatus::Open, &Utc::now().to_rfc3339());
            identity.title = format!("scope: {scope}");
            identity.ephemeral = false;
            identity
        });
        record.labels.extend(labels.iter().cloned());
    }

    /// Create a role record whose description carries TTL overrides.
    pub fn set_role_ttls(&self, role: &str, ttls: HashMap<String, String>) {
        self.role_overrides
            .lock()
            .unwrap()
            .insert(role.to_string(), ttls.clone());

        let id = role_identity_id(role);
        let mut record = wisp_at(&id, "", WispStatus::Open, &Utc::now().to_rfc3339());
        record.title = format!("role: {role}");
        record.ephemeral = false;
        record.description =
            serde_json::to_string(&serde_json::json!({ "wisp_ttl": ttls })).unwrap();
        self.wisps.lock().unwrap().insert(id, record);
    }

    pub fn fail_update(&self, id: &str) {
        self.fail_updates.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_delete(&self, id: &str) {
        self.fail_deletes.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_comment(&self, id: &str) {
        self.fail_comments.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl WispStore for MemoryStore {
    async fn list_ephemeral(&self) -> Result<Vec<Wisp>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(WispError::Store("listing unavailable".to_string()));
        }
        Ok(self
            .wisps
            .lock()
            .unwrap()
            .values()
            .filter(|w| w.ephemeral)
            .cloned()
            .collect())
    }

    async fn show(&self, id: &str) -> Result<Wisp> {
        self.get(id)
            .ok_or_else(|| WispError::Store(format!("record not found: {id}")))
    }

    async fn make_persistent(&self, id: &str) -> Result<()> {
        if self.fail_updates.lock().unwrap().contains(id) {
            return Err(WispError::Store(format!("update rejected: {id}")));
        }
        let mut wisps = self.wisps.lock().unwrap();
        let wisp = wisps
            .get_mut(id)
            .ok_or_else(|| WispError::Store(format!("record not found: {id}")))?;
        wisp.ephemeral = false;
        Ok(())
    }

    async fn add_comment(&self, id: &str, text: &str) -> Result<()> {
        if self.fail_comments.lock().unwrap().contains(id) {
            return Err(WispError::Store(format!("comment rejected: {id}")));
        }
        self.comments
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push(text.to_string());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.fail_deletes.lock().unwrap().contains(id) {
            return Err(WispError::Store(format!("delete rejected: {id}")));
        }
        self.wisps
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| WispError::Store(format!("record not found: {id}")))
    }

    async fn create_event(&self, event: &AuditEvent) -> Result<String> {
        let id = format!("event-{}", Uuid::new_v4());
        self.events.lock().unwrap().push(EventRecord {
            id: id.clone(),
            title: event.title.clone(),
            event_payload: event.payload.clone(),
        });
        Ok(id)
    }

    async fn close_record(&self, id: &str, _reason: &str) -> Result<()> {
        self.closed.lock().unwrap().insert(id.to_string());
        Ok(())
    }

    async fn list_events(&self) -> Result<Vec<EventRecord>> {
        Ok(self.events())
    }

    async fn scope_config(&self, scope: &str) -> Result<Option<HashMap<String, String>>> {
        Ok(self.scope_configs.lock().unwrap().get(scope).cloned())
    }

    async fn role_ttls(&self, role: &str) -> Result<Option<HashMap<String, String>>> {
        Ok(self.role_overrides.lock().unwrap().get(role).cloned())
    }
}

/// One captured send from a [`RecordingMailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub body: String,
}

/// In-memory [`ReportMailer`] capturing every send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails.
    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.fail.store(true, Ordering::SeqCst);
        mailer
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportMailer for RecordingMailer {
    async fn send(&self, to: &str, cc: Option<&str>, subject: &str, body: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WispError::Delivery("mail transport down".to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            cc: cc.map(|s| s.to_string()),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
