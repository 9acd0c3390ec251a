pub mod types;

pub use types::{AuditEvent, EventRecord, Wisp, WispStatus};
