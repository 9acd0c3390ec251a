//! Subprocess-backed store adapter
//!
//! Drives the external record-store CLI with `--json` output, one short-lived
//! invocation per operation. The store binary and the root directory holding
//! per-scope configuration both come from [`crate::config::StoreConfig`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::config::StoreConfig;
use crate::error::{Result, WispError};
use crate::policy::role_identity_id;
use crate::record::{AuditEvent, EventRecord, Wisp};
use crate::store::WispStore;

/// Role-record description payload carrying TTL overrides.
#[derive(Debug, Deserialize)]
struct RoleOverrides {
    #[serde(default)]
    wisp_ttl: HashMap<String, String>,
}

/// Scope config file payload; only the TTL map is read here.
#[derive(Debug, Deserialize)]
struct ScopeConfigFile {
    #[serde(default)]
    wisp_ttl: HashMap<String, String>,
}

/// Store implementation that shells out to the record-store CLI.
pub struct ProcessStore {
    command: String,
    config_root: PathBuf,
    timeout: Duration,
}

impl ProcessStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            command: config.command.clone(),
            config_root: config.config_root.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Run one store invocation, returning stdout on success.
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.command);
        cmd.args(args).stdin(Stdio::null());

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                WispError::Store(format!(
                    "{} {} timed out after {:?}",
                    self.command,
                    args.join(" "),
                    self.timeout
                ))
            })?
            .map_err(|e| WispError::Store(format!("running {}: {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WispError::Store(format!(
                "{} {} failed: {}",
                self.command,
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl WispStore for ProcessStore {
    async fn list_ephemeral(&self) -> Result<Vec<Wisp>> {
        let out = self.run(&["list", "--json", "--all", "-n", "0"]).await?;
        let all: Vec<Wisp> = serde_json::from_slice(&out)
            .map_err(|e| WispError::Serialization(format!("parsing record list: {e}")))?;
        Ok(all.into_iter().filter(|w| w.ephemeral).collect())
    }

    async fn show(&self, id: &str) -> Result<Wisp> {
        let out = self.run(&["show", id, "--json"]).await?;
        serde_json::from_slice(&out)
            .map_err(|e| WispError::Serialization(format!("parsing record {id}: {e}")))
    }

    async fn make_persistent(&self, id: &str) -> Result<()> {
        self.run(&["update", id, "--persistent"]).await?;
        Ok(())
    }

    async fn add_comment(&self, id: &str, text: &str) -> Result<()> {
        self.run(&["comment", id, text]).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.run(&["delete", id, "--force"]).await?;
        Ok(())
    }

    async fn create_event(&self, event: &AuditEvent) -> Result<String> {
        let title = format!("--title={}", event.title);
        let category = format!("--event-category={}", event.category);
        let payload = format!("--event-payload={}", event.payload);
        let description = format!("--description={}", event.description);
        let out = self
            .run(&[
                "create",
                "--type=event",
                &title,
                &category,
                &payload,
                &description,
                "--silent",
            ])
            .await?;
        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }

    async fn close_record(&self, id: &str, reason: &str) -> Result<()> {
        let reason = format!("--reason={reason}");
        self.run(&["close", id, &reason]).await?;
        Ok(())
    }

    async fn list_events(&self) -> Result<Vec<EventRecord>> {
        let out = self
            .run(&["list", "--type=event", "--json", "--limit=0"])
            .await?;
        serde_json::from_slice(&out)
            .map_err(|e| WispError::Serialization(format!("parsing event list: {e}")))
    }

    async fn scope_config(&self, scope: &str) -> Result<Option<HashMap<String, String>>> {
        let path = self.config_root.join(scope).join("wisp.json");
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(WispError::Config(format!(
                    "reading {}: {e}",
                    path.display()
                )));
            }
        };
        let parsed: ScopeConfigFile = serde_json::from_str(&raw)
            .map_err(|e| WispError::Config(format!("parsing {}: {e}", path.display())))?;
        if parsed.wisp_ttl.is_empty() {
            return Ok(None);
        }
        Ok(Some(parsed.wisp_ttl))
    }

    async fn role_ttls(&self, role: &str) -> Result<Option<HashMap<String, String>>> {
        let record = self.show(&role_identity_id(role)).await?;
        if record.description.is_empty() {
            return Ok(None);
        }
        let Ok(overrides) = serde_json::from_str::<RoleOverrides>(&record.description) else {
            return Ok(None);
        };
        if overrides.wisp_ttl.is_empty() {
            return Ok(None);
        }
        Ok(Some(overrides.wisp_ttl))
    }
}
