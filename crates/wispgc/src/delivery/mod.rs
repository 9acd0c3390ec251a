//! Report delivery
//!
//! Rendered digests leave the engine through the narrow [`ReportMailer`]
//! trait. The production implementation drives the external mail command; a
//! send failure is surfaced as a run failure, but only after compaction has
//! already been durably applied.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::DeliveryConfig;
use crate::error::{Result, WispError};

/// Capability interface for sending rendered reports.
#[async_trait]
pub trait ReportMailer: Send + Sync {
    async fn send(&self, to: &str, cc: Option<&str>, subject: &str, body: &str) -> Result<()>;
}

/// Mailer that shells out to the configured mail command.
///
/// Invocation shape: `<command> send <to> -s <subject> -m <body> [--cc <cc>]`.
pub struct ProcessMailer {
    command: String,
}

impl ProcessMailer {
    pub fn new(config: &DeliveryConfig) -> Self {
        Self {
            command: config.command.clone(),
        }
    }
}

#[async_trait]
impl ReportMailer for ProcessMailer {
    async fn send(&self, to: &str, cc: Option<&str>, subject: &str, body: &str) -> Result<()> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("send")
            .arg(to)
            .args(["-s", subject, "-m", body])
            .stdin(Stdio::null());
        if let Some(cc) = cc {
            cmd.args(["--cc", cc]);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| WispError::Delivery(format!("running {}: {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WispError::Delivery(format!(
                "sending to {to}: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}
