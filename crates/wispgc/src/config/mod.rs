//! Tool configuration
//!
//! TOML config for the external collaborators (record store, mail command)
//! and default compaction inputs. Every field has a default so a missing or
//! partial config file always resolves.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WispError};

/// Main configuration structure for wispgc
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// External record-store access
    #[serde(default)]
    pub store: StoreConfig,
    /// Report delivery recipients and transport
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Default compaction inputs
    #[serde(default)]
    pub compaction: CompactionConfig,
}

impl Config {
    /// Load configuration from an explicit path, or search the default
    /// locations, falling back to defaults when nothing is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_file(path);
        }

        let default_paths = [
            dirs::home_dir().map(|h| h.join(".wispgc").join("config.toml")),
            dirs::config_dir().map(|c| c.join("wispgc").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WispError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| WispError::Config(format!("Failed to parse config: {e}")))
    }
}

/// External record-store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Record-store CLI to drive (must support `--json` output)
    #[serde(default = "default_store_command")]
    pub command: String,
    /// Root directory holding per-scope configuration files
    #[serde(default = "default_config_root")]
    pub config_root: PathBuf,
    /// Per-invocation timeout in seconds
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            command: default_store_command(),
            config_root: default_config_root(),
            timeout_secs: default_store_timeout_secs(),
        }
    }
}

fn default_store_command() -> String {
    "bd".to_string()
}

fn default_config_root() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".wispgc"))
        .unwrap_or_else(|| PathBuf::from(".wispgc"))
}

fn default_store_timeout_secs() -> u64 {
    30
}

/// Report delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    /// Mail command to drive
    #[serde(default = "default_delivery_command")]
    pub command: String,
    /// Daily digest recipient
    #[serde(default = "default_digest_to")]
    pub digest_to: String,
    /// Daily digest cc recipient
    #[serde(default = "default_digest_cc")]
    pub digest_cc: String,
    /// Weekly rollup recipient
    #[serde(default = "default_rollup_to")]
    pub rollup_to: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            command: default_delivery_command(),
            digest_to: default_digest_to(),
            digest_cc: default_digest_cc(),
            rollup_to: default_rollup_to(),
        }
    }
}

fn default_delivery_command() -> String {
    "gt-mail".to_string()
}

fn default_digest_to() -> String {
    "supervisor/".to_string()
}

fn default_digest_cc() -> String {
    "overseer/".to_string()
}

fn default_rollup_to() -> String {
    "overseer/".to_string()
}

/// Default compaction inputs, overridable per invocation
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CompactionConfig {
    /// Scope whose TTL overrides apply
    #[serde(default)]
    pub scope: Option<String>,
    /// Role whose TTL overrides apply
    #[serde(default)]
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.store.command, "bd");
        assert_eq!(config.store.timeout_secs, 30);
        assert_eq!(config.delivery.command, "gt-mail");
        assert_eq!(config.delivery.digest_to, "supervisor/");
        assert_eq!(config.delivery.digest_cc, "overseer/");
        assert_eq!(config.delivery.rollup_to, "overseer/");
        assert!(config.compaction.scope.is_none());
        assert!(config.compaction.role.is_none());
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[store]
command = "beads"
config_root = "/srv/town"
timeout_secs = 10

[delivery]
command = "townmail"
digest_to = "deacon/"
digest_cc = "mayor/"
rollup_to = "mayor/"

[compaction]
scope = "forge"
role = "watchman"
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to parse TOML");

        assert_eq!(config.store.command, "beads");
        assert_eq!(config.store.config_root, PathBuf::from("/srv/town"));
        assert_eq!(config.store.timeout_secs, 10);
        assert_eq!(config.delivery.command, "townmail");
        assert_eq!(config.delivery.digest_to, "deacon/");
        assert_eq!(config.delivery.digest_cc, "mayor/");
        assert_eq!(config.delivery.rollup_to, "mayor/");
        assert_eq!(config.compaction.scope.as_deref(), Some("forge"));
        assert_eq!(config.compaction.role.as_deref(), Some("watchman"));
    }

    #[test]
    fn test_toml_partial_deserialization() {
        let toml_str = r#"
[store]
command = "beads"
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to parse partial TOML");

        assert_eq!(config.store.command, "beads");
        assert_eq!(config.store.timeout_secs, 30);
        assert_eq!(config.delivery.digest_to, "supervisor/");
        assert!(config.compaction.scope.is_none());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[compaction]\nscope = \"forge\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.compaction.scope.as_deref(), Some("forge"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let err = Config::load(Some(Path::new("/nonexistent/wispgc.toml"))).unwrap_err();
        assert!(matches!(err, WispError::Config(_)));
    }

    #[test]
    fn test_load_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, WispError::Config(_)));
    }
}
