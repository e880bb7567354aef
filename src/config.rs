//! Configuration loading and management
//!
//! Handles parsing of `.tasksync.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::MergePolicy;

pub const CONFIG_FILE: &str = ".tasksync.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// REST server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Push channel settings
    #[serde(default)]
    pub push: PushConfig,

    /// Merge behaviour
    #[serde(default)]
    pub sync: SyncConfig,
}

/// REST server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL every route is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds (0 disables the timeout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Push channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Connect the push transport when a session starts
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `host:port` of the push endpoint
    #[serde(default = "default_push_addr")]
    pub addr: String,
}

fn default_true() -> bool {
    true
}

fn default_push_addr() -> String {
    "localhost:8001".to_string()
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: default_push_addr(),
        }
    }
}

/// Sync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Upsert pushed "created" tasks by id instead of appending them again
    #[serde(default)]
    pub dedupe_by_id: bool,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }

    fn validate(&self) -> crate::error::Result<()> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "server.base_url cannot be empty".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(crate::error::Error::InvalidConfig(format!(
                "server.base_url must start with http:// or https:// (got '{url}')"
            )));
        }
        Ok(())
    }
}

impl PushConfig {
    fn validate(&self) -> crate::error::Result<()> {
        let addr = self.addr.trim();
        let valid = addr
            .rsplit_once(':')
            .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
            .unwrap_or(false);
        if !valid {
            return Err(crate::error::Error::InvalidConfig(format!(
                "push.addr must be host:port (got '{addr}')"
            )));
        }
        Ok(())
    }
}

impl SyncConfig {
    pub fn merge_policy(&self) -> MergePolicy {
        if self.dedupe_by_id {
            MergePolicy::DedupeById
        } else {
            MergePolicy::Replay
        }
    }
}

impl Config {
    /// Load configuration from a `.tasksync.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.tasksync.toml` from `dir`, falling back to the user config
    /// file, then to defaults.
    pub fn load_from_dir(dir: &Path) -> crate::error::Result<Self> {
        let local = dir.join(CONFIG_FILE);
        if local.exists() {
            return Self::load(&local);
        }
        if let Some(global) = Self::global_path() {
            if global.exists() {
                return Self::load(&global);
            }
        }
        Ok(Self::default())
    }

    /// Per-user config file, e.g. `~/.config/tasksync/config.toml`.
    pub fn global_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tasksync")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        self.server.validate()?;
        self.push.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.server.base_url, "http://localhost:8000/api/v1");
        assert_eq!(cfg.server.timeout_secs, 30);
        assert_eq!(cfg.server.request_timeout(), Some(Duration::from_secs(30)));
        assert!(cfg.push.enabled);
        assert_eq!(cfg.push.addr, "localhost:8001");
        assert!(!cfg.sync.dedupe_by_id);
        assert_eq!(cfg.sync.merge_policy(), MergePolicy::Replay);
        cfg.validate().expect("defaults validate");
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let content = r#"
[server]
base_url = "https://tasks.example.com/api/v1"
timeout_secs = 0

[push]
enabled = false
addr = "tasks.example.com:9000"

[sync]
dedupe_by_id = true
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.server.base_url, "https://tasks.example.com/api/v1");
        assert_eq!(cfg.server.request_timeout(), None);
        assert!(!cfg.push.enabled);
        assert_eq!(cfg.push.addr, "tasks.example.com:9000");
        assert_eq!(cfg.sync.merge_policy(), MergePolicy::DedupeById);
    }

    #[test]
    fn invalid_base_url_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[server]\nbase_url = \"ftp://nope\"").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            crate::error::Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_push_addr_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[push]\naddr = \"localhost\"").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            crate::error::Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_from_dir_reads_local_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[sync]\ndedupe_by_id = true",
        )
        .expect("write config");

        let cfg = Config::load_from_dir(dir.path()).expect("load");
        assert!(cfg.sync.dedupe_by_id);
    }

    #[test]
    fn save_writes_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.toml");
        let cfg = Config::default();
        cfg.save(&path).expect("save config");

        let written = fs::read_to_string(&path).expect("read config");
        assert!(written.contains("base_url = \"http://localhost:8000/api/v1\""));
        let reloaded = Config::load(&path).expect("reload");
        assert_eq!(reloaded.push.addr, cfg.push.addr);
    }
}
