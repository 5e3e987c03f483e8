//! Relay configuration loaded from `~/.agent-relay/relay.toml`.
//!
//! Every field has a default, so a missing file or a file that only sets a
//! few keys is fine. A file that fails to parse is reported and ignored.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings shared by the coordinator, page and popup contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the local agent service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout for calls to the agent service, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Agent whose history the popup shows.
    #[serde(default = "default_history_agent")]
    pub history_agent: String,

    /// Letter of the explain chord (`Shift+<key>`).
    #[serde(default = "default_explain_key")]
    pub explain_key: char,

    /// Letter of the console chord (`Ctrl+Shift+<key>`).
    #[serde(default = "default_console_key")]
    pub console_key: char,

    /// Where the last-explanation side-channel is persisted.
    /// When unset, the side-channel is kept in memory only.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            history_agent: default_history_agent(),
            explain_key: default_explain_key(),
            console_key: default_console_key(),
            state_file: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".into()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_history_agent() -> String {
    "GoogleExplainer".into()
}

fn default_explain_key() -> char {
    'E'
}

fn default_console_key() -> char {
    'Q'
}

/// Default location of the config file.
pub fn default_config_path() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".agent-relay")
        .join("relay.toml")
}

impl RelayConfig {
    /// Load configuration from the default config file.
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring malformed config {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.history_agent, "GoogleExplainer");
        assert_eq!(config.explain_key, 'E');
        assert_eq!(config.console_key, 'Q');
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert!(config.state_file.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "base_url = \"http://127.0.0.1:9000\"\nconsole_key = \"K\"\n").unwrap();

        let config = RelayConfig::load_from(&path);
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.console_key, 'K');
        assert_eq!(config.explain_key, 'E');
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn test_missing_or_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert_eq!(RelayConfig::load_from(&missing), RelayConfig::default());

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "base_url = [not toml").unwrap();
        assert_eq!(RelayConfig::load_from(&bad), RelayConfig::default());
    }
}
