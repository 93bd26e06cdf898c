// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Console Configuration
//
// Defines the configuration schema for the Aurora console:
// - Remote service location and session identity
// - Consent negotiation policy (issue attempts, retry delay, ttl default)
// - Live event aggregation timing and stream reconnect delay

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level console configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub consent: ConsentConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the Aurora service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Session identifier sent with consent requests and executions
    #[serde(default = "default_session_id")]
    pub session_id: String,

    /// Mount point of the consent endpoints
    #[serde(default = "default_consent_prefix")]
    pub consent_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentConfig {
    /// Attempts for an issue call that failed before reaching the server
    #[serde(default = "default_issue_attempts")]
    pub issue_attempts: u32,

    /// Delay between issue attempts in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// TTL used when a challenge does not carry one (0 = single-use)
    #[serde(default)]
    pub default_ttl_hours: u32,

    /// Maximum number of challenges resolved for a single plan
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Aggregation window in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Display lifetime of a single notification in milliseconds
    #[serde(default = "default_display_ms")]
    pub display_ms: u64,

    /// Upper bound of simultaneously live notifications
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,

    /// Delay before the transport resubscribes after the stream drops
    #[serde(default = "default_reconnect_ms")]
    pub reconnect_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session_id: default_session_id(),
            consent_prefix: default_consent_prefix(),
        }
    }
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            issue_attempts: default_issue_attempts(),
            retry_delay_ms: default_retry_delay(),
            default_ttl_hours: 0,
            max_rounds: default_max_rounds(),
        }
    }
}

impl ConsentConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            stream_path: default_stream_path(),
            window_ms: default_window_ms(),
            display_ms: default_display_ms(),
            max_visible: default_max_visible(),
            reconnect_ms: default_reconnect_ms(),
        }
    }
}

impl EventsConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn display_lifetime(&self) -> Duration {
        Duration::from_millis(self.display_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_session_id() -> String {
    "aurora-console".to_string()
}

fn default_consent_prefix() -> String {
    "/consent".to_string()
}

fn default_issue_attempts() -> u32 {
    1
}

fn default_retry_delay() -> u64 {
    250
}

fn default_max_rounds() -> u32 {
    4
}

fn default_stream_path() -> String {
    "/events/stream".to_string()
}

fn default_window_ms() -> u64 {
    2000
}

fn default_display_ms() -> u64 {
    5000
}

fn default_max_visible() -> usize {
    32
}

fn default_reconnect_ms() -> u64 {
    3000
}

impl ConsoleConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. AURORA_CONFIG_PATH environment variable
    /// 2. ./aurora-config.yaml (working directory)
    /// 3. ~/.aurora/config.yaml (user home)
    /// 4. /etc/aurora/config.yaml (system, Unix) or C:\ProgramData\Aurora\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        Self::candidate_paths().into_iter().find(|p| p.exists())
    }

    /// Every location checked by `discover_config`, in order.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(path) = std::env::var("AURORA_CONFIG_PATH") {
            paths.push(PathBuf::from(path));
        }

        paths.push(PathBuf::from("./aurora-config.yaml"));

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".aurora").join("config.yaml"));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/aurora/config.yaml"));
        #[cfg(windows)]
        paths.push(PathBuf::from("C:\\ProgramData\\Aurora\\config.yaml"));

        paths
    }

    /// Load from an explicit path (failing if it is missing), else from the
    /// discovered path, else defaults. Environment overrides apply last.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("AURORA_API_URL") {
            if !val.trim().is_empty() {
                tracing::info!("Environment override: AURORA_API_URL={}", val);
                self.api.base_url = val;
            }
        }

        if let Ok(val) = std::env::var("AURORA_SESSION_ID") {
            if !val.trim().is_empty() {
                tracing::info!("Environment override: AURORA_SESSION_ID={}", val);
                self.api.session_id = val;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.api.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid api.base_url '{}': {}", self.api.base_url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("api.base_url must use http or https, got '{}'", url.scheme());
        }

        if self.api.session_id.trim().is_empty() {
            anyhow::bail!("api.session_id cannot be empty");
        }

        if self.consent.issue_attempts == 0 {
            anyhow::bail!("consent.issue_attempts must be at least 1");
        }

        if self.consent.max_rounds == 0 {
            anyhow::bail!("consent.max_rounds must be at least 1");
        }

        if self.consent.default_ttl_hours > crate::domain::consent::MAX_TTL_HOURS {
            anyhow::bail!(
                "consent.default_ttl_hours cannot exceed {}",
                crate::domain::consent::MAX_TTL_HOURS
            );
        }

        if self.events.window_ms == 0 {
            anyhow::bail!("events.window_ms must be greater than 0");
        }

        if self.events.display_ms == 0 {
            anyhow::bail!("events.display_ms must be greater than 0");
        }

        if self.events.max_visible == 0 {
            anyhow::bail!("events.max_visible must be greater than 0");
        }

        if !self.events.stream_path.starts_with('/') {
            anyhow::bail!("events.stream_path must start with '/'");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.api.consent_prefix, "/consent");
        assert_eq!(config.events.window(), Duration::from_millis(2000));
        assert_eq!(config.events.display_lifetime(), Duration::from_millis(5000));
        assert_eq!(config.consent.issue_attempts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
api:
  base_url: "https://aurora.internal:9000"
events:
  window_ms: 1500
"#;
        let config = ConsoleConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://aurora.internal:9000");
        assert_eq!(config.api.session_id, "aurora-console");
        assert_eq!(config.events.window_ms, 1500);
        assert_eq!(config.events.display_ms, 5000);
        assert_eq!(config.consent.max_rounds, 4);
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aurora-config.yaml");

        let mut config = ConsoleConfig::default();
        config.api.session_id = "ops-desk".to_string();
        std::fs::write(&path, config.to_yaml_string().unwrap()).unwrap();

        let loaded = ConsoleConfig::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.api.session_id, "ops-desk");
    }

    #[test]
    fn test_missing_explicit_path_fails() {
        let result = ConsoleConfig::load_or_default(Some(PathBuf::from("/nonexistent/aurora.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = ConsoleConfig::default();

        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
        config.api.base_url = "http://localhost:8000".to_string();

        config.events.window_ms = 0;
        assert!(config.validate().is_err());
        config.events.window_ms = 2000;

        config.events.max_visible = 0;
        assert!(config.validate().is_err());
        config.events.max_visible = 8;

        config.consent.issue_attempts = 0;
        assert!(config.validate().is_err());
        config.consent.issue_attempts = 3;

        config.consent.default_ttl_hours = 500;
        assert!(config.validate().is_err());
        config.consent.default_ttl_hours = 24;

        assert!(config.validate().is_ok());
    }
}
