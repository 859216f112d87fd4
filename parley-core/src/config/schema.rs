//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for parley
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Auth gateway configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Realtime channel configuration
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Local storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Session policy
    #[serde(default)]
    pub session: SessionConfig,
    /// Chat behaviour
    #[serde(default)]
    pub chat: ChatConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "~/.parley/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Auth gateway (remote HTTP API) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL the auth endpoints are resolved against
    #[serde(default = "default_api_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_auth_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:1337".to_string()
}

fn default_auth_timeout() -> u64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_secs: default_auth_timeout(),
        }
    }
}

/// Realtime channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint
    #[serde(default = "default_realtime_url")]
    pub url: String,
    /// Event name carrying chat messages
    #[serde(default = "default_chat_event")]
    pub event: String,
    /// Delay before reconnecting after a dropped connection
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

fn default_realtime_url() -> String {
    "ws://localhost:1337".to_string()
}

fn default_chat_event() -> String {
    "chat message".to_string()
}

fn default_reconnect_delay() -> u64 {
    5
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_realtime_url(),
            event: default_chat_event(),
            reconnect_delay_secs: default_reconnect_delay(),
        }
    }
}

/// Key-value storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the stored keys
    #[serde(default = "default_storage_dir")]
    pub dir: String,
    /// Prefix shared by the session and message keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_storage_dir() -> String {
    "~/.parley/storage".to_string()
}

fn default_key_prefix() -> String {
    "parley_user".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// Session lifetime policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds a stored session stays valid after login
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
}

/// Longest accepted session lifetime (ten years)
pub const MAX_SESSION_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

fn default_session_ttl() -> u64 {
    7 * 24 * 3600
}

impl SessionConfig {
    /// Session lifetime as a chrono duration
    pub fn ttl(&self) -> crate::Result<chrono::Duration> {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                crate::Error::Validation(format!(
                    "session.ttl_secs {} is out of range",
                    self.ttl_secs
                ))
            })
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
        }
    }
}

/// Chat view settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum number of retained messages (oldest dropped first)
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// Drop inbound messages whose id is already in the sequence
    #[serde(default = "default_dedupe_echoes")]
    pub dedupe_echoes: bool,
}

fn default_max_messages() -> usize {
    1000
}

fn default_dedupe_echoes() -> bool {
    true
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            dedupe_echoes: default_dedupe_echoes(),
        }
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    std::path::PathBuf::from(path)
}
