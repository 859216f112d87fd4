//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const CONFIG_FILE: &str = "config.json";

/// A config field that can be set from the environment
#[derive(Debug, Clone, Copy)]
enum Field {
    AuthBaseUrl,
    AuthTimeout,
    RealtimeUrl,
    RealtimeEvent,
    ReconnectDelay,
    StorageDir,
    KeyPrefix,
    SessionTtl,
    MaxMessages,
    DedupeEchoes,
    LogLevel,
    LogFormat,
    LogDir,
}

/// Environment overrides, applied in order so later entries win.
///
/// The short aliases come first; `PARLEY__SECTION__FIELD` names follow.
const ENV_OVERRIDES: &[(&str, Field)] = &[
    ("PARLEY_API_URL", Field::AuthBaseUrl),
    ("PARLEY_REALTIME_URL", Field::RealtimeUrl),
    ("PARLEY__AUTH__BASE_URL", Field::AuthBaseUrl),
    ("PARLEY__AUTH__TIMEOUT_SECS", Field::AuthTimeout),
    ("PARLEY__REALTIME__URL", Field::RealtimeUrl),
    ("PARLEY__REALTIME__EVENT", Field::RealtimeEvent),
    ("PARLEY__REALTIME__RECONNECT_DELAY_SECS", Field::ReconnectDelay),
    ("PARLEY__STORAGE__DIR", Field::StorageDir),
    ("PARLEY__STORAGE__KEY_PREFIX", Field::KeyPrefix),
    ("PARLEY__SESSION__TTL_SECS", Field::SessionTtl),
    ("PARLEY__CHAT__MAX_MESSAGES", Field::MaxMessages),
    ("PARLEY__CHAT__DEDUPE_ECHOES", Field::DedupeEchoes),
    ("PARLEY__LOGGING__LEVEL", Field::LogLevel),
    ("PARLEY__LOGGING__FORMAT", Field::LogFormat),
    ("PARLEY__LOGGING__DIR", Field::LogDir),
];

impl Field {
    fn apply(self, config: &mut Config, raw: &str) -> Result<(), String> {
        match self {
            Field::AuthBaseUrl => config.auth.base_url = raw.to_string(),
            Field::AuthTimeout => config.auth.timeout_secs = parse_number(raw)?,
            Field::RealtimeUrl => config.realtime.url = raw.to_string(),
            Field::RealtimeEvent => config.realtime.event = raw.to_string(),
            Field::ReconnectDelay => config.realtime.reconnect_delay_secs = parse_number(raw)?,
            Field::StorageDir => config.storage.dir = raw.to_string(),
            Field::KeyPrefix => config.storage.key_prefix = raw.to_string(),
            Field::SessionTtl => config.session.ttl_secs = parse_number(raw)?,
            Field::MaxMessages => config.chat.max_messages = parse_number(raw)?,
            Field::DedupeEchoes => config.chat.dedupe_echoes = parse_flag(raw)?,
            Field::LogLevel => config.logging.level = raw.to_string(),
            Field::LogFormat => config.logging.format = raw.to_string(),
            Field::LogDir => config.logging.dir = raw.to_string(),
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(raw: &str) -> Result<T, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("expected a whole number, got {:?}", raw))
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(format!("expected true or false, got {:?}", raw)),
    }
}

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Loader for `~/.parley`
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".parley"))
            .unwrap_or_else(|| PathBuf::from(".parley"));

        Self { config_dir }
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load `config.json` over the defaults, then the process environment
    pub fn load(&self) -> crate::Result<Config> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Like [`ConfigLoader::load`], reading overrides through `lookup`
    pub fn load_with_env<F>(&self, lookup: F) -> crate::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.read_file()?;

        let mut errors = Vec::new();
        for &(name, field) in ENV_OVERRIDES {
            let Some(raw) = lookup(name) else {
                continue;
            };
            debug!(var = name, "Applying environment override");
            if let Err(e) = field.apply(&mut config, &raw) {
                errors.push(format!("{}: {}", name, e));
            }
        }
        if !errors.is_empty() {
            return Err(crate::Error::Validation(errors.join("; ")));
        }

        validate_config(&config)?;
        Ok(config)
    }

    fn read_file(&self) -> crate::Result<Config> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            crate::Error::Serialization(format!("{}: {}", path.display(), e))
        })
    }

    /// Write `config` as pretty JSON, creating the directory if needed
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::write(self.config_path(), serde_json::to_string_pretty(config)?)?;
        Ok(())
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the config file inside the config directory
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
