//! Configuration validation rules.

use super::schema::{Config, MAX_SESSION_TTL_SECS};

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let base_url = config.auth.base_url.trim();
    if base_url.is_empty() {
        errors.push("auth.base_url must not be empty".to_string());
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push("auth.base_url must be an http(s) URL".to_string());
    }
    if config.auth.timeout_secs == 0 {
        errors.push("auth.timeout_secs must be > 0".to_string());
    }

    let realtime_url = config.realtime.url.trim();
    if !(realtime_url.starts_with("ws://") || realtime_url.starts_with("wss://")) {
        errors.push("realtime.url must be a ws(s) URL".to_string());
    }
    if config.realtime.reconnect_delay_secs == 0 {
        errors.push("realtime.reconnect_delay_secs must be > 0".to_string());
    }
    if config.realtime.event.trim().is_empty() {
        errors.push("realtime.event must not be empty".to_string());
    }

    if config.storage.dir.trim().is_empty() {
        errors.push("storage.dir must not be empty".to_string());
    }
    if config.storage.key_prefix.trim().is_empty() {
        errors.push("storage.key_prefix must not be empty".to_string());
    }

    if config.session.ttl_secs == 0 {
        errors.push("session.ttl_secs must be > 0".to_string());
    } else if config.session.ttl_secs > MAX_SESSION_TTL_SECS {
        errors.push(format!(
            "session.ttl_secs must be <= {} (ten years)",
            MAX_SESSION_TTL_SECS
        ));
    }
    if config.chat.max_messages == 0 {
        errors.push("chat.max_messages must be > 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
