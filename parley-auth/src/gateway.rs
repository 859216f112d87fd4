//! HTTP client for the remote auth gateway

use parley_core::config::AuthConfig;
use parley_core::session::SessionRecord;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AuthError, Result};
use crate::forms::{LoginCredentials, SignupCredentials};

const LOGIN_PATH: &str = "/api/auth/local";
const REGISTER_PATH: &str = "/api/auth/local/register";

/// Client for the login and registration endpoints
#[derive(Debug, Clone)]
pub struct AuthGateway {
    client: reqwest::Client,
    base_url: String,
}

impl AuthGateway {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL requests are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange credentials for a session
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<SessionRecord> {
        debug!(identifier = %credentials.identifier, "Logging in");
        self.post(LOGIN_PATH, credentials).await
    }

    /// Create an account and receive its session
    pub async fn register(&self, credentials: &SignupCredentials) -> Result<SessionRecord> {
        debug!(username = %credentials.username, "Registering account");
        self.post(REGISTER_PATH, credentials).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<SessionRecord> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            warn!(status = status.as_u16(), "Auth gateway rejected request: {}", message);
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let has_token = value
            .get("jwt")
            .and_then(Value::as_str)
            .is_some_and(|jwt| !jwt.is_empty());
        if !has_token {
            return Err(AuthError::MissingToken);
        }

        serde_json::from_value(value).map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }
}

/// Pull a human-readable message out of an error body
///
/// Prefers `error.message`, then falls back to the raw body.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => {
            if let Some(message) = value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
            {
                return Some(message.to_string());
            }
            match value {
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            }
        }
        Err(_) => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_nested_message() {
        let body = r#"{"data":null,"error":{"status":400,"name":"ValidationError","message":"Invalid identifier or password"}}"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some("Invalid identifier or password")
        );
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(error_message(r#""quota""#).as_deref(), Some("quota"));
        assert_eq!(
            error_message(r#"{"detail":"x"}"#).as_deref(),
            Some(r#"{"detail":"x"}"#)
        );
        assert_eq!(error_message("  "), None);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let gateway = AuthGateway::new(&AuthConfig {
            base_url: "http://localhost:1337/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:1337");
    }
}
