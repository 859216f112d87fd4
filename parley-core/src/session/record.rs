//! Session records and the protected-access guard

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::manager::SessionStore;
use crate::message::SenderId;

/// User object returned by the auth gateway
///
/// Only `id` is interpreted; every other field is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: SenderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Persisted authentication state, always replaced wholesale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Bearer token issued by the gateway
    pub jwt: String,
    /// Authenticated user
    pub user: UserProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Any other top-level fields of the gateway response
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionRecord {
    /// Stamp a freshly issued session with its lifetime
    pub fn issue(mut self, now: DateTime<Utc>, ttl: Duration) -> crate::Result<Self> {
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            crate::Error::Validation(format!("session lifetime {} overflows the clock", ttl))
        })?;
        self.issued_at = Some(now);
        self.expires_at = Some(expires_at);
        Ok(self)
    }

    /// Records without an expiry count as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires| expires <= now)
    }

    /// Identity used as `sender_id` on outgoing messages
    pub fn user_id(&self) -> &SenderId {
        &self.user.id
    }

    /// Human-friendly name of the user
    pub fn display_name(&self) -> String {
        self.user
            .username
            .clone()
            .or_else(|| self.user.email.clone())
            .unwrap_or_else(|| self.user.id.to_string())
    }
}

/// Hook deciding whether a stored session may still be used
pub trait SessionValidator: Send + Sync {
    fn validate(&self, record: &SessionRecord) -> Result<(), String>;
}

/// Accepts any record carrying a non-blank token
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenPresent;

impl SessionValidator for TokenPresent {
    fn validate(&self, record: &SessionRecord) -> Result<(), String> {
        if record.jwt.trim().is_empty() {
            Err("session token is empty".to_string())
        } else {
            Ok(())
        }
    }
}

/// Checks the stored session at every protected access
pub struct SessionGuard {
    store: SessionStore,
    validator: Box<dyn SessionValidator>,
}

impl SessionGuard {
    /// Create a guard with the default [`TokenPresent`] validator
    pub fn new(store: SessionStore) -> Self {
        Self::with_validator(store, TokenPresent)
    }

    pub fn with_validator(store: SessionStore, validator: impl SessionValidator + 'static) -> Self {
        Self {
            store,
            validator: Box::new(validator),
        }
    }

    /// Return the current session if present, unexpired and valid
    pub fn current(&self) -> crate::Result<SessionRecord> {
        self.current_at(Utc::now())
    }

    pub fn current_at(&self, now: DateTime<Utc>) -> crate::Result<SessionRecord> {
        let key = &self.store.keys().session;
        let record = match self.store.read::<SessionRecord>(key) {
            Ok(Some(record)) => record,
            Ok(None) => return Err(crate::Error::Unauthorized("not logged in".to_string())),
            Err(crate::Error::Serialization(e)) => {
                warn!("Ignoring unreadable session record: {}", e);
                return Err(crate::Error::Unauthorized(
                    "stored session is unreadable".to_string(),
                ));
            }
            Err(e) => return Err(e),
        };

        if record.is_expired(now) {
            debug!(user = %record.user.id, "Session expired");
            return Err(crate::Error::Unauthorized("session expired".to_string()));
        }

        self.validator
            .validate(&record)
            .map_err(crate::Error::Unauthorized)?;

        Ok(record)
    }

    /// Whether a usable session exists right now
    pub fn is_authenticated(&self) -> bool {
        self.current().is_ok()
    }

    /// Persist a new session, replacing any previous one
    pub fn save(&self, record: &SessionRecord) -> crate::Result<()> {
        self.store.write(&self.store.keys().session, record)
    }

    /// Remove the session record; the message history is kept
    pub fn clear(&self) -> crate::Result<()> {
        self.store.delete(&self.store.keys().session)
    }
}
