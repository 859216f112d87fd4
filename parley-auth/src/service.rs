//! Login, signup and logout flows

use chrono::{Duration, Utc};
use parley_core::session::{SessionGuard, SessionRecord};
use tracing::info;

use crate::error::Result;
use crate::forms::{LoginForm, SignupForm};
use crate::gateway::AuthGateway;

/// Ties the gateway to local session persistence
pub struct AuthService {
    gateway: AuthGateway,
    guard: SessionGuard,
    ttl: Duration,
}

impl AuthService {
    pub fn new(gateway: AuthGateway, guard: SessionGuard, ttl: Duration) -> Self {
        Self {
            gateway,
            guard,
            ttl,
        }
    }

    /// Validate, authenticate and persist a new session
    pub async fn login(&self, form: &LoginForm) -> Result<SessionRecord> {
        let credentials = form.validate()?;
        let record = self.gateway.login(&credentials).await?;
        self.persist(record)
    }

    /// Validate, register and persist a new session
    pub async fn signup(&self, form: &SignupForm) -> Result<SessionRecord> {
        let credentials = form.validate()?;
        let record = self.gateway.register(&credentials).await?;
        self.persist(record)
    }

    /// Forget the stored session
    pub fn logout(&self) -> Result<()> {
        self.guard.clear()?;
        info!("Logged out");
        Ok(())
    }

    /// The current valid session, if any
    pub fn current(&self) -> parley_core::Result<SessionRecord> {
        self.guard.current()
    }

    fn persist(&self, record: SessionRecord) -> Result<SessionRecord> {
        let record = record.issue(Utc::now(), self.ttl)?;
        self.guard.save(&record)?;
        info!(user = %record.user.id, "Session stored");
        Ok(record)
    }
}
