//! Authorization gate.
//!
//! Checks the claimed `sid`/`spwd` pair against the stored provider and, unless disabled,
//! the caller address against the provider's `allowed_ip` field. Callers only ever see
//! [`AuthError::InvalidCredentials`]; the concrete reason goes to the audit trail.
mod error;

pub use crate::error::{AuthError, AuthErrorExt};

use pvault_audit::AuditLog;
use pvault_database::VaultRepository;
use pvault_domain::records::AuditKind;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Claimed tenant identity.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub sid: i64,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(sid: i64, password: impl Into<String>) -> Self {
        Self { sid, password: password.into() }
    }

    /// `sid >= 1` and a non-empty password.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.sid >= 1 && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("sid", &self.sid).field("password", &"***").finish()
    }
}

#[derive(Debug, Clone)]
pub struct Authorizer {
    repository: Arc<dyn VaultRepository>,
    audit: AuditLog,
    check_ip: bool,
}

impl Authorizer {
    #[must_use]
    pub fn new(repository: Arc<dyn VaultRepository>, audit: AuditLog, check_ip: bool) -> Self {
        Self { repository, audit, check_ip }
    }

    /// Returns the authorized `sid`.
    ///
    /// # Errors
    /// * [`AuthError::InvalidCredentials`] for an incomplete pair, an unknown `sid`, a wrong
    ///   password or a disallowed address.
    /// * [`AuthError::Storage`] when the provider cannot be loaded.
    #[instrument(skip(self), fields(ip_check = self.check_ip))]
    pub async fn authorize(
        &self,
        credentials: &Credentials,
        client_ip: &str,
    ) -> Result<i64, AuthError> {
        let sid = credentials.sid;
        if !credentials.is_complete() {
            return Err(self.deny(sid, "Missing sid or password".to_owned()));
        }

        let provider = self
            .repository
            .find_provider(sid)
            .await
            .context("Loading provider credentials")?;

        // Plain comparison, passwords are stored in clear.
        let Some(provider) = provider.filter(|p| p.password == credentials.password) else {
            return Err(self.deny(sid, "Invalid credentials".to_owned()));
        };

        if self.check_ip && !ip_allowed(&provider.allowed_ip, client_ip) {
            return Err(self.deny(sid, format!("Not allowed IP client address {client_ip}")));
        }

        debug!(sid, "Provider authorized");
        Ok(sid)
    }
}

impl Authorizer {
    fn deny(&self, sid: i64, reason: String) -> AuthError {
        debug!(sid, %reason, "Authorization denied");
        self.audit.record(AuditKind::Error, sid, reason);
        AuthError::InvalidCredentials { context: None }
    }
}

/// Substring match of the caller address inside the allowlist. An unknown address never
/// matches.
fn ip_allowed(allowed: &str, client_ip: &str) -> bool {
    !client_ip.is_empty() && allowed.contains(client_ip)
}
