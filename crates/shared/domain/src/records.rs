//! Persisted vault rows, engine-agnostic.

use serde::{Deserialize, Serialize};

/// Tenant account. Passwords are compared in clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub sid: i64,
    pub password: String,
    /// One or more acceptable client IP substrings.
    pub allowed_ip: String,
    pub name: String,
    pub description: String,
    /// Unix seconds.
    pub creation_date: i64,
}

/// One stored payload.
///
/// `duration == 0` is a private entry, `duration > 0` is published for that many days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    pub vid: String,
    pub payload: String,
    pub provider_id: i64,
    pub creation_date: i64,
    pub duration: i64,
}

impl VaultEntry {
    #[must_use]
    pub const fn is_published(&self) -> bool {
        self.duration > 0
    }

    /// Published entries older than their duration (in whole days) are expired.
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        self.duration > 0
            && now - self.creation_date > self.duration * crate::constants::SECONDS_PER_DAY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub duration: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditKind {
    Add,
    Get,
    Update,
    Delete,
    Publish,
    Error,
    Notice,
}

impl AuditKind {
    /// Numeric log type stored with the record.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Add => 0,
            Self::Get => 1,
            Self::Update => 2,
            Self::Delete => 3,
            Self::Publish => 4,
            Self::Error => 9,
            Self::Notice => 10,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Get => "GET",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Publish => "PUBLISH",
            Self::Error => "ERROR",
            Self::Notice => "NOTICE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub kind: AuditKind,
    /// `0` when no tenant is known (service notices).
    pub provider_id: i64,
    pub message: String,
    pub log_date: i64,
}
