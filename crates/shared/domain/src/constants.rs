//! Protocol limits and the wire error taxonomy.

/// Only protocol version accepted in the operation envelope.
pub const PROTOCOL_VERSION: i64 = 2;
/// Version string reported by `check` and in error bodies.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Vendor announced for the search capability.
pub const VENDOR: &str = "pseudo-vault";
pub const CAPABILITY_LICENSE: &str = "MIT OR Apache-2.0";

/// Largest accepted payload in bytes (inclusive).
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;
pub const MIN_PUBLISH_DAYS: i64 = 1;
pub const MAX_PUBLISH_DAYS: i64 = 365;
/// Token generation attempts before an insert is reported as failed.
pub const TOKEN_ATTEMPTS: usize = 4;
pub const MAX_SEARCH_TERMS: usize = 5;
pub const TOKEN_LEN: usize = 32;
pub const MIN_SEARCH_WORD_LEN: usize = 2;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Tracing target of audit events. The logger routes it to the audit file.
pub const AUDIT_TARGET: &str = "audit";

pub const STATUS_OK: &str = "OK";
pub const STATUS_NOT_FOUND: &str = "NOTFOUND";
pub const STATUS_INVALID: &str = "INVALID";
pub const STATUS_ERROR: &str = "ERROR";

/// Business error codes reported to protocol clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingParameter,
    WrongProtocol,
    OutdatedVersion,
    Locked,
    InvalidCredentials,
    InvalidEncoding,
    NotFound,
    InvalidPartner,
    InvalidParameterSize,
    InvalidForPublished,
    InternalError,
}

impl ErrorCode {
    /// Numeric code placed in the `code` field.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::MissingParameter => 1,
            Self::WrongProtocol => 2,
            Self::OutdatedVersion => 3,
            Self::Locked => 4,
            Self::InvalidCredentials => 5,
            Self::InvalidEncoding => 6,
            Self::NotFound => 7,
            Self::InvalidPartner => 8,
            Self::InvalidParameterSize => 9,
            Self::InvalidForPublished => 11,
            Self::InternalError => 99,
        }
    }

    /// Server faults are `ERROR`, everything the client caused is `INVALID`.
    #[must_use]
    pub const fn status(self) -> &'static str {
        match self {
            Self::InternalError => STATUS_ERROR,
            _ => STATUS_INVALID,
        }
    }

    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InternalError => 500,
            _ => 200,
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::MissingParameter => "Missing Parameters.",
            Self::WrongProtocol => "Wrong Protocol.",
            Self::OutdatedVersion => "Your software seems outdated.",
            Self::Locked => "The account was locked due to possible misuse.",
            Self::InvalidCredentials => "Invalid credentials (check sid and spwd).",
            Self::InvalidEncoding => "Invalid encoding (check data values and JSON integrity).",
            Self::NotFound => "Not found (vid is not found in the system).",
            Self::InvalidPartner => "Invalid partner (you are not allowed to access foreign data).",
            Self::InvalidParameterSize => "Invalid parameter size (some parameter exceeds limits).",
            Self::InvalidForPublished => "Operation not allowed for published entries.",
            Self::InternalError => "Some internal service error happened. Please contact support.",
        }
    }
}
