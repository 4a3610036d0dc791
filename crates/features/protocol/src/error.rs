use pvault_auth::AuthError;
use pvault_domain::constants::ErrorCode;
use pvault_vault::VaultError;
use std::borrow::Cow;

/// Everything a request can fail with, mapped onto the wire taxonomy by [`ProtocolError::code`].
#[pvault_derive::pvault_error]
pub enum ProtocolError {
    #[error("Missing parameter{}: {message}", format_context(.context))]
    MissingParameter { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid encoding{}: {message}", format_context(.context))]
    InvalidEncoding { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Unsupported protocol version {version}{}", format_context(.context))]
    OutdatedVersion { version: i64, context: Option<Cow<'static, str>> },

    #[error("Authorization failed{}: {source}", format_context(.context))]
    Auth { source: AuthError, context: Option<Cow<'static, str>> },

    #[error("Operation failed{}: {source}", format_context(.context))]
    Vault { source: VaultError, context: Option<Cow<'static, str>> },

    #[error("Protocol error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ProtocolError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingParameter { .. } => ErrorCode::MissingParameter,
            Self::InvalidEncoding { .. } => ErrorCode::InvalidEncoding,
            Self::OutdatedVersion { .. } => ErrorCode::OutdatedVersion,
            Self::Auth { source, .. } => source.code(),
            Self::Vault { source, .. } => source.code(),
            Self::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// `desc` field of the error reply. Never carries storage details.
    #[must_use]
    pub fn public_message(&self) -> Cow<'static, str> {
        match self {
            Self::MissingParameter { message, .. } | Self::InvalidEncoding { message, .. } => {
                message.clone()
            }
            Self::OutdatedVersion { .. } => "Only protocol version 2 is supported".into(),
            Self::Auth { source, .. } => source.code().description().into(),
            Self::Vault { source, .. } => source.public_message(),
            Self::Internal { .. } => ErrorCode::InternalError.description().into(),
        }
    }

    pub(crate) fn missing(message: &'static str) -> Self {
        Self::MissingParameter { message: message.into(), context: None }
    }

    pub(crate) fn encoding(message: &'static str) -> Self {
        Self::InvalidEncoding { message: message.into(), context: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_share_one_description() {
        let err = ProtocolError::from(AuthError::InvalidCredentials { context: Some("bad ip".into()) });
        assert_eq!(err.code(), ErrorCode::InvalidCredentials);
        assert_eq!(err.public_message(), ErrorCode::InvalidCredentials.description());
    }

    #[test]
    fn internal_errors_are_generic() {
        let err = ProtocolError::from("serializer exploded");
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(!err.public_message().contains("exploded"));
    }
}
