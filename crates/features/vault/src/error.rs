use pvault_database::DatabaseError;
use pvault_domain::constants::ErrorCode;
use std::borrow::Cow;

/// Vault store failures with their protocol codes.
#[pvault_derive::pvault_error]
pub enum VaultError {
    #[code(MissingParameter)]
    #[error("Missing parameter{}: {message}", format_context(.context))]
    MissingParameter { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[code(InvalidParameterSize)]
    #[error("Invalid parameter size{}: {message}", format_context(.context))]
    InvalidParameterSize { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[code(InvalidEncoding)]
    #[error("Invalid encoding{}: {message}", format_context(.context))]
    InvalidEncoding { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[code(NotFound)]
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[code(InvalidForPublished)]
    #[error("Not allowed for published entries{}", format_context(.context))]
    InvalidForPublished { context: Option<Cow<'static, str>> },

    #[code(InternalError)]
    #[error("Storage failure{}: {source}", format_context(.context))]
    Storage { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[code(InternalError)]
    #[error("Internal vault error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl VaultError {
    /// Text safe to hand to the caller. Server faults never expose their cause.
    #[must_use]
    pub fn public_message(&self) -> Cow<'static, str> {
        match self {
            Self::MissingParameter { message, .. }
            | Self::InvalidParameterSize { message, .. }
            | Self::InvalidEncoding { message, .. }
            | Self::NotFound { message, .. } => message.clone(),
            Self::InvalidForPublished { .. } => {
                ErrorCode::InvalidForPublished.description().into()
            }
            Self::Storage { context, .. } | Self::Internal { context, .. } => context
                .as_ref()
                .map_or(ErrorCode::InternalError.description().into(), |c| {
                    format!("{c} failed. Contact our support.").into()
                }),
        }
    }

    pub(crate) fn missing(message: &'static str) -> Self {
        Self::MissingParameter { message: message.into(), context: None }
    }

    pub(crate) fn size(message: &'static str) -> Self {
        Self::InvalidParameterSize { message: message.into(), context: None }
    }

    pub(crate) fn encoding(message: &'static str) -> Self {
        Self::InvalidEncoding { message: message.into(), context: None }
    }

    pub(crate) fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }
}
