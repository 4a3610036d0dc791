use std::borrow::Cow;

/// Audit slice error type.
#[pvault_derive::pvault_error]
pub enum AuditError {
    #[error("Audit worker failed{}: {source}", format_context(.context))]
    Join { source: tokio::task::JoinError, context: Option<Cow<'static, str>> },

    #[error("Audit error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
