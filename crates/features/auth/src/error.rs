use pvault_database::DatabaseError;
use std::borrow::Cow;

/// Authorization failures. Every credential problem maps to the same variant.
#[pvault_derive::pvault_error]
pub enum AuthError {
    #[code(InvalidCredentials)]
    #[error("Invalid credentials{}", format_context(.context))]
    InvalidCredentials { context: Option<Cow<'static, str>> },

    #[code(InternalError)]
    #[error("Provider lookup failed{}: {source}", format_context(.context))]
    Storage { source: DatabaseError, context: Option<Cow<'static, str>> },
}
