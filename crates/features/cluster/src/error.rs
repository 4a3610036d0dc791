use pvault_database::DatabaseError;
use std::borrow::Cow;

/// Cluster slice error type.
#[pvault_derive::pvault_error]
pub enum ClusterError {
    #[error("Network error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Storage error{}: {source}", format_context(.context))]
    Storage { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Background task failed{}: {source}", format_context(.context))]
    Join { source: tokio::task::JoinError, context: Option<Cow<'static, str>> },

    #[error("Cluster error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
