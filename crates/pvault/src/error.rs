use pvault_audit::AuditError;
use pvault_cluster::ClusterError;
use pvault_database::DatabaseError;
use std::borrow::Cow;

#[pvault_derive::pvault_error]
pub enum PlatformError {
    #[error("Platform validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Storage bootstrap failed{}: {source}", format_context(.context))]
    Database { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Background jobs failed{}: {source}", format_context(.context))]
    Cluster { source: ClusterError, context: Option<Cow<'static, str>> },

    #[error("Audit trail failed{}: {source}", format_context(.context))]
    Audit { source: AuditError, context: Option<Cow<'static, str>> },

    #[error("Platform error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
