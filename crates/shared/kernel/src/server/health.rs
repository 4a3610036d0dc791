use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use pvault_database::VaultRepository;
use std::sync::Arc;
use tracing::warn;

/// Liveness probe that round-trips the storage engine.
pub(super) async fn ping_handler(
    State(repository): State<Arc<dyn VaultRepository>>,
) -> impl IntoResponse {
    let status = match repository.ping().await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            warn!(error = %e, "Storage ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
        }
    };

    (
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        status,
    )
}
