use super::health;
use axum::Router;
use axum::extract::FromRef;
use axum::routing::get;
use pvault_database::VaultRepository;
use std::sync::Arc;

/// System routes shared by every vault binary.
pub fn system_router<S>() -> Router<S>
where
    S: Send + Sync + Clone + 'static,
    Arc<dyn VaultRepository>: FromRef<S>,
{
    Router::new().route("/ping", get(health::ping_handler))
}
