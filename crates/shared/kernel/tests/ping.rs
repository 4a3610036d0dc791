#![cfg(feature = "server")]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pvault_database::{MemoryRepository, VaultRepository};
use pvault_kernel::server::system_router;
use std::sync::Arc;
use tower::ServiceExt;

async fn ping(repo: &MemoryRepository) -> StatusCode {
    let state: Arc<dyn VaultRepository> = Arc::new(repo.clone());
    let app = system_router().with_state(state);
    let response = app
        .oneshot(Request::get("/ping").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    response.status()
}

#[tokio::test]
async fn ping_reflects_storage_health() {
    let repo = MemoryRepository::new();
    assert_eq!(ping(&repo).await, StatusCode::OK);

    repo.set_offline(true);
    assert_eq!(ping(&repo).await, StatusCode::SERVICE_UNAVAILABLE);
}
