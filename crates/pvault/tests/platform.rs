use pvault::Platform;
use pvault::domain::config::{ApiConfig, ApiConfigInner, ClusterConfig};
use pvault::domain::records::AuditKind;
use pvault::features::protocol::InboundRequest;
use pvault::kernel::clock::ManualClock;
use pvault_database::{MemoryRepository, VaultRepository};
use std::sync::Arc;

fn offline_cluster() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.cluster = ClusterConfig { enabled: false, ..ClusterConfig::default() };
    config
}

#[tokio::test]
async fn start_serve_and_stop() {
    let repo = MemoryRepository::new();
    let platform = Platform::builder()
        .config(offline_cluster())
        .repository(Arc::new(repo.clone()))
        .clock(Arc::new(ManualClock::new(0)))
        .start()
        .await
        .expect("platform starts");

    let reply = platform
        .state()
        .dispatcher
        .dispatch(&InboundRequest {
            json: Some(r#"{"op":"check","version":2}"#.to_owned()),
            ..InboundRequest::default()
        })
        .await;
    assert_eq!(reply.body["status"], "OK");

    platform.shutdown().await.expect("clean shutdown");
    let notices: Vec<_> = repo
        .audit_records()
        .into_iter()
        .filter(|r| r.kind == AuditKind::Notice)
        .map(|r| r.message)
        .collect();
    assert_eq!(notices.len(), 2);
    assert!(notices[0].starts_with("Service started"));
    assert_eq!(notices[1], "Service stopped");
}

#[tokio::test]
async fn opens_memory_storage_from_config() {
    let mut config = offline_cluster();
    config.database.url = "memory://".to_owned();
    let platform = Platform::builder().config(config).start().await.expect("platform starts");

    assert!(platform.state().repository.ping().await.is_ok());
    platform.shutdown().await.unwrap();
}

#[tokio::test]
async fn config_is_required() {
    assert!(Platform::builder().start().await.is_err());
}

#[test]
fn default_config_checks_ip() {
    assert!(!ApiConfigInner::default().vault.disable_ip_check);
}
