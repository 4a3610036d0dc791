use pvault_audit::AuditLog;
use pvault_auth::{AuthError, Authorizer, Credentials};
use pvault_database::{MemoryRepository, VaultRepository};
use pvault_domain::constants::ErrorCode;
use pvault_domain::records::{AuditKind, ProviderRecord};
use pvault_kernel::clock::ManualClock;
use std::sync::Arc;

async fn setup(check_ip: bool) -> (Authorizer, MemoryRepository, pvault_audit::AuditWorker) {
    let repo = MemoryRepository::new();
    repo.save_provider(ProviderRecord {
        sid: 1,
        password: "secret".to_owned(),
        allowed_ip: "127.0.0.1 10.1.1.1".to_owned(),
        name: "tenant".to_owned(),
        description: String::new(),
        creation_date: 0,
    })
    .await
    .expect("seed provider");

    let (audit, receiver) = AuditLog::channel(16, Arc::new(ManualClock::new(0)));
    let worker = receiver.spawn(Arc::new(repo.clone()));
    let authorizer = Authorizer::new(Arc::new(repo.clone()), audit, check_ip);
    (authorizer, repo, worker)
}

#[tokio::test]
async fn valid_credentials_from_allowed_ip_pass() {
    let (authorizer, _repo, _worker) = setup(true).await;
    let sid = authorizer.authorize(&Credentials::new(1, "secret"), "10.1.1.1").await;
    assert_eq!(sid.expect("authorized"), 1);
}

#[tokio::test]
async fn disallowed_ip_fails_like_wrong_password() {
    let (authorizer, repo, worker) = setup(true).await;

    let wrong_ip = authorizer
        .authorize(&Credentials::new(1, "secret"), "8.8.8.8")
        .await
        .expect_err("ip must be rejected");
    let wrong_pw = authorizer
        .authorize(&Credentials::new(1, "nope"), "127.0.0.1")
        .await
        .expect_err("password must be rejected");
    let unknown = authorizer
        .authorize(&Credentials::new(77, "secret"), "127.0.0.1")
        .await
        .expect_err("unknown sid must be rejected");

    for err in [&wrong_ip, &wrong_pw, &unknown] {
        assert!(matches!(err, AuthError::InvalidCredentials { .. }));
        assert_eq!(err.code(), ErrorCode::InvalidCredentials);
    }
    assert_eq!(wrong_ip.to_string(), wrong_pw.to_string());
    assert_eq!(wrong_pw.to_string(), unknown.to_string());

    worker.shutdown().await.expect("audit drained");
    let audit = repo.audit_records();
    assert_eq!(audit.len(), 3);
    assert!(audit.iter().all(|r| r.kind == AuditKind::Error));
    assert!(audit[0].message.contains("8.8.8.8"));
    assert_eq!(audit[2].provider_id, 77);
}

#[tokio::test]
async fn disabled_ip_check_accepts_any_address() {
    let (authorizer, _repo, _worker) = setup(false).await;
    let sid = authorizer.authorize(&Credentials::new(1, "secret"), "203.0.113.9").await;
    assert_eq!(sid.expect("authorized"), 1);

    let denied = authorizer.authorize(&Credentials::new(1, "bad"), "203.0.113.9").await;
    assert!(denied.is_err(), "credentials are still verified");
}

#[tokio::test]
async fn incomplete_credentials_fail_without_lookup() {
    let (authorizer, repo, _worker) = setup(true).await;
    repo.set_offline(true);

    let err = authorizer.authorize(&Credentials::new(0, "secret"), "127.0.0.1").await;
    assert!(matches!(err, Err(AuthError::InvalidCredentials { .. })));
    let err = authorizer.authorize(&Credentials::new(1, ""), "127.0.0.1").await;
    assert!(matches!(err, Err(AuthError::InvalidCredentials { .. })));
}

#[tokio::test]
async fn storage_failure_is_internal() {
    let (authorizer, repo, _worker) = setup(true).await;
    repo.set_offline(true);

    let err = authorizer
        .authorize(&Credentials::new(1, "secret"), "127.0.0.1")
        .await
        .expect_err("lookup fails");
    assert!(matches!(err, AuthError::Storage { .. }));
    assert_eq!(err.code(), ErrorCode::InternalError);
}
