use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use pvault::Platform;
use pvault::domain::config::{ApiConfig, ClusterConfig};
use pvault::domain::records::ProviderRecord;
use pvault_database::{MemoryRepository, VaultRepository};
use pvault_server::router;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

async fn platform(repo: &MemoryRepository) -> Platform {
    repo.save_provider(ProviderRecord {
        sid: 1,
        password: "pw".to_owned(),
        allowed_ip: "127.0.0.1".to_owned(),
        name: "tenant".to_owned(),
        description: String::new(),
        creation_date: 0,
    })
    .await
    .expect("seed provider");

    let mut config = ApiConfig::default();
    config.cluster = ClusterConfig { enabled: false, ..ClusterConfig::default() };
    Platform::builder()
        .config(config)
        .repository(Arc::new(repo.clone()))
        .start()
        .await
        .expect("platform starts")
}

fn form_encode(pairs: &[(&str, &str)]) -> String {
    let encode = |s: &str| {
        s.bytes()
            .map(|b| {
                if b.is_ascii_alphanumeric() {
                    (b as char).to_string()
                } else {
                    format!("%{b:02X}")
                }
            })
            .collect::<String>()
    };
    pairs.iter().map(|(k, v)| format!("{k}={}", encode(v))).collect::<Vec<_>>().join("&")
}

fn post(path: &str, body: String) -> Request<Body> {
    let mut request = Request::post(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("request");
    request.extensions_mut().insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 50_000))));
    request
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json reply")
}

#[tokio::test]
async fn protocol_round_trip_over_http() {
    let repo = MemoryRepository::new();
    let platform = platform(&repo).await;
    let app = router::init(platform.state().clone());

    let add = json!({ "op": "add", "version": 2, "data": "payload", "uid": "1" }).to_string();
    let response = app
        .clone()
        .oneshot(post("/", form_encode(&[("json", &add), ("sid", "1"), ("spwd", "pw")])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "OK", "{body}");
    let vid = body["vid"].as_str().expect("vid").to_owned();

    let get = json!({ "op": "get", "version": 2, "sid": 1, "spwd": "pw", "vid": vid }).to_string();
    let response = app.oneshot(post("/index.php", form_encode(&[("json", &get)]))).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"][&vid]["data"], "payload");

    platform.shutdown().await.unwrap();
}

#[tokio::test]
async fn foreign_address_is_rejected() {
    let repo = MemoryRepository::new();
    let platform = platform(&repo).await;
    let app = router::init(platform.state().clone());

    let get = json!({ "op": "get", "version": 2, "sid": 1, "spwd": "pw", "vid": "x" }).to_string();
    let mut request = post("/", form_encode(&[("json", &get)]));
    request.extensions_mut().insert(ConnectInfo(SocketAddr::from(([10, 1, 1, 1], 1))));

    let body = json_body(app.oneshot(request).await.unwrap()).await;
    assert_eq!(body["code"], 5);
    platform.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_form_is_a_protocol_error() {
    let repo = MemoryRepository::new();
    let platform = platform(&repo).await;
    let app = router::init(platform.state().clone());

    let response = app.oneshot(Request::post("/").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "INVALID");
    assert_eq!(body["code"], 1);
    platform.shutdown().await.unwrap();
}

#[tokio::test]
async fn storage_outage_maps_to_500() {
    let repo = MemoryRepository::new();
    let platform = platform(&repo).await;
    let app = router::init(platform.state().clone());
    repo.set_offline(true);

    let get = json!({ "op": "getpublished", "version": 2, "vid": "a".repeat(32) }).to_string();
    let response = app.oneshot(post("/", form_encode(&[("json", &get)]))).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["status"], "ERROR");
    platform.shutdown().await.unwrap();
}

#[tokio::test]
async fn auxiliary_routes() {
    let repo = MemoryRepository::new();
    let platform = platform(&repo).await;
    let app = router::init(platform.state().clone());

    let welcome = app.clone().oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(welcome.status(), StatusCode::OK);

    let favicon =
        app.clone().oneshot(Request::get("/favicon.ico").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(favicon.status(), StatusCode::GONE);

    let ping = app.clone().oneshot(Request::get("/ping").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(ping.status(), StatusCode::OK);

    repo.set_offline(true);
    let ping = app.oneshot(Request::get("/ping").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(ping.status(), StatusCode::SERVICE_UNAVAILABLE);
    repo.set_offline(false);
    platform.shutdown().await.unwrap();
}
