use crate::client_ip;
use axum::Router;
use axum::extract::rejection::FormRejection;
use axum::extract::{ConnectInfo, Form, State};
use axum::http::{Extensions, HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use pvault::AppState;
use pvault::domain::constants::{SERVER_VERSION, VENDOR};
use pvault::features::protocol::InboundRequest;
use serde::Deserialize;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Form fields of a protocol request.
#[derive(Default, Deserialize)]
struct ProtocolForm {
    json: Option<String>,
    sid: Option<String>,
    spwd: Option<String>,
}

/// Protocol endpoints, auxiliary routes and the system router.
pub fn init(state: AppState) -> Router {
    Router::new()
        .route("/", get(welcome).post(protocol))
        .route("/index.php", axum::routing::post(protocol))
        .route("/favicon.ico", get(gone))
        .merge(pvault::server::router::system_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn protocol(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    form: Result<Form<ProtocolForm>, FormRejection>,
) -> Response {
    let form = form.map(|Form(form)| form).unwrap_or_else(|rejection| {
        debug!(%rejection, "Unreadable form body");
        ProtocolForm::default()
    });
    let peer = extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip());

    let request = InboundRequest {
        json: form.json,
        form_sid: form.sid,
        form_spwd: form.spwd,
        client_ip: client_ip::resolve(state.config.server.ip_extractor, &headers, peer),
    };
    let reply = state.dispatcher.dispatch(&request).await;

    let status = StatusCode::from_u16(reply.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], reply.body.to_string()).into_response()
}

async fn welcome() -> String {
    format!("{VENDOR} {SERVER_VERSION}")
}

async fn gone() -> StatusCode {
    StatusCode::GONE
}
