use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::recorder::ClickRecorder;

pub struct RedirectState {
    pub recorder: Arc<ClickRecorder>,
    pub destination_url: String,
}

#[derive(Debug, Deserialize)]
pub struct TrackParams {
    #[serde(default = "unknown")]
    pub p: String,
    #[serde(default = "unknown")]
    pub b: String,
}

fn unknown() -> String {
    "unknown".to_string()
}

/// Track a click and redirect.
///
/// The response is always a 302 to the fixed destination: the caller gets no
/// signal about whether or why the click counted.
pub async fn track_click(
    State(state): State<Arc<RedirectState>>,
    Path(tracking_id): Path<String>,
    Query(params): Query<TrackParams>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let ip = client_ip(&headers, addr);

    state
        .recorder
        .record_click(&tracking_id, &params.p, &params.b, &ip, user_agent)
        .await;

    found(&state.destination_url)
}

/// 302 Found. axum's Redirect helpers only cover 303/307/308.
fn found(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

/// Client IP: first X-Forwarded-For hop when present, socket address
/// otherwise.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| addr.ip().to_string())
}
