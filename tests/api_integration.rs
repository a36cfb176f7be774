//! API integration tests
//!
//! Drive the JSON API and the tracking redirect together through the merged
//! router, the way the binary wires them up.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use clicktrack::api::{self, AppState};
use clicktrack::config::{Config, ServerConfig, StorageBackend, StorageConfig};
use clicktrack::recorder::ClickRecorder;
use clicktrack::redirect;
use clicktrack::storage::{FileStorage, Storage};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::{Layer, ServiceExt};

const DESTINATION: &str = "https://example.com/landing";
const HUMAN_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";

fn test_config() -> Config {
    Config {
        storage: StorageConfig {
            backend: StorageBackend::File,
            database_url: String::new(),
            data_file: String::new(),
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
        },
        destination_url: DESTINATION.to_string(),
        public_url: "http://localhost:5000".to_string(),
    }
}

/// Helper layer to inject ConnectInfo for tests
#[derive(Clone)]
struct TestConnectInfoLayer;

impl<S> Layer<S> for TestConnectInfoLayer {
    type Service = TestConnectInfoMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TestConnectInfoMiddleware { inner }
    }
}

#[derive(Clone)]
struct TestConnectInfoMiddleware<S> {
    inner: S,
}

impl<S, B> tower::Service<Request<B>> for TestConnectInfoMiddleware<S>
where
    S: tower::Service<Request<B>> + Clone,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let addr = SocketAddr::from(([127, 0, 0, 1], 12345));
        req.extensions_mut()
            .insert(axum::extract::connect_info::ConnectInfo(addr));
        self.inner.call(req)
    }
}

fn test_app() -> (Router, Arc<dyn Storage>) {
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::in_memory());
    let recorder = Arc::new(ClickRecorder::new(Arc::clone(&storage)));
    let state = Arc::new(AppState {
        storage: Arc::clone(&storage),
        recorder: Arc::clone(&recorder),
        config: test_config(),
    });
    let app = redirect::create_redirect_router(recorder, DESTINATION.to_string())
        .merge(api::create_api_router(state))
        .layer(TestConnectInfoLayer);
    (app, storage)
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(match &body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn click(app: &Router, tracking_id: &str, ip: &str) {
    let request = Request::builder()
        .uri(format!("/track/{tracking_id}?p=fac&b=g"))
        .header(header::USER_AGENT, HUMAN_UA)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn generate_creates_a_pending_post() {
    let (app, storage) = test_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/generate-tracking-url",
        Some(json!({"platform": "facebook", "badge_type": "gold", "username": "alice"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let tracking_id = body["tracking_id"].as_str().unwrap();
    assert_eq!(tracking_id.len(), 8);
    assert_eq!(
        body["tracking_url"].as_str().unwrap(),
        &format!("http://localhost:5000/track/{tracking_id}?p=fac&b=g")
    );
    assert_eq!(body["post_info"]["confirmed"], json!(false));
    assert_eq!(body["post_info"]["initial_clicks"], json!(0));

    let post = storage.get_post(tracking_id).await.unwrap().unwrap();
    assert!(!post.confirmed);
    assert_eq!(post.username, "alice");
}

#[tokio::test]
async fn generate_applies_request_defaults() {
    let (app, _storage) = test_app();

    let (status, body) = send_json(&app, "POST", "/api/generate-tracking-url", Some(json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post_info"]["platform"], json!("facebook"));
    assert_eq!(body["post_info"]["badge_type"], json!("gold"));
    assert_eq!(body["post_info"]["username"], json!("unknown"));
}

#[tokio::test]
async fn confirm_unknown_tracking_id_is_not_found() {
    let (app, _storage) = test_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/confirm-post",
        Some(json!({
            "tracking_id": "deadbeef",
            "post_url": "https://x.com/p/1",
            "platform": "facebook"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Tracking ID not found"));
}

#[tokio::test]
async fn confirm_marks_the_post_ready_for_tracking() {
    let (app, storage) = test_app();

    let (_, body) = send_json(
        &app,
        "POST",
        "/api/generate-tracking-url",
        Some(json!({"platform": "facebook", "badge_type": "gold", "username": "alice"})),
    )
    .await;
    let tracking_id = body["tracking_id"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/confirm-post",
        Some(json!({
            "tracking_id": tracking_id,
            "post_url": "https://x.com/p/1",
            "platform": "facebook"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("success"));
    assert_eq!(body["confirmed"], json!(true));

    let post = storage.get_post(&tracking_id).await.unwrap().unwrap();
    assert!(post.confirmed);
    assert_eq!(post.post_url.as_deref(), Some("https://x.com/p/1"));
    assert!(post.confirmed_at.is_some());
}

#[tokio::test]
async fn full_scenario_two_clicks_show_up_in_analytics() {
    let (app, _storage) = test_app();

    let (_, body) = send_json(
        &app,
        "POST",
        "/api/generate-tracking-url",
        Some(json!({"platform": "facebook", "badge_type": "gold", "username": "alice"})),
    )
    .await;
    let tracking_id = body["tracking_id"].as_str().unwrap().to_string();

    send_json(
        &app,
        "POST",
        "/api/confirm-post",
        Some(json!({
            "tracking_id": tracking_id,
            "post_url": "https://x.com/p/1",
            "platform": "facebook"
        })),
    )
    .await;

    click(&app, &tracking_id, "1.2.3.4").await;
    click(&app, &tracking_id, "5.6.7.8").await;

    let (status, analytics) = send_json(&app, "GET", "/api/analytics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analytics["total_clicks"], json!(2));
    assert_eq!(analytics["total_posts"], json!(1));
    assert_eq!(analytics["clicks_by_platform"], json!({"facebook": 2}));
    assert_eq!(analytics["clicks_by_badge_type"], json!({"gold": 2}));
    assert_eq!(analytics["avg_clicks_per_post"], json!(2.0));

    let top = &analytics["top_posts"][0];
    assert_eq!(top["tracking_id"], json!(tracking_id));
    assert_eq!(top["username"], json!("alice"));
    assert_eq!(top["clicks"], json!(2));
    assert_eq!(top["status"], json!("active"));

    assert_eq!(analytics["recent_clicks"].as_array().unwrap().len(), 2);
    assert_eq!(analytics["recent_clicks"][0]["username"], json!("alice"));
}

#[tokio::test]
async fn pending_posts_do_not_appear_in_analytics_totals() {
    let (app, _storage) = test_app();

    send_json(
        &app,
        "POST",
        "/api/generate-tracking-url",
        Some(json!({"platform": "twitter", "badge_type": "silver", "username": "bob"})),
    )
    .await;

    let (_, analytics) = send_json(&app, "GET", "/api/analytics", None).await;
    assert_eq!(analytics["total_posts"], json!(0));
    assert_eq!(analytics["pending_posts"], json!(1));
    assert_eq!(analytics["clicks_by_platform"], json!({}));
}

#[tokio::test]
async fn bot_traffic_shows_up_in_the_blocked_counter() {
    let (app, _storage) = test_app();

    let request = Request::builder()
        .uri("/track/deadbeef?p=fac&b=g")
        .header(header::USER_AGENT, "Slackbot 1.0")
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap();

    let (_, analytics) = send_json(&app, "GET", "/api/analytics", None).await;
    assert_eq!(analytics["bot_requests_blocked"], json!(1));
    assert_eq!(analytics["stats"]["total_requests"], json!(1));
}

#[tokio::test]
async fn reset_all_zeroes_everything() {
    let (app, _storage) = test_app();

    let (_, body) = send_json(
        &app,
        "POST",
        "/api/generate-tracking-url",
        Some(json!({"platform": "facebook", "badge_type": "gold", "username": "alice"})),
    )
    .await;
    let tracking_id = body["tracking_id"].as_str().unwrap().to_string();
    send_json(
        &app,
        "POST",
        "/api/confirm-post",
        Some(json!({
            "tracking_id": tracking_id,
            "post_url": "https://x.com/p/1",
            "platform": "facebook"
        })),
    )
    .await;
    click(&app, &tracking_id, "1.2.3.4").await;

    let (status, body) = send_json(&app, "POST", "/api/reset-all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("success"));

    let (_, analytics) = send_json(&app, "GET", "/api/analytics", None).await;
    assert_eq!(analytics["total_clicks"], json!(0));
    assert_eq!(analytics["total_posts"], json!(0));
    assert_eq!(analytics["pending_posts"], json!(0));
    assert_eq!(analytics["clicks_by_platform"], json!({}));
    assert_eq!(analytics["clicks_by_badge_type"], json!({}));
    assert_eq!(analytics["bot_requests_blocked"], json!(0));
}

#[tokio::test]
async fn health_reports_current_counts() {
    let (app, _storage) = test_app();

    let (_, body) = send_json(
        &app,
        "POST",
        "/api/generate-tracking-url",
        Some(json!({"platform": "facebook", "badge_type": "gold", "username": "alice"})),
    )
    .await;
    let tracking_id = body["tracking_id"].as_str().unwrap().to_string();
    send_json(
        &app,
        "POST",
        "/api/confirm-post",
        Some(json!({
            "tracking_id": tracking_id,
            "post_url": "https://x.com/p/1",
            "platform": "facebook"
        })),
    )
    .await;
    click(&app, &tracking_id, "1.2.3.4").await;

    let (status, health) = send_json(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], json!("healthy"));
    assert_eq!(health["total_posts"], json!(1));
    assert_eq!(health["pending_posts"], json!(0));
    assert_eq!(health["total_clicks"], json!(1));
    assert_eq!(health["backend"], json!("file"));
}

#[tokio::test]
async fn public_url_reports_deployment_info() {
    let (app, _storage) = test_app();

    let (status, body) = send_json(&app, "GET", "/api/public-url", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["public_url"], json!("http://localhost:5000"));
    assert_eq!(body["is_railway"], json!(false));
    assert_eq!(body["final_destination"], json!(DESTINATION));
}

#[tokio::test]
async fn index_lists_endpoints() {
    let (app, _storage) = test_app();

    let (status, body) = send_json(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("running"));
    assert!(body["endpoints"]["track"].is_string());
}
