use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::analytics;
use crate::config::Config;
use crate::models::{ConfirmPostRequest, GenerateTrackingRequest, Post};
use crate::recorder::ClickRecorder;
use crate::storage::{Storage, StorageError};

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub recorder: Arc<ClickRecorder>,
    pub config: Config,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct GenerateTrackingResponse {
    pub tracking_id: String,
    pub tracking_url: String,
    pub public_url: String,
    pub post_info: PostInfo,
}

#[derive(Serialize)]
pub struct PostInfo {
    pub platform: String,
    pub badge_type: String,
    pub username: String,
    pub tracking_id: String,
    pub initial_clicks: i64,
    pub confirmed: bool,
}

#[derive(Serialize)]
pub struct ConfirmPostResponse {
    pub status: &'static str,
    pub tracking_id: String,
    pub post_url: String,
    pub confirmed: bool,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub total_clicks: i64,
    pub total_posts: i64,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal_error(context: &str, err: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("{context}: {err}"),
        }),
    )
}

/// Generate a random 8-character tracking id (lowercase hex).
fn generate_tracking_id() -> String {
    use rand::RngExt;
    let mut rng = rand::rng();
    (0..8)
        .map(|_| {
            let digit: u32 = rng.random_range(0..16);
            char::from_digit(digit, 16).expect("digit is within radix")
        })
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Create a tracking URL for a new post; the post stays pending until
/// confirmed.
pub async fn generate_tracking_url(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateTrackingRequest>,
) -> Result<Json<GenerateTrackingResponse>, ApiError> {
    let created_at = chrono::Utc::now().timestamp();

    // Random ids can collide; retry a few times before giving up.
    let mut tracking_id = None;
    for _ in 0..10 {
        let candidate = generate_tracking_id();
        let post = Post::pending(
            &candidate,
            &payload.platform,
            &payload.badge_type,
            &payload.username,
            created_at,
        );
        match state.storage.create_post(&post).await {
            Ok(()) => {
                tracking_id = Some(candidate);
                break;
            }
            Err(StorageError::Conflict) => continue,
            Err(StorageError::Other(err)) => {
                return Err(internal_error("Failed to create post", err))
            }
        }
    }

    let Some(tracking_id) = tracking_id else {
        return Err(internal_error(
            "Failed to create post",
            "could not generate a unique tracking id",
        ));
    };

    let tracking_url = format!(
        "{}/track/{}?p={}&b={}",
        state.config.public_url,
        tracking_id,
        truncate_chars(&payload.platform, 3),
        truncate_chars(&payload.badge_type, 1),
    );

    tracing::info!(tracking_id, "generated tracking URL (pending confirmation)");

    Ok(Json(GenerateTrackingResponse {
        tracking_id: tracking_id.clone(),
        tracking_url,
        public_url: state.config.public_url.clone(),
        post_info: PostInfo {
            platform: payload.platform,
            badge_type: payload.badge_type,
            username: payload.username,
            tracking_id,
            initial_clicks: 0,
            confirmed: false,
        },
    }))
}

/// Confirm a post was published; from here on its clicks count.
pub async fn confirm_post(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConfirmPostRequest>,
) -> Result<Json<ConfirmPostResponse>, ApiError> {
    let confirmed_at = chrono::Utc::now().timestamp();

    let found = state
        .storage
        .confirm_post(
            &payload.tracking_id,
            &payload.post_url,
            &payload.platform,
            payload.username.as_deref(),
            confirmed_at,
        )
        .await
        .map_err(|e| internal_error("Failed to confirm post", e))?;

    if !found {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Tracking ID not found".to_string(),
            }),
        ));
    }

    tracing::info!(tracking_id = %payload.tracking_id, post_url = %payload.post_url, "post confirmed");

    Ok(Json(ConfirmPostResponse {
        status: "success",
        tracking_id: payload.tracking_id,
        post_url: payload.post_url,
        confirmed: true,
        message: "Post confirmed and ready for tracking",
    }))
}

pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<analytics::AnalyticsReport>, ApiError> {
    let snapshot = state
        .storage
        .snapshot()
        .await
        .map_err(|e| internal_error("Failed to load analytics", e))?;
    Ok(Json(analytics::aggregate(&snapshot)))
}

pub async fn get_public_url(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let public_url = &state.config.public_url;
    Json(json!({
        "public_url": public_url,
        "is_railway": public_url.to_lowercase().contains("railway"),
        "status": "online",
        "message": "Production URL ready for social media posts",
        "final_destination": state.config.destination_url,
    }))
}

/// Destructive full reset: posts, history, bot counter and the in-memory
/// rate-limiter map.
pub async fn reset_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResetResponse>, ApiError> {
    state
        .storage
        .reset_all()
        .await
        .map_err(|e| internal_error("Failed to reset", e))?;
    state.recorder.limiter().clear();

    tracing::info!("all tracking data reset");

    Ok(Json(ResetResponse {
        status: "success",
        message: "All data reset",
        total_clicks: 0,
        total_posts: 0,
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match state.storage.snapshot().await {
        Ok(snapshot) => {
            let report = analytics::aggregate(&snapshot);
            Json(json!({
                "status": "healthy",
                "timestamp": timestamp,
                "total_posts": report.total_posts,
                "pending_posts": report.pending_posts,
                "total_clicks": report.total_clicks,
                "bot_requests_blocked": report.bot_requests_blocked,
                "public_url": state.config.public_url,
                "backend": state.config.storage.backend.as_str(),
                "is_production": state.config.public_url.to_lowercase().contains("railway"),
                "version": env!("CARGO_PKG_VERSION"),
            }))
            .into_response()
        }
        Err(err) => Json(json!({
            "status": "unhealthy",
            "error": err.to_string(),
            "timestamp": timestamp,
        }))
        .into_response(),
    }
}

/// Root endpoint: service banner and endpoint map.
pub async fn index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "service": "Click Tracking",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.config.storage.backend.as_str(),
        "public_url": state.config.public_url,
        "endpoints": {
            "track": "/track/{tracking_id}",
            "analytics": "/api/analytics",
            "health": "/health",
            "generate_url": "/api/generate-tracking-url (POST)",
            "confirm_post": "/api/confirm-post (POST)",
            "public_url": "/api/public-url",
        },
    }))
}
