use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::handlers::{
    confirm_post, generate_tracking_url, get_analytics, get_public_url, health, index, reset_all,
    AppState,
};

pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/generate-tracking-url", post(generate_tracking_url))
        .route("/api/confirm-post", post(confirm_post))
        .route("/api/analytics", get(get_analytics))
        .route("/api/public-url", get(get_public_url))
        .route("/api/reset-all", post(reset_all))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
