use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tracked post. Created in pending state by a URL-generation request and
/// confirmed exactly once; only confirmed posts accept counted clicks.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub tracking_id: String,
    pub username: String,
    pub badge_type: String,
    pub platform: String,
    pub post_url: Option<String>,
    pub clicks: i64,
    pub confirmed: bool,
    /// Unix timestamps (seconds). first_click is set once, on the first
    /// accepted click; last_click follows the most recent one.
    pub first_click: Option<i64>,
    pub last_click: Option<i64>,
    pub created_at: i64,
    pub confirmed_at: Option<i64>,
}

impl Post {
    pub fn pending(
        tracking_id: &str,
        platform: &str,
        badge_type: &str,
        username: &str,
        created_at: i64,
    ) -> Self {
        Self {
            tracking_id: tracking_id.to_string(),
            username: username.to_string(),
            badge_type: badge_type.to_string(),
            platform: platform.to_string(),
            post_url: None,
            clicks: 0,
            confirmed: false,
            first_click: None,
            last_click: None,
            created_at,
            confirmed_at: None,
        }
    }
}

/// Immutable click-history fact. Only accepted (human) clicks are recorded.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClickRecord {
    pub tracking_id: String,
    pub timestamp: i64,
    pub platform: String,
    pub badge_type: String,
    pub ip: String,
    pub user_agent: String,
    pub is_human: bool,
}

/// An accepted click about to be appended to a post's history.
/// The ip and user_agent fields are already truncated by the recorder.
#[derive(Debug, Clone)]
pub struct NewClick {
    pub timestamp: i64,
    pub platform: String,
    pub badge_type: String,
    pub ip: String,
    pub user_agent: String,
}

/// Consistent point-in-time view of all tracked state, used by the
/// analytics aggregator and the health endpoint.
#[derive(Debug, Clone, Default)]
pub struct TrackingSnapshot {
    pub posts: Vec<Post>,
    /// Retained history records, newest first.
    pub history: Vec<ClickRecord>,
    pub bot_blocked: i64,
}

#[derive(Debug, Deserialize)]
pub struct GenerateTrackingRequest {
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_badge_type")]
    pub badge_type: String,
    #[serde(default = "default_username")]
    pub username: String,
}

fn default_platform() -> String {
    "facebook".to_string()
}

fn default_badge_type() -> String {
    "gold".to_string()
}

fn default_username() -> String {
    "unknown".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPostRequest {
    pub tracking_id: String,
    pub post_url: String,
    pub platform: String,
    #[serde(default)]
    pub username: Option<String>,
}
