//! Read-only analytics projections over a storage snapshot.
//!
//! Aggregation is a pure function of one [`TrackingSnapshot`], so every
//! figure in a report reflects the same instant; no torn reads across the
//! individual breakdowns.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::TrackingSnapshot;

const TOP_POSTS_LIMIT: usize = 50;
const RECENT_CLICKS_LIMIT: usize = 20;

#[derive(Debug, Serialize)]
pub struct AnalyticsReport {
    pub total_clicks: i64,
    pub total_posts: i64,
    pub pending_posts: i64,
    pub posts_with_clicks: i64,
    pub posts_without_clicks: i64,
    pub avg_clicks_per_post: f64,
    pub clicks_by_platform: HashMap<String, i64>,
    pub clicks_by_badge_type: HashMap<String, i64>,
    pub top_posts: Vec<PostSummary>,
    pub recent_clicks: Vec<RecentClick>,
    pub bot_requests_blocked: i64,
    pub stats: StatsBlock,
}

#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub tracking_id: String,
    pub username: String,
    pub post_url: String,
    pub platform: String,
    pub badge_type: String,
    pub clicks: i64,
    pub posted_at: Option<String>,
    pub first_click: Option<String>,
    pub last_click: Option<String>,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RecentClick {
    pub timestamp: Option<String>,
    pub tracking_id: String,
    pub post_url: String,
    pub platform: String,
    pub badge_type: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct StatsBlock {
    pub human_clicks: i64,
    pub bot_requests_blocked: i64,
    pub total_requests: i64,
    pub confirmed_posts: i64,
    pub pending_posts: i64,
}

fn rfc3339(epoch_secs: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(epoch_secs, 0).map(|dt| dt.to_rfc3339())
}

/// Aggregate a snapshot into the analytics report. Confirmed posts only;
/// pending posts contribute nothing but their count.
pub fn aggregate(snapshot: &TrackingSnapshot) -> AnalyticsReport {
    let confirmed: Vec<_> = snapshot.posts.iter().filter(|p| p.confirmed).collect();
    let pending_posts = (snapshot.posts.len() - confirmed.len()) as i64;

    let total_clicks: i64 = confirmed.iter().map(|p| p.clicks).sum();
    let total_posts = confirmed.len() as i64;
    let posts_with_clicks = confirmed.iter().filter(|p| p.clicks > 0).count() as i64;
    let posts_without_clicks = total_posts - posts_with_clicks;

    let mut clicks_by_platform: HashMap<String, i64> = HashMap::new();
    let mut clicks_by_badge_type: HashMap<String, i64> = HashMap::new();
    for post in &confirmed {
        *clicks_by_platform.entry(post.platform.clone()).or_insert(0) += post.clicks;
        *clicks_by_badge_type
            .entry(post.badge_type.clone())
            .or_insert(0) += post.clicks;
    }

    let mut sorted = confirmed.clone();
    sorted.sort_by(|a, b| b.clicks.cmp(&a.clicks));
    let top_posts = sorted
        .iter()
        .take(TOP_POSTS_LIMIT)
        .map(|post| PostSummary {
            tracking_id: post.tracking_id.clone(),
            username: post.username.clone(),
            post_url: post
                .post_url
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            platform: post.platform.clone(),
            badge_type: post.badge_type.clone(),
            clicks: post.clicks,
            posted_at: rfc3339(post.confirmed_at.unwrap_or(post.created_at)),
            first_click: post.first_click.and_then(rfc3339),
            last_click: post.last_click.and_then(rfc3339),
            status: if post.clicks > 0 { "active" } else { "no_clicks" },
        })
        .collect();

    // History arrives newest first; join each record with its post for
    // username and post_url, as the original response did.
    let posts_by_id: HashMap<&str, &crate::models::Post> = snapshot
        .posts
        .iter()
        .map(|p| (p.tracking_id.as_str(), p))
        .collect();
    let recent_clicks = snapshot
        .history
        .iter()
        .filter(|c| c.is_human)
        .take(RECENT_CLICKS_LIMIT)
        .map(|click| {
            let post = posts_by_id.get(click.tracking_id.as_str());
            RecentClick {
                timestamp: rfc3339(click.timestamp),
                tracking_id: click.tracking_id.clone(),
                post_url: post
                    .and_then(|p| p.post_url.clone())
                    .unwrap_or_else(|| "N/A".to_string()),
                platform: click.platform.clone(),
                badge_type: click.badge_type.clone(),
                username: post
                    .map(|p| p.username.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
            }
        })
        .collect();

    AnalyticsReport {
        total_clicks,
        total_posts,
        pending_posts,
        posts_with_clicks,
        posts_without_clicks,
        avg_clicks_per_post: total_clicks as f64 / total_posts.max(1) as f64,
        clicks_by_platform,
        clicks_by_badge_type,
        top_posts,
        recent_clicks,
        bot_requests_blocked: snapshot.bot_blocked,
        stats: StatsBlock {
            human_clicks: total_clicks,
            bot_requests_blocked: snapshot.bot_blocked,
            total_requests: total_clicks + snapshot.bot_blocked,
            confirmed_posts: total_posts,
            pending_posts,
        },
    }
}
