//! The click classification and attribution pipeline.
//!
//! Every request ends in a redirect to the fixed destination; the outcome
//! only decides whether the click is counted. Rejected requests leave no
//! history record, and a bot rejection additionally bumps the bot counter.

use std::sync::Arc;

use crate::classifier;
use crate::limiter::ClickLimiter;
use crate::models::NewClick;
use crate::storage::Storage;

/// Stored IPs are truncated to the first 15 characters.
const IP_MAX_CHARS: usize = 15;
/// Stored user agents are truncated to the first 100 characters.
const USER_AGENT_MAX_CHARS: usize = 100;

/// Why a click did or did not count. Internal only: the HTTP layer answers
/// with the same redirect whatever the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Counted and recorded.
    Counted,
    /// Classified as bot traffic; bot counter bumped, nothing recorded.
    Bot,
    /// Over the per-(IP, post) burst cap; nothing recorded.
    RateLimited,
    /// Unknown or unconfirmed tracking id; nothing recorded.
    Unknown,
    /// Storage failed; the click is lost but the user is still redirected.
    StorageFailed,
}

pub struct ClickRecorder {
    storage: Arc<dyn Storage>,
    limiter: ClickLimiter,
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

impl ClickRecorder {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            limiter: ClickLimiter::new(),
        }
    }

    pub fn limiter(&self) -> &ClickLimiter {
        &self.limiter
    }

    pub async fn record_click(
        &self,
        tracking_id: &str,
        platform: &str,
        badge_type: &str,
        ip: &str,
        user_agent: &str,
    ) -> ClickOutcome {
        self.limiter.sweep();

        if classifier::is_bot(user_agent) {
            tracing::debug!(tracking_id, user_agent, "blocked bot/preview request");
            if let Err(err) = self.storage.increment_bot_blocked().await {
                tracing::warn!(error = %err, "failed to bump bot counter");
            }
            return ClickOutcome::Bot;
        }

        if self.limiter.is_rate_limited(ip, tracking_id) {
            tracing::debug!(tracking_id, ip, "rate limited");
            return ClickOutcome::RateLimited;
        }

        let click = NewClick {
            timestamp: chrono::Utc::now().timestamp(),
            platform: platform.to_string(),
            badge_type: badge_type.to_string(),
            ip: truncate_chars(ip, IP_MAX_CHARS),
            user_agent: truncate_chars(user_agent, USER_AGENT_MAX_CHARS),
        };

        match self.storage.record_click(tracking_id, &click).await {
            Ok(true) => {
                tracing::info!(tracking_id, "human click counted");
                ClickOutcome::Counted
            }
            Ok(false) => {
                tracing::debug!(tracking_id, "post not found or not confirmed");
                ClickOutcome::Unknown
            }
            Err(err) => {
                tracing::warn!(tracking_id, error = %err, "failed to record click");
                ClickOutcome::StorageFailed
            }
        }
    }
}
