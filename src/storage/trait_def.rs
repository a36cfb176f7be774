use crate::models::{NewClick, Post, TrackingSnapshot};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("tracking id already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Number of newest click-history records retained. One bounded policy for
/// every backend; older records are pruned inside the record_click unit.
pub const HISTORY_RETENTION: usize = 1000;

/// Post registry and click-history store.
///
/// Backends must apply the click mutation (counter bump, first/last click
/// timestamps, history append, retention pruning) as a single atomic unit:
/// a counter incremented without its history record is a correctness
/// violation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, load the snapshot file, etc.)
    async fn init(&self) -> Result<()>;

    /// Insert a new pending post. Fails with [`StorageError::Conflict`]
    /// when the tracking id is already taken.
    async fn create_post(&self, post: &Post) -> StorageResult<()>;

    /// Mark a post confirmed, setting post_url, platform and confirmed_at.
    /// The username is only updated when supplied, non-empty and not
    /// "unknown".
    /// Re-confirming overwrites post_url/platform. Returns false when the
    /// tracking id is unknown.
    async fn confirm_post(
        &self,
        tracking_id: &str,
        post_url: &str,
        platform: &str,
        username: Option<&str>,
        confirmed_at: i64,
    ) -> Result<bool>;

    /// Fetch a post by tracking id.
    async fn get_post(&self, tracking_id: &str) -> Result<Option<Post>>;

    /// Count an accepted click: require the post confirmed, then atomically
    /// increment clicks, set last_click, set first_click if unset, and
    /// append the history record. Returns false (with no state change at
    /// all) when the post is missing or unconfirmed.
    async fn record_click(&self, tracking_id: &str, click: &NewClick) -> Result<bool>;

    /// Bump the process-wide count of bot-rejected requests.
    async fn increment_bot_blocked(&self) -> Result<()>;

    async fn bot_blocked(&self) -> Result<i64>;

    /// One consistent view of all posts, retained history (newest first)
    /// and the bot counter. No torn reads across the three.
    async fn snapshot(&self) -> Result<TrackingSnapshot>;

    /// Delete all posts and history and zero the bot counter.
    async fn reset_all(&self) -> Result<()>;
}
