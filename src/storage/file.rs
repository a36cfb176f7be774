//! Flat-file backend: all state lives in memory behind one RwLock and is
//! dumped to a JSON snapshot file after every mutation. With no snapshot
//! path it is a purely in-memory store (used heavily by tests).

use crate::models::{ClickRecord, NewClick, Post, TrackingSnapshot};
use crate::storage::{Storage, StorageError, StorageResult, HISTORY_RETENTION};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

#[derive(Debug, Default, Serialize, Deserialize)]
struct TrackingState {
    posts: HashMap<String, Post>,
    /// Oldest first; truncated to the retention bound on every append.
    click_history: Vec<ClickRecord>,
    bot_requests_blocked: i64,
}

pub struct FileStorage {
    state: RwLock<TrackingState>,
    path: Option<PathBuf>,
}

impl FileStorage {
    /// Backend persisted to `path` after every mutation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            state: RwLock::new(TrackingState::default()),
            path: Some(path.into()),
        }
    }

    /// In-memory only; nothing is written to disk.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(TrackingState::default()),
            path: None,
        }
    }

    async fn persist(&self, state: &TrackingState) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("failed to write snapshot file {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn init(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read snapshot file {}", path.display()))?;
        let loaded: TrackingState = serde_json::from_slice(&bytes)
            .with_context(|| format!("snapshot file {} is not valid JSON", path.display()))?;
        *self.state.write().await = loaded;
        Ok(())
    }

    async fn create_post(&self, post: &Post) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if state.posts.contains_key(&post.tracking_id) {
            return Err(StorageError::Conflict);
        }
        state.posts.insert(post.tracking_id.clone(), post.clone());
        self.persist(&state).await?;
        Ok(())
    }

    async fn confirm_post(
        &self,
        tracking_id: &str,
        post_url: &str,
        platform: &str,
        username: Option<&str>,
        confirmed_at: i64,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(post) = state.posts.get_mut(tracking_id) else {
            return Ok(false);
        };
        post.post_url = Some(post_url.to_string());
        post.platform = platform.to_string();
        post.confirmed = true;
        post.confirmed_at = Some(confirmed_at);
        if let Some(name) = username {
            if !name.is_empty() && name != "unknown" {
                post.username = name.to_string();
            }
        }
        self.persist(&state).await?;
        Ok(true)
    }

    async fn get_post(&self, tracking_id: &str) -> Result<Option<Post>> {
        let state = self.state.read().await;
        Ok(state.posts.get(tracking_id).cloned())
    }

    async fn record_click(&self, tracking_id: &str, click: &NewClick) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(post) = state.posts.get_mut(tracking_id) else {
            return Ok(false);
        };
        if !post.confirmed {
            return Ok(false);
        }

        post.clicks += 1;
        post.last_click = Some(click.timestamp);
        if post.first_click.is_none() {
            post.first_click = Some(click.timestamp);
        }

        state.click_history.push(ClickRecord {
            tracking_id: tracking_id.to_string(),
            timestamp: click.timestamp,
            platform: click.platform.clone(),
            badge_type: click.badge_type.clone(),
            ip: click.ip.clone(),
            user_agent: click.user_agent.clone(),
            is_human: true,
        });
        if state.click_history.len() > HISTORY_RETENTION {
            let excess = state.click_history.len() - HISTORY_RETENTION;
            state.click_history.drain(..excess);
        }

        self.persist(&state).await?;
        Ok(true)
    }

    async fn increment_bot_blocked(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.bot_requests_blocked += 1;
        self.persist(&state).await?;
        Ok(())
    }

    async fn bot_blocked(&self) -> Result<i64> {
        Ok(self.state.read().await.bot_requests_blocked)
    }

    async fn snapshot(&self) -> Result<TrackingSnapshot> {
        let state = self.state.read().await;
        Ok(TrackingSnapshot {
            posts: state.posts.values().cloned().collect(),
            history: state.click_history.iter().rev().cloned().collect(),
            bot_blocked: state.bot_requests_blocked,
        })
    }

    async fn reset_all(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.posts.clear();
        state.click_history.clear();
        state.bot_requests_blocked = 0;
        self.persist(&state).await?;
        Ok(())
    }
}
