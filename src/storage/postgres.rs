use crate::models::{ClickRecord, NewClick, Post, TrackingSnapshot};
use crate::storage::{Storage, StorageError, StorageResult, HISTORY_RETENTION};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                tracking_id VARCHAR(16) PRIMARY KEY,
                username VARCHAR(255) NOT NULL DEFAULT 'unknown',
                badge_type VARCHAR(50) NOT NULL,
                platform VARCHAR(50) NOT NULL,
                post_url TEXT,
                clicks BIGINT NOT NULL DEFAULT 0,
                confirmed BOOLEAN NOT NULL DEFAULT FALSE,
                first_click BIGINT,
                last_click BIGINT,
                created_at BIGINT NOT NULL,
                confirmed_at BIGINT
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS click_history (
                id BIGSERIAL PRIMARY KEY,
                tracking_id VARCHAR(16) NOT NULL,
                timestamp BIGINT NOT NULL,
                platform VARCHAR(50) NOT NULL,
                badge_type VARCHAR(50) NOT NULL,
                ip VARCHAR(50) NOT NULL,
                user_agent TEXT NOT NULL,
                is_human BOOLEAN NOT NULL DEFAULT TRUE,
                FOREIGN KEY (tracking_id) REFERENCES posts(tracking_id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stats (
                id INTEGER PRIMARY KEY DEFAULT 1,
                bot_requests_blocked BIGINT NOT NULL DEFAULT 0,
                CHECK (id = 1)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "INSERT INTO stats (id, bot_requests_blocked) VALUES (1, 0) ON CONFLICT (id) DO NOTHING",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_confirmed ON posts(confirmed)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_click_history_tracking_id ON click_history(tracking_id)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_click_history_timestamp ON click_history(timestamp DESC)",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn create_post(&self, post: &Post) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (tracking_id, username, badge_type, platform, confirmed, clicks, created_at)
            VALUES ($1, $2, $3, $4, FALSE, 0, $5)
            ON CONFLICT (tracking_id) DO NOTHING
            "#,
        )
        .bind(&post.tracking_id)
        .bind(&post.username)
        .bind(&post.badge_type)
        .bind(&post.platform)
        .bind(post.created_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

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
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET post_url = $1,
                confirmed = TRUE,
                confirmed_at = $2,
                platform = $3
            WHERE tracking_id = $4
            "#,
        )
        .bind(post_url)
        .bind(confirmed_at)
        .bind(platform)
        .bind(tracking_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(name) = username {
            if !name.is_empty() && name != "unknown" {
                sqlx::query("UPDATE posts SET username = $1 WHERE tracking_id = $2")
                    .bind(name)
                    .bind(tracking_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn get_post(&self, tracking_id: &str) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT tracking_id, username, badge_type, platform, post_url,
                   clicks, confirmed, first_click, last_click, created_at, confirmed_at
            FROM posts
            WHERE tracking_id = $1
            "#,
        )
        .bind(tracking_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(post)
    }

    async fn record_click(&self, tracking_id: &str, click: &NewClick) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET clicks = clicks + 1,
                last_click = $1,
                first_click = COALESCE(first_click, $1)
            WHERE tracking_id = $2 AND confirmed = TRUE
            "#,
        )
        .bind(click.timestamp)
        .bind(tracking_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO click_history (tracking_id, timestamp, platform, badge_type, ip, user_agent, is_human)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            "#,
        )
        .bind(tracking_id)
        .bind(click.timestamp)
        .bind(&click.platform)
        .bind(&click.badge_type)
        .bind(&click.ip)
        .bind(&click.user_agent)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM click_history
            WHERE id NOT IN (SELECT id FROM click_history ORDER BY id DESC LIMIT $1)
            "#,
        )
        .bind(HISTORY_RETENTION as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn increment_bot_blocked(&self) -> Result<()> {
        sqlx::query("UPDATE stats SET bot_requests_blocked = bot_requests_blocked + 1 WHERE id = 1")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn bot_blocked(&self) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT bot_requests_blocked FROM stats WHERE id = 1")
                .fetch_optional(self.pool.as_ref())
                .await?
                .unwrap_or(0);
        Ok(count)
    }

    async fn snapshot(&self) -> Result<TrackingSnapshot> {
        // One transaction so the three reads see the same state.
        let mut tx = self.pool.begin().await?;

        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT tracking_id, username, badge_type, platform, post_url,
                   clicks, confirmed, first_click, last_click, created_at, confirmed_at
            FROM posts
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let history = sqlx::query_as::<_, ClickRecord>(
            r#"
            SELECT tracking_id, timestamp, platform, badge_type, ip, user_agent, is_human
            FROM click_history
            ORDER BY id DESC
            LIMIT $1
            "#,
        )
        .bind(HISTORY_RETENTION as i64)
        .fetch_all(&mut *tx)
        .await?;

        let bot_blocked =
            sqlx::query_scalar::<_, i64>("SELECT bot_requests_blocked FROM stats WHERE id = 1")
                .fetch_optional(&mut *tx)
                .await?
                .unwrap_or(0);

        tx.commit().await?;

        Ok(TrackingSnapshot {
            posts,
            history,
            bot_blocked,
        })
    }

    async fn reset_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM click_history")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM posts").execute(&mut *tx).await?;
        sqlx::query("UPDATE stats SET bot_requests_blocked = 0 WHERE id = 1")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
