//! Persistent decision cache and channel blocklist.
//!
//! Decisions follow a "decide once" policy: an entry is written the first
//! time a video is evaluated and reused on every later encounter, never
//! updated. Caching is best-effort throughout; a storage failure reads as a
//! miss and a failed write is logged and swallowed. The cache must never
//! fail the admission pipeline.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::Utc;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// Channel identifiers on the platform: `UC` followed by 22 id characters.
static CHANNEL_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^UC[0-9A-Za-z_-]{22}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total: i64,
    pub admitted: i64,
    pub rejected: i64,
    pub blocklisted_channels: i64,
}

#[derive(Clone)]
pub struct DecisionCache {
    pool: SqlitePool,
}

impl DecisionCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS video_filters (
                video_id TEXT PRIMARY KEY,
                humanity_score INTEGER NOT NULL,
                is_human BOOLEAN NOT NULL,
                checked_at TIMESTAMP NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_checked_at ON video_filters(checked_at)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS blocklist_channels (
                channel_id TEXT PRIMARY KEY,
                channel_name TEXT,
                added_at TIMESTAMP NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Prior decision for a video, or `None` if uncached. Read failures are
    /// logged and treated as a miss.
    pub async fn get(&self, video_id: &str) -> Option<(u8, bool)> {
        let row: std::result::Result<Option<(i64, bool)>, sqlx::Error> = sqlx::query_as(
            "SELECT humanity_score, is_human FROM video_filters WHERE video_id = ?",
        )
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(Some((score, is_human))) => {
                debug!(video_id, score, is_human, "Cache hit");
                Some((score.clamp(0, 100) as u8, is_human))
            }
            Ok(None) => {
                debug!(video_id, "Cache miss");
                None
            }
            Err(e) => {
                warn!(video_id, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Record a decision. Idempotent upsert; failures are logged and
    /// swallowed.
    pub async fn put(&self, video_id: &str, score: u8, is_admitted: bool) {
        let result = sqlx::query(
            "INSERT INTO video_filters (video_id, humanity_score, is_human, checked_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(video_id) DO UPDATE SET
                humanity_score = excluded.humanity_score,
                is_human = excluded.is_human,
                checked_at = excluded.checked_at",
        )
        .bind(video_id)
        .bind(score as i64)
        .bind(is_admitted)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => debug!(video_id, score, is_admitted, "Cached decision"),
            Err(e) => warn!(video_id, error = %e, "Cache write failed, continuing"),
        }
    }

    /// Whether a channel is on the blocklist. Read failures are logged and
    /// read as "not blocklisted".
    pub async fn is_blocklisted(&self, channel_id: &str) -> bool {
        let row: std::result::Result<Option<(i64,)>, sqlx::Error> =
            sqlx::query_as("SELECT 1 FROM blocklist_channels WHERE channel_id = ?")
                .bind(channel_id)
                .fetch_optional(&self.pool)
                .await;

        match row {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(channel_id, error = %e, "Blocklist read failed, treating as not listed");
                false
            }
        }
    }

    /// Load a line-oriented blocklist. A line is an entry when its first
    /// token matches the channel-id pattern; the remainder of the line is an
    /// optional display name. Blank lines and `#` comments are ignored,
    /// duplicates overwrite. Returns the number of entries loaded.
    pub async fn bulk_load_blocklist(&self, source: &str) -> Result<usize> {
        let mut loaded = 0;
        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (channel_id, name) = match line.split_once(char::is_whitespace) {
                Some((id, rest)) => (id, Some(rest.trim())),
                None => (line, None),
            };

            if !CHANNEL_ID_REGEX.is_match(channel_id) {
                debug!(line, "Skipping blocklist line that is not a channel id");
                continue;
            }

            sqlx::query(
                "INSERT INTO blocklist_channels (channel_id, channel_name, added_at)
                 VALUES (?, ?, ?)
                 ON CONFLICT(channel_id) DO UPDATE SET
                    channel_name = excluded.channel_name",
            )
            .bind(channel_id)
            .bind(name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("failed to insert blocklist entry")?;

            loaded += 1;
        }

        info!(loaded, "Blocklist loaded");
        Ok(loaded)
    }

    pub async fn load_blocklist_file(&self, path: &str) -> Result<usize> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read blocklist file {path}"))?;
        self.bulk_load_blocklist(&source).await
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM video_filters")
            .fetch_one(&self.pool)
            .await?;
        let (admitted,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM video_filters WHERE is_human = 1")
                .fetch_one(&self.pool)
                .await?;
        let (blocklisted_channels,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM blocklist_channels")
                .fetch_one(&self.pool)
                .await?;

        Ok(CacheStats {
            total,
            admitted,
            rejected: total - admitted,
            blocklisted_channels,
        })
    }
}
