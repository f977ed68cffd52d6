//! Persistence for fetched videos and comments. Every search hit and every
//! scraped upload lands here so training and re-labelling never re-fetch.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::warn;
use truetone_common::{Channel, Comment, Label, Origin, Statistics, Video};

#[derive(Clone)]
pub struct VideoStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct VideoRow {
    id: String,
    title: String,
    description: String,
    url: String,
    thumbnail_url: String,
    channel_id: String,
    channel_name: String,
    views: i64,
    likes: i64,
    favorites: i64,
    comments: i64,
    duration_seconds: i64,
    published_at: DateTime<Utc>,
    is_livestream: bool,
    contains_synthetic_media: bool,
    label: String,
    origin: String,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        Video {
            id: row.id,
            title: row.title,
            description: row.description,
            url: row.url,
            thumbnail_url: row.thumbnail_url,
            channel: Channel {
                id: row.channel_id,
                name: row.channel_name,
            },
            statistics: Statistics {
                views: row.views.max(0) as u64,
                likes: row.likes.max(0) as u64,
                favorites: row.favorites.max(0) as u64,
                comments: row.comments.max(0) as u64,
            },
            duration_seconds: row.duration_seconds.max(0) as u32,
            published_at: row.published_at,
            is_livestream: row.is_livestream,
            contains_synthetic_media: row.contains_synthetic_media,
            label: match row.label.as_str() {
                "human" => Label::Human,
                "ai" => Label::Ai,
                _ => Label::Unlabelled,
            },
            origin: match row.origin.as_str() {
                "scraped" => Origin::Scraped,
                _ => Origin::App,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: String,
    video_id: String,
    text: String,
    author_channel_id: String,
    author_display_name: String,
    likes: i64,
    is_reply: bool,
    parent_comment_id: Option<String>,
    published_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            video_id: row.video_id,
            text: row.text,
            author_channel_id: row.author_channel_id,
            author_display_name: row.author_display_name,
            likes: row.likes.max(0) as u64,
            is_reply: row.is_reply,
            parent_comment_id: row.parent_comment_id,
            published_at: row.published_at,
        }
    }
}

impl VideoStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS videos (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                url TEXT NOT NULL,
                thumbnail_url TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                channel_name TEXT NOT NULL,
                views INTEGER NOT NULL,
                likes INTEGER NOT NULL,
                favorites INTEGER NOT NULL,
                comments INTEGER NOT NULL,
                duration_seconds INTEGER NOT NULL,
                published_at TIMESTAMP NOT NULL,
                is_livestream BOOLEAN NOT NULL,
                contains_synthetic_media BOOLEAN NOT NULL,
                label TEXT NOT NULL,
                origin TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY,
                video_id TEXT NOT NULL,
                text TEXT NOT NULL,
                author_channel_id TEXT NOT NULL,
                author_display_name TEXT NOT NULL,
                likes INTEGER NOT NULL,
                is_reply BOOLEAN NOT NULL,
                parent_comment_id TEXT,
                published_at TIMESTAMP NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_comments_video ON comments(video_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn upsert_video(&self, video: &Video) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO videos (
                id, title, description, url, thumbnail_url, channel_id, channel_name,
                views, likes, favorites, comments, duration_seconds, published_at,
                is_livestream, contains_synthetic_media, label, origin
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&video.id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.url)
        .bind(&video.thumbnail_url)
        .bind(&video.channel.id)
        .bind(&video.channel.name)
        .bind(video.statistics.views as i64)
        .bind(video.statistics.likes as i64)
        .bind(video.statistics.favorites as i64)
        .bind(video.statistics.comments as i64)
        .bind(video.duration_seconds as i64)
        .bind(video.published_at)
        .bind(video.is_livestream)
        .bind(video.contains_synthetic_media)
        .bind(video.label.to_string())
        .bind(video.origin.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Best-effort upsert used inside the hot path: failures are logged,
    /// never propagated.
    pub async fn try_upsert_video(&self, video: &Video) {
        if let Err(e) = self.upsert_video(video).await {
            warn!(video_id = %video.id, error = %e, "Failed to persist video");
        }
    }

    pub async fn upsert_comments(&self, comments: &[Comment]) -> Result<()> {
        for comment in comments {
            sqlx::query(
                "INSERT OR REPLACE INTO comments (
                    id, video_id, text, author_channel_id, author_display_name,
                    likes, is_reply, parent_comment_id, published_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&comment.id)
            .bind(&comment.video_id)
            .bind(&comment.text)
            .bind(&comment.author_channel_id)
            .bind(&comment.author_display_name)
            .bind(comment.likes as i64)
            .bind(comment.is_reply)
            .bind(&comment.parent_comment_id)
            .bind(comment.published_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn comments_for(&self, video_id: &str) -> Result<Vec<Comment>> {
        let rows: Vec<CommentRow> =
            sqlx::query_as("SELECT * FROM comments WHERE video_id = ? ORDER BY published_at")
                .bind(video_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    /// Scraped videos eligible for training that have no stored comments
    /// yet. The eligibility cut matches the admission pre-filter.
    pub async fn videos_missing_comments(
        &self,
        min_duration_seconds: u32,
        min_comments: u64,
    ) -> Result<Vec<Video>> {
        let rows: Vec<VideoRow> = sqlx::query_as(
            "SELECT v.* FROM videos v
             LEFT JOIN comments c ON c.video_id = v.id
             WHERE v.duration_seconds > ?
               AND v.comments >= ?
               AND v.origin = 'scraped'
             GROUP BY v.id
             HAVING COUNT(c.id) = 0",
        )
        .bind(min_duration_seconds as i64)
        .bind(min_comments as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Video::from).collect())
    }
}
