//! Backfill comments for scraped videos that have none stored yet.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use truetone_common::{Origin, ScrapeConfig};
use truetone_engine::VideoStore;
use youtube_client::YouTubeClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("truetone=info".parse()?))
        .init();

    let config = ScrapeConfig::from_env()?;

    let pool = SqlitePool::connect(&config.database_url).await?;
    let store = VideoStore::new(pool);
    store.init_schema().await?;

    let client = YouTubeClient::new(&config.youtube_api_key, Origin::Scraped);

    let pending = store
        .videos_missing_comments(
            config.min_duration_seconds,
            config.exclude_videos_under_n_comments,
        )
        .await?;
    info!(pending = pending.len(), "Videos awaiting comment scrape");

    let mut fetched = 0usize;
    for video in &pending {
        let comments = match client
            .get_comments(&video.id, config.max_comments_to_assess)
            .await
        {
            Ok(comments) => comments,
            Err(e) => {
                warn!(video_id = %video.id, error = %e, "Comment fetch failed, skipping");
                continue;
            }
        };
        let count = comments.len();
        store.upsert_comments(&comments).await?;
        fetched += count;
        info!(video_id = %video.id, count, "Comments stored");
    }

    info!(videos = pending.len(), comments = fetched, "Comment scrape finished");
    Ok(())
}
