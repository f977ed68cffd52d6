//! Scrape the uploads of known-human channels into the video store. Used to
//! build the human half of the training corpus.

use anyhow::Result;
use clap::Parser;
use sqlx::SqlitePool;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use truetone_common::{Label, Origin, ScrapeConfig};
use truetone_engine::VideoStore;
use youtube_client::{YouTubeClient, YouTubeError};

#[derive(Parser, Debug)]
#[command(name = "scrape-channels", about = "Fetch channel uploads into the video store")]
struct Args {
    /// Channel IDs to scrape (UC...).
    #[arg(required = true)]
    channel_ids: Vec<String>,

    /// Maximum uploads to fetch per channel.
    #[arg(long, default_value_t = 200)]
    max_videos: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("truetone=info".parse()?))
        .init();

    let args = Args::parse();
    let config = ScrapeConfig::from_env()?;

    let pool = SqlitePool::connect(&config.database_url).await?;
    let store = VideoStore::new(pool);
    store.init_schema().await?;

    let client = YouTubeClient::new(&config.youtube_api_key, Origin::Scraped);

    let mut total = 0usize;
    for channel_id in &args.channel_ids {
        info!(channel_id, "Scraping channel uploads");
        let videos = match client.get_channel_videos(channel_id, args.max_videos).await {
            Ok(videos) => videos,
            Err(e @ (YouTubeError::ChannelNotFound(_) | YouTubeError::PlaylistNotFound(_))) => {
                warn!(channel_id, error = %e, "Skipping channel");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for mut video in videos {
            // Uploads from curated channels are trusted-human training data.
            video.label = Label::Human;
            store.upsert_video(&video).await?;
            total += 1;
        }
        info!(channel_id, total, "Channel scraped");
    }

    info!(total, "Scrape finished");
    Ok(())
}
