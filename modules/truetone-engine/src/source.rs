use async_trait::async_trait;
use truetone_common::{Comment, Video};
use youtube_client::{Result, VideoPage, YouTubeClient};

/// Seam over the platform client so the pipeline can be driven by mocks.
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<VideoPage>;

    async fn get_channel_videos(&self, channel_id: &str, max_videos: usize) -> Result<Vec<Video>>;

    async fn get_comments(&self, video_id: &str, max_results: u32) -> Result<Vec<Comment>>;
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<VideoPage> {
        YouTubeClient::search_videos(self, query, max_results, page_token).await
    }

    async fn get_channel_videos(&self, channel_id: &str, max_videos: usize) -> Result<Vec<Video>> {
        YouTubeClient::get_channel_videos(self, channel_id, max_videos).await
    }

    async fn get_comments(&self, video_id: &str, max_results: u32) -> Result<Vec<Comment>> {
        YouTubeClient::get_comments(self, video_id, max_results).await
    }
}
