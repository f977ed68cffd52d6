pub mod duration;
pub mod error;
pub mod types;

pub use error::{Result, YouTubeError};
pub use types::{SearchPage, VideoPage};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use truetone_common::{Comment, Origin, Video};

use types::*;

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// YouTube category id for Music. Search is constrained to it; this product
/// only ever looks at music content.
const MUSIC_CATEGORY_ID: &str = "10";

/// Item batch limit shared by the videos and playlistItems endpoints.
const MAX_ITEMS_PER_PAGE: usize = 50;

const VIDEO_PARTS: &str = "snippet,contentDetails,statistics,liveStreamingDetails,status";

/// Outcome of a single GET before it is flattened into [`YouTubeError`].
/// Keeps the API's machine-readable `reason` so callers can special-case
/// `playlistNotFound` and `commentsDisabled`.
enum RequestFailure {
    Network(String),
    Api {
        status: u16,
        message: String,
        reason: Option<String>,
    },
}

impl RequestFailure {
    fn reason_is(&self, expected: &str) -> bool {
        matches!(self, RequestFailure::Api { reason: Some(r), .. } if r == expected)
    }
}

impl From<RequestFailure> for YouTubeError {
    fn from(failure: RequestFailure) -> Self {
        match failure {
            RequestFailure::Network(message) => YouTubeError::Network(message),
            RequestFailure::Api {
                status, message, ..
            } => YouTubeError::Api { status, message },
        }
    }
}

pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    origin: Origin,
}

impl YouTubeClient {
    pub fn new(api_key: impl Into<String>, origin: Origin) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            origin,
        }
    }

    pub fn from_env(origin: Origin) -> Result<Self> {
        let api_key = std::env::var("YOUTUBE_API_KEY").map_err(|_| {
            YouTubeError::InvalidArgument("YOUTUBE_API_KEY environment variable not set".into())
        })?;
        Ok(Self::new(api_key, origin))
    }

    /// Point the client at a different host. Test seam.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> std::result::Result<T, RequestFailure> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| RequestFailure::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let envelope: Option<ApiErrorEnvelope> = serde_json::from_str(&body).ok();
            let (message, reason) = match envelope.and_then(|e| e.error) {
                Some(err) => (
                    err.message.unwrap_or_else(|| body.clone()),
                    err.errors.into_iter().next().and_then(|d| d.reason),
                ),
                None => (body, None),
            };
            return Err(RequestFailure::Api {
                status: status.as_u16(),
                message,
                reason,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RequestFailure::Network(e.to_string()))
    }

    /// Search for music videos and return a page of video ids.
    pub async fn search(
        &self,
        query: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<SearchPage> {
        if max_results > 50 {
            return Err(YouTubeError::InvalidArgument(format!(
                "max_results must be in [0, 50], got {max_results}"
            )));
        }

        let max_results = max_results.to_string();
        let mut params = vec![
            ("part", "snippet"),
            ("type", "video"),
            ("q", query),
            ("maxResults", max_results.as_str()),
            ("videoCategoryId", MUSIC_CATEGORY_ID),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response: SearchListResponse = self.get("search", &params).await?;

        let video_ids = response
            .items
            .into_iter()
            .filter_map(|item| item.id.and_then(|id| id.video_id))
            .collect();

        Ok(SearchPage {
            video_ids,
            next_page_token: response.next_page_token,
        })
    }

    /// Fetch full video details for a list of ids. Items that fail to parse
    /// are logged and skipped; one bad payload never drops the batch.
    async fn hydrate_videos(&self, video_ids: &[String]) -> Result<Vec<Video>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = video_ids.join(",");
        let params = [("part", VIDEO_PARTS), ("id", ids.as_str())];
        let response: ItemListResponse = self.get("videos", &params).await?;

        let mut videos = Vec::new();
        for item in &response.items {
            match parse_video(item, self.origin) {
                Ok(video) => videos.push(video),
                Err(e) => warn!(error = %e, "Failed to parse video payload, skipping"),
            }
        }
        Ok(videos)
    }

    /// Search and hydrate in one call: one page of fully-parsed videos plus
    /// the continuation token.
    pub async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<VideoPage> {
        let page = self.search(query, max_results, page_token).await?;
        let videos = self.hydrate_videos(&page.video_ids).await?;
        debug!(
            query,
            found = videos.len(),
            has_next = page.next_page_token.is_some(),
            "Fetched search page"
        );
        Ok(VideoPage {
            videos,
            next_page_token: page.next_page_token,
        })
    }

    /// Fetch up to `max_videos` uploads from a channel via its uploads
    /// playlist.
    pub async fn get_channel_videos(
        &self,
        channel_id: &str,
        max_videos: usize,
    ) -> Result<Vec<Video>> {
        let params = [("part", "contentDetails"), ("id", channel_id)];
        let response: ChannelListResponse = self.get("channels", &params).await?;

        let uploads_playlist = response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.content_details)
            .and_then(|details| details.related_playlists)
            .and_then(|playlists| playlists.uploads)
            .ok_or_else(|| YouTubeError::ChannelNotFound(channel_id.to_string()))?;

        let mut video_ids: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;
        let page_size = max_videos.min(MAX_ITEMS_PER_PAGE).to_string();

        loop {
            let mut params = vec![
                ("part", "snippet"),
                ("playlistId", uploads_playlist.as_str()),
                ("maxResults", page_size.as_str()),
            ];
            if let Some(ref token) = page_token {
                params.push(("pageToken", token));
            }

            let response: ItemListResponse =
                self.get("playlistItems", &params).await.map_err(|failure| {
                    if failure.reason_is("playlistNotFound") {
                        YouTubeError::PlaylistNotFound(channel_id.to_string())
                    } else {
                        failure.into()
                    }
                })?;

            for item in &response.items {
                let playlist_item: PlaylistItem = match serde_json::from_value(item.clone()) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!(error = %e, "Failed to parse playlist item, skipping");
                        continue;
                    }
                };
                if let Some(id) = playlist_item
                    .snippet
                    .and_then(|s| s.resource_id)
                    .and_then(|r| r.video_id)
                {
                    video_ids.push(id);
                }
                if video_ids.len() >= max_videos {
                    break;
                }
            }

            if video_ids.len() >= max_videos {
                break;
            }
            page_token = response.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        let mut videos = Vec::new();
        for chunk in video_ids.chunks(MAX_ITEMS_PER_PAGE) {
            videos.extend(self.hydrate_videos(chunk).await?);
        }
        videos.truncate(max_videos);
        Ok(videos)
    }

    /// Fetch up to `max_results` comment threads for a video, relevance
    /// ordered, including one layer of replies. A video with comments
    /// disabled yields an empty list, not an error.
    pub async fn get_comments(&self, video_id: &str, max_results: u32) -> Result<Vec<Comment>> {
        let max_results = max_results.to_string();
        let params = [
            ("part", "snippet,replies"),
            ("videoId", video_id),
            ("maxResults", max_results.as_str()),
            ("order", "relevance"),
        ];

        let response: ItemListResponse = match self.get("commentThreads", &params).await {
            Ok(response) => response,
            Err(failure) if failure.reason_is("commentsDisabled") => {
                debug!(video_id, "Comments are disabled, returning empty set");
                return Ok(Vec::new());
            }
            Err(failure) => return Err(failure.into()),
        };

        let mut comments = Vec::new();
        for item in &response.items {
            let thread: CommentThread = match serde_json::from_value(item.clone()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(video_id, error = %e, "Failed to parse comment thread, skipping");
                    continue;
                }
            };

            if let Some(top_level) = thread.snippet.and_then(|s| s.top_level_comment) {
                match parse_comment(&top_level) {
                    Ok(comment) => comments.push(comment),
                    Err(e) => warn!(video_id, error = %e, "Failed to parse comment, skipping"),
                }
            }

            // One reply layer only; deeper chains are never traversed.
            if let Some(replies) = thread.replies {
                for reply in &replies.comments {
                    match parse_comment(reply) {
                        Ok(comment) => comments.push(comment),
                        Err(e) => warn!(video_id, error = %e, "Failed to parse reply, skipping"),
                    }
                }
            }
        }

        Ok(comments)
    }
}
