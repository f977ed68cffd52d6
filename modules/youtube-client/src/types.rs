use chrono::{DateTime, Utc};
use serde::Deserialize;
use truetone_common::{Channel, Comment, Label, Origin, ParseError, Statistics, Video};

use crate::duration;

// =============================================================================
// Result pages
// =============================================================================

/// One page of search results, ids only.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub video_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

/// One page of fully-hydrated videos.
#[derive(Debug, Clone)]
pub struct VideoPage {
    pub videos: Vec<Video>,
    pub next_page_token: Option<String>,
}

// =============================================================================
// Wire types (YouTube Data API v3 JSON)
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchItem {
    pub id: Option<SearchItemId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchItemId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemListResponse {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelItem {
    #[serde(rename = "contentDetails")]
    pub content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists")]
    pub related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelatedPlaylists {
    pub uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistItem {
    pub snippet: Option<PlaylistItemSnippet>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistItemSnippet {
    #[serde(rename = "resourceId")]
    pub resource_id: Option<PlaylistResourceId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistResourceId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentThread {
    pub snippet: Option<CommentThreadSnippet>,
    pub replies: Option<CommentReplies>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentThreadSnippet {
    #[serde(rename = "topLevelComment")]
    pub top_level_comment: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentReplies {
    #[serde(default)]
    pub comments: Vec<serde_json::Value>,
}

/// Error envelope returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub reason: Option<String>,
}

// --- Video item ---

/// The Search API nests the id; the Videos API returns it as a plain string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireVideoId {
    Plain(String),
    Nested(SearchItemId),
}

#[derive(Debug, Deserialize)]
struct WireVideo {
    id: Option<WireVideoId>,
    snippet: Option<WireVideoSnippet>,
    #[serde(rename = "contentDetails")]
    content_details: Option<WireContentDetails>,
    statistics: Option<WireStatistics>,
    #[serde(rename = "liveStreamingDetails")]
    live_streaming_details: Option<serde_json::Value>,
    status: Option<WireStatus>,
}

#[derive(Debug, Deserialize)]
struct WireVideoSnippet {
    title: Option<String>,
    description: Option<String>,
    thumbnails: Option<WireThumbnails>,
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
    #[serde(rename = "channelTitle")]
    channel_title: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireThumbnails {
    medium: Option<WireThumbnail>,
}

#[derive(Debug, Deserialize)]
struct WireThumbnail {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireContentDetails {
    duration: Option<String>,
}

/// Counts come over the wire as decimal strings.
#[derive(Debug, Default, Deserialize)]
struct WireStatistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
    #[serde(rename = "favoriteCount")]
    favorite_count: Option<String>,
    #[serde(rename = "commentCount")]
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    #[serde(rename = "containsSyntheticMedia")]
    contains_synthetic_media: Option<bool>,
}

// --- Comment item ---

#[derive(Debug, Deserialize)]
struct WireComment {
    id: Option<String>,
    snippet: Option<WireCommentSnippet>,
}

#[derive(Debug, Deserialize)]
struct WireCommentSnippet {
    #[serde(rename = "textOriginal")]
    text_original: Option<String>,
    #[serde(rename = "authorDisplayName")]
    author_display_name: Option<String>,
    #[serde(rename = "authorChannelId")]
    author_channel_id: Option<WireAuthorChannelId>,
    #[serde(rename = "videoId")]
    video_id: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(rename = "parentId")]
    parent_id: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireAuthorChannelId {
    value: Option<String>,
}

// =============================================================================
// Parsing
// =============================================================================

/// Collects missing required paths while pulling optional fields through.
struct Violations {
    raw: serde_json::Value,
    paths: Vec<String>,
}

impl Violations {
    fn new(raw: &serde_json::Value) -> Self {
        Self {
            raw: raw.clone(),
            paths: Vec::new(),
        }
    }

    fn require<T>(&mut self, value: Option<T>, path: &str) -> Option<T> {
        if value.is_none() {
            self.paths.push(format!("Path {path} cannot be None!"));
        }
        value
    }

    fn finish(self) -> std::result::Result<(), ParseError> {
        if self.paths.is_empty() {
            Ok(())
        } else {
            Err(ParseError::new(self.raw.to_string(), self.paths))
        }
    }
}

fn parse_count(raw: Option<String>) -> u64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().ok()
}

/// Parse one raw item from the Videos (or Search) API into a [`Video`].
/// Every missing required field is collected into a single [`ParseError`].
pub fn parse_video(raw: &serde_json::Value, origin: Origin) -> std::result::Result<Video, ParseError> {
    let wire: WireVideo = serde_json::from_value(raw.clone())
        .map_err(|e| ParseError::new(raw.to_string(), vec![e.to_string()]))?;

    let mut violations = Violations::new(raw);

    let id = match wire.id {
        Some(WireVideoId::Plain(id)) => Some(id),
        Some(WireVideoId::Nested(nested)) => {
            violations.require(nested.video_id, "id.videoId")
        }
        None => violations.require(None, "id"),
    };

    let snippet = wire.snippet;
    let title = violations.require(snippet.as_ref().and_then(|s| s.title.clone()), "snippet.title");
    let description = violations.require(
        snippet.as_ref().and_then(|s| s.description.clone()),
        "snippet.description",
    );
    let thumbnail_url = violations.require(
        snippet
            .as_ref()
            .and_then(|s| s.thumbnails.as_ref())
            .and_then(|t| t.medium.as_ref())
            .and_then(|m| m.url.clone()),
        "snippet.thumbnails.medium.url",
    );
    let channel_id = violations.require(
        snippet.as_ref().and_then(|s| s.channel_id.clone()),
        "snippet.channelId",
    );
    let channel_name = violations.require(
        snippet.as_ref().and_then(|s| s.channel_title.clone()),
        "snippet.channelTitle",
    );
    let published_at = violations.require(
        snippet
            .as_ref()
            .and_then(|s| s.published_at.as_deref())
            .and_then(parse_timestamp),
        "snippet.publishedAt",
    );
    let duration_seconds = violations.require(
        wire.content_details
            .as_ref()
            .and_then(|c| c.duration.as_deref())
            .and_then(duration::parse_seconds),
        "contentDetails.duration",
    );

    violations.finish()?;

    // Unwraps cannot fire: finish() errored unless every require passed.
    let id = id.unwrap();
    let statistics = wire.statistics.unwrap_or_default();

    Ok(Video {
        url: Video::watch_url(&id),
        id,
        title: title.unwrap(),
        description: description.unwrap(),
        thumbnail_url: thumbnail_url.unwrap(),
        channel: Channel {
            id: channel_id.unwrap(),
            name: channel_name.unwrap(),
        },
        statistics: Statistics {
            views: parse_count(statistics.view_count),
            likes: parse_count(statistics.like_count),
            favorites: parse_count(statistics.favorite_count),
            comments: parse_count(statistics.comment_count),
        },
        duration_seconds: duration_seconds.unwrap(),
        published_at: published_at.unwrap(),
        is_livestream: wire.live_streaming_details.is_some(),
        contains_synthetic_media: wire
            .status
            .and_then(|s| s.contains_synthetic_media)
            .unwrap_or(false),
        label: Label::Unlabelled,
        origin,
    })
}

/// Parse one raw comment (top-level or reply) into a [`Comment`].
pub fn parse_comment(raw: &serde_json::Value) -> std::result::Result<Comment, ParseError> {
    let wire: WireComment = serde_json::from_value(raw.clone())
        .map_err(|e| ParseError::new(raw.to_string(), vec![e.to_string()]))?;

    let mut violations = Violations::new(raw);

    let id = violations.require(wire.id, "id");
    let snippet = wire.snippet;
    let text = violations.require(
        snippet.as_ref().and_then(|s| s.text_original.clone()),
        "snippet.textOriginal",
    );
    let author_display_name = violations.require(
        snippet.as_ref().and_then(|s| s.author_display_name.clone()),
        "snippet.authorDisplayName",
    );
    let author_channel_id = violations.require(
        snippet
            .as_ref()
            .and_then(|s| s.author_channel_id.as_ref())
            .and_then(|a| a.value.clone()),
        "snippet.authorChannelId.value",
    );
    let video_id = violations.require(
        snippet.as_ref().and_then(|s| s.video_id.clone()),
        "snippet.videoId",
    );
    let published_at = violations.require(
        snippet
            .as_ref()
            .and_then(|s| s.published_at.as_deref())
            .and_then(parse_timestamp),
        "snippet.publishedAt",
    );

    violations.finish()?;

    let parent_comment_id = snippet.as_ref().and_then(|s| s.parent_id.clone());

    Ok(Comment {
        id: id.unwrap(),
        video_id: video_id.unwrap(),
        text: text.unwrap(),
        author_channel_id: author_channel_id.unwrap(),
        author_display_name: author_display_name.unwrap(),
        likes: snippet.and_then(|s| s.like_count).unwrap_or(0),
        is_reply: parent_comment_id.is_some(),
        parent_comment_id,
        published_at: published_at.unwrap(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use truetone_common::VideoSummary;

    fn raw_video() -> serde_json::Value {
        json!({
            "id": "dQw4w9WgXcQ",
            "snippet": {
                "title": "Never Gonna Give You Up",
                "description": "Official video",
                "thumbnails": {"medium": {"url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg"}},
                "channelId": "UCuAXFkgsw1L7xaCfnd5JJOw",
                "channelTitle": "Rick Astley",
                "publishedAt": "2009-10-25T06:57:33Z"
            },
            "contentDetails": {"duration": "PT3M33S"},
            "statistics": {
                "viewCount": "1500000000",
                "likeCount": "16000000",
                "favoriteCount": "0",
                "commentCount": "2300000"
            },
            "status": {"containsSyntheticMedia": false}
        })
    }

    #[test]
    fn parses_a_full_video_item() {
        let video = parse_video(&raw_video(), Origin::App).unwrap();
        assert_eq!(video.id, "dQw4w9WgXcQ");
        assert_eq!(video.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(video.duration_seconds, 213);
        assert_eq!(video.statistics.comments, 2_300_000);
        assert_eq!(video.label, Label::Unlabelled);
        assert!(!video.is_livestream);
        assert!(!video.contains_synthetic_media);
    }

    #[test]
    fn nested_search_id_is_accepted() {
        let mut raw = raw_video();
        raw["id"] = json!({"videoId": "dQw4w9WgXcQ"});
        let video = parse_video(&raw, Origin::App).unwrap();
        assert_eq!(video.id, "dQw4w9WgXcQ");
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let mut raw = raw_video();
        raw["snippet"].as_object_mut().unwrap().remove("title");
        raw["snippet"]["thumbnails"]
            .as_object_mut()
            .unwrap()
            .remove("medium");

        let err = parse_video(&raw, Origin::App).unwrap_err();
        assert_eq!(err.violations.len(), 2);
        assert!(err.violations.iter().any(|v| v.contains("snippet.title")));
        assert!(err
            .violations
            .iter()
            .any(|v| v.contains("snippet.thumbnails.medium.url")));
    }

    #[test]
    fn absent_statistics_default_to_zero() {
        let mut raw = raw_video();
        raw.as_object_mut().unwrap().remove("statistics");
        let video = parse_video(&raw, Origin::Scraped).unwrap();
        assert_eq!(video.statistics, Statistics::default());
    }

    #[test]
    fn live_streaming_details_sets_the_flag() {
        let mut raw = raw_video();
        raw["liveStreamingDetails"] = json!({"actualStartTime": "2024-01-01T00:00:00Z"});
        let video = parse_video(&raw, Origin::App).unwrap();
        assert!(video.is_livestream);
    }

    #[test]
    fn raw_payload_round_trips_to_summary() {
        let video = parse_video(&raw_video(), Origin::App).unwrap();
        let summary = VideoSummary::from(&video);
        assert_eq!(summary.video_id, "dQw4w9WgXcQ");
        assert_eq!(summary.title, "Never Gonna Give You Up");
        assert_eq!(summary.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(
            summary.thumbnail,
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg"
        );
        assert_eq!(summary.channel, "Rick Astley");
        assert_eq!(summary.channel_id, "UCuAXFkgsw1L7xaCfnd5JJOw");
    }

    #[test]
    fn reply_comments_carry_their_parent() {
        let raw = json!({
            "id": "xyz.reply1",
            "snippet": {
                "textOriginal": "agreed!",
                "authorDisplayName": "listener",
                "authorChannelId": {"value": "UCabc"},
                "videoId": "dQw4w9WgXcQ",
                "publishedAt": "2024-06-01T12:00:00Z",
                "parentId": "xyz",
                "likeCount": 3
            }
        });
        let comment = parse_comment(&raw).unwrap();
        assert!(comment.is_reply);
        assert_eq!(comment.parent_comment_id.as_deref(), Some("xyz"));
        assert!(!comment.is_top_level());
    }

    #[test]
    fn top_level_comment_has_no_parent() {
        let raw = json!({
            "id": "xyz",
            "snippet": {
                "textOriginal": "this band rules",
                "authorDisplayName": "listener",
                "authorChannelId": {"value": "UCabc"},
                "videoId": "dQw4w9WgXcQ",
                "publishedAt": "2024-06-01T12:00:00Z"
            }
        });
        let comment = parse_comment(&raw).unwrap();
        assert!(!comment.is_reply);
        assert_eq!(comment.parent_comment_id, None);
        assert_eq!(comment.likes, 0);
    }
}
