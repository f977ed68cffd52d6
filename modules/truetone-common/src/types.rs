use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Enums ---

/// Classification assigned by the model or the judge. Every video starts
/// unlabelled and stays that way until it has been through the admission
/// pipeline (or was hand-labelled for training).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Unlabelled,
    Human,
    Ai,
}

impl Default for Label {
    fn default() -> Self {
        Label::Unlabelled
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Unlabelled => write!(f, "unlabelled"),
            Label::Human => write!(f, "human"),
            Label::Ai => write!(f, "ai"),
        }
    }
}

/// How a video entered the database: through a live app search or through
/// one of the scraping binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    App,
    Scraped,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::App => write!(f, "app"),
            Origin::Scraped => write!(f, "scraped"),
        }
    }
}

// --- Core entities ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

/// Engagement statistics as reported by the platform at fetch time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub views: u64,
    pub likes: u64,
    pub favorites: u64,
    pub comments: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub thumbnail_url: String,
    pub channel: Channel,
    pub statistics: Statistics,
    pub duration_seconds: u32,
    pub published_at: DateTime<Utc>,
    pub is_livestream: bool,
    /// Set when the uploader disclosed AI-generated content to the platform.
    pub contains_synthetic_media: bool,
    pub label: Label,
    pub origin: Origin,
}

impl Video {
    /// Canonical watch URL for a video id.
    pub fn watch_url(id: &str) -> String {
        format!("https://www.youtube.com/watch?v={id}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub video_id: String,
    pub text: String,
    pub author_channel_id: String,
    pub author_display_name: String,
    pub likes: u64,
    pub is_reply: bool,
    /// Top-level comment this is a reply to. Only one reply layer is ever
    /// fetched, so a parent is always itself top-level.
    pub parent_comment_id: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        !self.is_reply
    }
}

/// The public-facing shape streamed to callers. Field names match the wire
/// contract consumed by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub channel: String,
    pub channel_id: String,
}

impl From<&Video> for VideoSummary {
    fn from(video: &Video) -> Self {
        Self {
            video_id: video.id.clone(),
            title: video.title.clone(),
            url: video.url.clone(),
            thumbnail: video.thumbnail_url.clone(),
            channel: video.channel.name.clone(),
            channel_id: video.channel.id.clone(),
        }
    }
}
