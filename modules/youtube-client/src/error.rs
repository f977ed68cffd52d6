use thiserror::Error;
use truetone_common::ParseError;

pub type Result<T> = std::result::Result<T, YouTubeError>;

#[derive(Debug, Error)]
pub enum YouTubeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Playlist not found for channel: {0}")]
    PlaylistNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<reqwest::Error> for YouTubeError {
    fn from(err: reqwest::Error) -> Self {
        YouTubeError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for YouTubeError {
    fn from(err: serde_json::Error) -> Self {
        YouTubeError::Parse(ParseError::new(
            "<undecodable body>",
            vec![err.to_string()],
        ))
    }
}
