use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Not a post URL (expected /<author>/status/<id>): {0}")]
    InvalidPostUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Rate limited while loading {url}")]
    RateLimited {
        url: String,
        reset_at: Option<DateTime<Utc>>,
    },

    #[error("Muxer failed: {0}")]
    Muxer(String),

    #[error("No content found: {0}")]
    NoContent(String),
}

impl HarvestError {
    /// Whether the failure should leave a degraded result instead of aborting the step.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Browser(_))
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
