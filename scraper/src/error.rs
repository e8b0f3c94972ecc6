use thiserror::Error;

/// Failures talking to the YouTube Data API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("YouTube API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("YouTube API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode YouTube API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid YouTube API url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

impl ApiError {
    /// Whether a repeat of the same request has a chance to succeed.
    ///
    /// Connection problems, timeouts, throttling and server-side errors are
    /// transient. Quota exhaustion, bad keys and malformed requests surface
    /// as other 4xx codes and are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::Decode(_) | ApiError::Url(_) | ApiError::Format(_) => false,
        }
    }
}

/// A single API item that could not be mapped into a stored record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("Item {id} has no usable thumbnail")]
    MissingThumbnail { id: String },

    #[error("Item {id} is missing required field '{field}'")]
    MissingField { id: String, field: &'static str },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to run database migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Video {video_id} has no creator reference")]
    MissingCreatorReference { video_id: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}
