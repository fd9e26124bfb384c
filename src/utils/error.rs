use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Seen set at {path} is unreadable: {reason}")]
    PersistenceCorrupt { path: String, reason: String },

    #[error("Notification via {channel} failed: {message}")]
    NotifyFailed { channel: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn fetch_failed(url: impl Into<String>, reason: impl ToString) -> Self {
        AppError::FetchFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn notify_failed(channel: impl Into<String>, message: impl ToString) -> Self {
        AppError::NotifyFailed {
            channel: channel.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
