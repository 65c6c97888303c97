use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object name: {0:?}")]
    InvalidName(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("notification failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("failed to serialize mention batch: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to build sources: {0}")]
    Source(#[from] mentionbot_sources::SourceError),

    #[error(transparent)]
    Config(#[from] mentionbot_core::ConfigError),
}
