use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database connection error: {0}")]
    Connection(#[from] tokio_rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Feed parse error: {0}")]
    FeedParse(#[from] feed_rs::parser::ParseFeedError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analysis API error: {0}")]
    AnalysisApi(String),

    #[error("Malformed analysis report: {0}")]
    Report(String),

    #[error("Duplicate {kind} uuid {uuid}")]
    DuplicateUuid { kind: &'static str, uuid: i64 },

    #[error("{kind} {uuid} not found")]
    NotFound { kind: &'static str, uuid: i64 },

    #[error("Invalid source URL: {0}")]
    InvalidSourceUrl(#[from] crate::state::AddSourceError),

    #[error("{0} is not available")]
    Unavailable(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
