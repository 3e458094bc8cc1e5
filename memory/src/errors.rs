use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// The stored value changed since it was read.
    #[error("Revision conflict at {0}")]
    Conflict(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type MemoryResult<T> = Result<T, MemoryStoreError>;
