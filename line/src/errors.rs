use thiserror::Error;

/// Errors raised while accepting a webhook request
#[derive(Error, Debug)]
pub enum WebhookError {
    /// Signature header missing or not matching the body
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid webhook body: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised by Messaging API calls
#[derive(Error, Debug)]
pub enum LineError {
    #[error("Messaging API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

pub type LineResult<T> = Result<T, LineError>;
