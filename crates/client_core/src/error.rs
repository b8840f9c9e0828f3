use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("server_url must start with http://, https://, ws:// or wss://: {0}")]
    InvalidServerUrl(String),
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("failed to send {command} command: {reason}")]
    Send {
        command: &'static str,
        reason: String,
    },
}
