use thiserror::Error;

/// Failures decoding frames exchanged with the generation service.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),
    #[error("invalid payload for `{event}` event: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::MalformedFrame(_) => None,
            Self::InvalidPayload { event, .. } => Some(event),
        }
    }
}
