use shared::{domain::Provider, protocol::ProviderStatus};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("topic must not be empty")]
    EmptyTopic,
    #[error("enter a {0} API key or save one on the server first")]
    MissingApiKey(Provider),
}

/// Inputs of one generation run, trimmed and checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub provider: Provider,
    pub api_key: String,
}

pub fn validate_request(
    topic: &str,
    provider: Provider,
    api_key: &str,
    server_keys: &ProviderStatus,
) -> Result<GenerationRequest, ValidationError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(ValidationError::EmptyTopic);
    }

    let api_key = api_key.trim();
    if api_key.is_empty() && !server_keys.has_server_key(provider) {
        return Err(ValidationError::MissingApiKey(provider));
    }

    Ok(GenerationRequest {
        topic: topic.to_string(),
        provider,
        api_key: api_key.to_string(),
    })
}
