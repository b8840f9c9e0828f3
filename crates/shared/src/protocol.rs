use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{FinalSlide, Outline, Phase, Provider},
    error::ProtocolError,
};

/// Frames sent from the client over `/ws/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientCommand {
    Generate {
        topic: String,
        provider: Provider,
        #[serde(rename = "apiKey")]
        api_key: String,
    },
    Cancel,
}

impl ClientCommand {
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Partial update: every field that is absent keeps its previous value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_slides: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_slides: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_index: Option<usize>,
}

/// Decoded inbound event. The match over this type is the event router, so a
/// new event kind has to be handled everywhere it is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Status(StatusPayload),
    Outline(Outline),
    Slide(Box<FinalSlide>),
    Done(DonePayload),
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Outline(_) => "outline",
            Self::Slide(_) => "slide",
            Self::Done(_) => "done",
            Self::Error(_) => "error",
        }
    }

    pub fn into_envelope(self) -> serde_json::Result<Envelope> {
        let event = self.name().to_string();
        let data = match self {
            Self::Status(payload) => serde_json::to_value(payload)?,
            Self::Outline(outline) => serde_json::to_value(outline)?,
            Self::Slide(slide) => serde_json::to_value(*slide)?,
            Self::Done(payload) => serde_json::to_value(payload)?,
            Self::Error(payload) => serde_json::to_value(payload)?,
        };
        Ok(Envelope { event, data })
    }
}

/// `{event, data}` wrapper of every inbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::MalformedFrame)
    }

    /// Returns `Ok(None)` for event names this client does not know about.
    pub fn decode(self) -> Result<Option<ServerEvent>, ProtocolError> {
        let Envelope { event, data } = self;
        let decoded = match event.as_str() {
            "status" => ServerEvent::Status(payload(&event, data)?),
            "outline" => ServerEvent::Outline(payload(&event, data)?),
            "slide" => ServerEvent::Slide(Box::new(payload(&event, data)?)),
            "done" => ServerEvent::Done(payload(&event, data)?),
            "error" => ServerEvent::Error(payload(&event, data)?),
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }
}

fn payload<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::InvalidPayload {
        event: event.to_string(),
        source,
    })
}

/// Parses and decodes one text frame in a single step.
pub fn decode_frame(frame: &str) -> Result<Option<ServerEvent>, ProtocolError> {
    Envelope::parse(frame)?.decode()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderStatus {
    #[serde(default)]
    pub qwen: bool,
    #[serde(default)]
    pub gemini: bool,
}

impl ProviderStatus {
    pub fn has_server_key(&self, provider: Provider) -> bool {
        match provider {
            Provider::Auto => self.qwen || self.gemini,
            Provider::Qwen => self.qwen,
            Provider::Gemini => self.gemini,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub providers: ProviderStatus,
    #[serde(default, alias = "active_provider")]
    pub active_provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveKeyRequest {
    pub provider: Provider,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveKeyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfExportSlide {
    pub html: String,
    pub image_url: String,
}

impl From<&FinalSlide> for PdfExportSlide {
    fn from(slide: &FinalSlide) -> Self {
        Self {
            html: slide.final_html.clone(),
            image_url: slide.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfExportRequest {
    pub slides: Vec<PdfExportSlide>,
    pub title: String,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
