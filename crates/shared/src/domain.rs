use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse stage of one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Connecting,
    Planning,
    Designing,
    GeneratingImage,
    Done,
    Error,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Planning => "planning",
            Self::Designing => "designing",
            Self::GeneratingImage => "generating_image",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// `done` and `error` stay frozen until the next run resets the session.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    pub fn is_generating(self) -> bool {
        !matches!(self, Self::Idle | Self::Done | Self::Error)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model provider used by the generation service. `Auto` lets the service pick
/// whichever provider has a key configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    #[serde(rename = "")]
    Auto,
    Qwen,
    Gemini,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "",
            Self::Qwen => "qwen",
            Self::Gemini => "gemini",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Qwen => "Qwen",
            Self::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "qwen" => Ok(Self::Qwen),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideOutline {
    pub title: String,
    pub purpose: String,
    pub visual_advice: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideStat {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideDesign {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub content: Vec<String>,
    pub image_prompt: String,
    pub html_content: String,
    #[serde(default)]
    pub design_directive: String,
    #[serde(default)]
    pub stats: Vec<SlideStat>,
}

/// Fully designed slide as delivered by the service. `index` is the position
/// the service assigned, which is not necessarily the position in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalSlide {
    pub index: usize,
    pub outline: SlideOutline,
    pub design: SlideDesign,
    #[serde(default)]
    pub image_url: String,
    pub final_html: String,
}

impl FinalSlide {
    pub fn cache_id(&self) -> String {
        format!("slide-{}", self.index)
    }

    pub fn has_background(&self) -> bool {
        !self.image_url.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    pub topic: String,
    pub title: String,
    pub subtitle: String,
    pub target_audience: String,
    pub presentation_goal: String,
    pub tone: String,
    pub visual_theme: String,
    pub accent_color: String,
    pub research_context: String,
    pub slides: Vec<SlideOutline>,
}
