//! Generation session state and the pure event router that advances it.

use shared::{
    domain::{FinalSlide, Outline, Phase},
    protocol::{DonePayload, ErrorPayload, ServerEvent, StatusPayload},
};

pub const CONNECTING_MESSAGE: &str = "Connecting to server...";
pub const PLANNING_MESSAGE: &str = "Planning slide outline...";
pub const TRANSPORT_ERROR_MESSAGE: &str = "Connection to the generation server failed";
pub const TRANSPORT_ERROR_STATUS: &str = "Connection error";
const FALLBACK_ERROR_MESSAGE: &str = "Generation failed";

/// Snapshot of one generation run. Every transition builds a new value; the
/// transport publishes it behind an `Arc` so readers can compare by pointer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub status_message: String,
    pub outline: Option<Outline>,
    pub slides: Vec<FinalSlide>,
    pub current_slide_index: Option<usize>,
    pub total_slides: usize,
    pub error: String,
}

impl SessionState {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Fresh state for a run whose connection is being opened.
    pub fn connecting() -> Self {
        Self {
            phase: Phase::Connecting,
            status_message: CONNECTING_MESSAGE.to_string(),
            ..Self::default()
        }
    }

    /// Optimistic move to planning once the start command has been sent.
    pub fn start_planning(&self) -> Self {
        if self.phase.is_terminal() {
            return self.clone();
        }
        Self {
            phase: Phase::Planning,
            status_message: PLANNING_MESSAGE.to_string(),
            ..self.clone()
        }
    }

    /// Connection-level failure. Overrides anything but an earlier terminal phase.
    pub fn fail_transport(&self) -> Self {
        if self.phase.is_terminal() {
            return self.clone();
        }
        Self {
            phase: Phase::Error,
            status_message: TRANSPORT_ERROR_STATUS.to_string(),
            error: TRANSPORT_ERROR_MESSAGE.to_string(),
            ..self.clone()
        }
    }

    pub fn is_generating(&self) -> bool {
        self.phase.is_generating()
    }

    pub fn title(&self) -> Option<&str> {
        self.outline.as_ref().map(|outline| outline.title.as_str())
    }

    pub fn has_slide(&self, index: usize) -> bool {
        self.slides.iter().any(|slide| slide.index == index)
    }
}

/// Applies one decoded event. Terminal states are frozen and come back unchanged.
pub fn apply_event(state: &SessionState, event: ServerEvent) -> SessionState {
    if state.phase.is_terminal() {
        return state.clone();
    }

    match event {
        ServerEvent::Status(payload) => apply_status(state, payload),
        ServerEvent::Outline(outline) => apply_outline(state, outline),
        ServerEvent::Slide(slide) => {
            let mut slides = state.slides.clone();
            slides.push(*slide);
            SessionState {
                slides,
                ..state.clone()
            }
        }
        ServerEvent::Done(payload) => apply_done(state, payload),
        ServerEvent::Error(payload) => apply_error(state, payload),
    }
}

/// Replays a sequence of events from `initial`.
pub fn replay<I>(initial: &SessionState, events: I) -> SessionState
where
    I: IntoIterator<Item = ServerEvent>,
{
    events
        .into_iter()
        .fold(initial.clone(), |state, event| apply_event(&state, event))
}

fn apply_status(state: &SessionState, payload: StatusPayload) -> SessionState {
    let phase = payload.status.unwrap_or(state.phase);
    let status_message = payload
        .message
        .unwrap_or_else(|| state.status_message.clone());
    let error = if phase == Phase::Error {
        error_text(&status_message)
    } else {
        state.error.clone()
    };
    SessionState {
        phase,
        status_message,
        error,
        current_slide_index: payload.slide_index.or(state.current_slide_index),
        total_slides: payload.total_slides.unwrap_or(state.total_slides),
        ..state.clone()
    }
}

fn error_text(message: &str) -> String {
    if message.trim().is_empty() {
        FALLBACK_ERROR_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

fn apply_outline(state: &SessionState, outline: Outline) -> SessionState {
    let total = outline.slides.len();
    SessionState {
        outline: Some(outline),
        total_slides: total,
        status_message: format!("Outline ready: {total} slides"),
        ..state.clone()
    }
}

fn apply_done(state: &SessionState, payload: DonePayload) -> SessionState {
    SessionState {
        phase: Phase::Done,
        status_message: format!(
            "All done! {} slides",
            payload.total_slides.unwrap_or(state.slides.len())
        ),
        ..state.clone()
    }
}

fn apply_error(state: &SessionState, payload: ErrorPayload) -> SessionState {
    let message = error_text(&payload.message);
    SessionState {
        phase: Phase::Error,
        status_message: message.clone(),
        error: message,
        ..state.clone()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
