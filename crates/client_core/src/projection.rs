//! Values derived from [`SessionState`] on demand: the progress tracker and the
//! slide preview cursor. Nothing here holds state of its own except the cursor
//! position chosen by the user.

use shared::domain::{FinalSlide, Phase};

use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Active,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressStep {
    pub label: String,
    pub status: StepStatus,
}

impl ProgressStep {
    fn new(label: impl Into<String>, status: StepStatus) -> Self {
        Self {
            label: label.into(),
            status,
        }
    }
}

pub fn progress_steps(state: &SessionState) -> Vec<ProgressStep> {
    let init_status = if state.phase == Phase::Idle {
        StepStatus::Pending
    } else {
        StepStatus::Done
    };
    let outline_status = if state.phase == Phase::Planning {
        StepStatus::Active
    } else if state.outline.is_some() {
        StepStatus::Done
    } else {
        StepStatus::Pending
    };

    let mut steps = vec![
        ProgressStep::new("Initialize slide project", init_status),
        ProgressStep::new("Plan slide outline", outline_status),
    ];

    if let Some(outline) = &state.outline {
        for (index, planned) in outline.slides.iter().enumerate() {
            let ready = state.has_slide(index);
            let status = if ready {
                StepStatus::Done
            } else if state.current_slide_index == Some(index) {
                StepStatus::Active
            } else {
                StepStatus::Pending
            };
            steps.push(ProgressStep::new(
                format!("Design slide {}: {}", index + 1, planned.title),
                status,
            ));
        }
    }

    steps
}

pub fn active_step_count(steps: &[ProgressStep]) -> usize {
    steps
        .iter()
        .filter(|step| step.status != StepStatus::Pending)
        .count()
}

pub fn is_generating(state: &SessionState) -> bool {
    state.phase.is_generating()
}

/// Position of the slide shown in the preview pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreviewCursor {
    index: usize,
}

impl PreviewCursor {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// Index clamped to the slides currently available.
    pub fn index(&self, slide_count: usize) -> usize {
        self.index.min(slide_count.saturating_sub(1))
    }

    /// While a run is in progress the preview follows the newest slide.
    pub fn follow_latest(&mut self, state: &SessionState) -> bool {
        if !state.is_generating() || state.slides.is_empty() {
            return false;
        }
        let latest = state.slides.len() - 1;
        let moved = self.index != latest;
        self.index = latest;
        moved
    }

    pub fn previous(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    pub fn next(&mut self, slide_count: usize) {
        if slide_count == 0 {
            return;
        }
        self.index = (self.index + 1).min(slide_count - 1);
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn preview_slide<'a>(&self, state: &'a SessionState) -> Option<&'a FinalSlide> {
        if state.slides.is_empty() {
            return None;
        }
        state.slides.get(self.index(state.slides.len()))
    }
}

#[cfg(test)]
#[path = "tests/projection_tests.rs"]
mod tests;
