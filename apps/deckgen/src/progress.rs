//! Line-oriented progress output for a generation run.

use client_core::{
    projection::{active_step_count, progress_steps, ProgressStep, StepStatus},
    SessionState,
};
use shared::domain::Phase;

/// Remembers what has already been printed so each state snapshot only
/// produces the lines that are new.
#[derive(Debug, Default)]
pub struct ProgressView {
    last_status: String,
    outline_shown: bool,
    slides_shown: usize,
    error_shown: bool,
}

impl ProgressView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, state: &SessionState) -> Vec<String> {
        let mut lines = Vec::new();

        if !state.status_message.is_empty() && state.status_message != self.last_status {
            self.last_status = state.status_message.clone();
            lines.push(format!("[{}] {}", state.phase, state.status_message));
        }

        if !self.outline_shown {
            if let Some(outline) = &state.outline {
                self.outline_shown = true;
                lines.push(format!("Outline: {}", outline.title));
                for (index, planned) in outline.slides.iter().enumerate() {
                    lines.push(format!("  {:>2}. {}", index + 1, planned.title));
                }
            }
        }

        let total = state.total_slides.max(state.slides.len());
        for slide in state.slides.iter().skip(self.slides_shown) {
            lines.push(format!(
                "Slide {}/{} ready: {}",
                slide.index + 1,
                total,
                slide.design.title
            ));
        }
        self.slides_shown = self.slides_shown.max(state.slides.len());

        if state.phase == Phase::Error && !self.error_shown {
            self.error_shown = true;
            lines.push(format!("Error: {}", state.error));
        }

        lines
    }
}

fn marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Done => "[x]",
        StepStatus::Active => "[>]",
        StepStatus::Pending => "[ ]",
    }
}

pub fn render_steps(steps: &[ProgressStep]) -> String {
    let mut out = format!("Progress {}/{}\n", active_step_count(steps), steps.len());
    for step in steps {
        out.push_str(marker(step.status));
        out.push(' ');
        out.push_str(&step.label);
        out.push('\n');
    }
    out
}

/// Checklist of every step for the final summary.
pub fn summary(state: &SessionState) -> String {
    render_steps(&progress_steps(state))
}

#[cfg(test)]
#[path = "tests/progress_tests.rs"]
mod tests;
