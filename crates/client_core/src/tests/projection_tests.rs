use super::*;
use crate::{
    fixtures::{outline_with, slide},
    session::{apply_event, replay},
};
use shared::protocol::{ServerEvent, StatusPayload};

fn statuses(steps: &[ProgressStep]) -> Vec<StepStatus> {
    steps.iter().map(|step| step.status).collect()
}

#[test]
fn idle_session_has_two_pending_steps() {
    let steps = progress_steps(&SessionState::idle());
    assert_eq!(
        statuses(&steps),
        vec![StepStatus::Pending, StepStatus::Pending]
    );
    assert_eq!(active_step_count(&steps), 0);
}

#[test]
fn planning_marks_outline_step_active() {
    let steps = progress_steps(&SessionState::connecting().start_planning());
    assert_eq!(statuses(&steps), vec![StepStatus::Done, StepStatus::Active]);
    assert_eq!(active_step_count(&steps), 2);
}

#[test]
fn slide_steps_follow_received_slides_and_current_index() {
    let state = replay(
        &SessionState::connecting().start_planning(),
        vec![
            ServerEvent::Outline(outline_with(&["Intro", "Body", "Close"])),
            ServerEvent::Slide(Box::new(slide(0))),
            ServerEvent::Status(StatusPayload {
                status: Some(Phase::Designing),
                message: Some("designing 2/3".to_string()),
                slide_index: Some(1),
                total_slides: Some(3),
            }),
        ],
    );

    let steps = progress_steps(&state);
    assert_eq!(steps.len(), 5);
    assert_eq!(steps[2].label, "Design slide 1: Intro");
    assert_eq!(
        statuses(&steps),
        vec![
            StepStatus::Done,
            StepStatus::Done,
            StepStatus::Done,
            StepStatus::Active,
            StepStatus::Pending,
        ]
    );
    assert_eq!(active_step_count(&steps), 4);
}

#[test]
fn slide_step_matches_by_slide_index_not_position() {
    let state = replay(
        &SessionState::connecting().start_planning(),
        vec![
            ServerEvent::Outline(outline_with(&["A", "B"])),
            ServerEvent::Slide(Box::new(slide(1))),
        ],
    );
    let steps = progress_steps(&state);
    assert_eq!(steps[2].status, StepStatus::Pending);
    assert_eq!(steps[3].status, StepStatus::Done);
}

#[test]
fn generating_predicate_excludes_idle_and_terminal_phases() {
    assert!(!is_generating(&SessionState::idle()));
    assert!(is_generating(&SessionState::connecting()));
    assert!(!is_generating(&SessionState::connecting().fail_transport()));
}

#[test]
fn cursor_follows_latest_slide_while_generating() {
    let mut cursor = PreviewCursor::default();
    let state = replay(
        &SessionState::connecting().start_planning(),
        vec![
            ServerEvent::Slide(Box::new(slide(0))),
            ServerEvent::Slide(Box::new(slide(1))),
        ],
    );
    assert!(cursor.follow_latest(&state));
    assert_eq!(cursor.index(state.slides.len()), 1);
    assert!(!cursor.follow_latest(&state));

    let failed = state.fail_transport();
    cursor.reset();
    assert!(!cursor.follow_latest(&failed));
    assert_eq!(cursor.preview_slide(&failed).map(|s| s.index), Some(0));
}

#[test]
fn cursor_navigation_is_clamped() {
    let state = apply_event(
        &SessionState::connecting(),
        ServerEvent::Slide(Box::new(slide(0))),
    );
    let mut cursor = PreviewCursor::new(5);
    assert_eq!(cursor.index(1), 0);
    assert_eq!(cursor.preview_slide(&state).map(|s| s.index), Some(0));

    cursor.reset();
    cursor.previous();
    assert_eq!(cursor.index(3), 0);
    cursor.next(3);
    cursor.next(3);
    cursor.next(3);
    assert_eq!(cursor.index(3), 2);
    cursor.next(0);
    assert_eq!(cursor.index(3), 2);

    assert!(cursor.preview_slide(&SessionState::idle()).is_none());
}
