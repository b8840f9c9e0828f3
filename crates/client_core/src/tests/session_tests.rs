use super::*;
use crate::fixtures::{outline_with, slide};

fn status(phase: Phase, slide_index: Option<usize>, total_slides: Option<usize>) -> ServerEvent {
    ServerEvent::Status(StatusPayload {
        status: Some(phase),
        message: Some(format!("{phase}")),
        slide_index,
        total_slides,
    })
}

fn slide_event(index: usize) -> ServerEvent {
    ServerEvent::Slide(Box::new(slide(index)))
}

#[test]
fn status_updates_only_present_fields() {
    let state = apply_event(
        &SessionState::connecting().start_planning(),
        status(Phase::Designing, Some(1), Some(5)),
    );
    assert_eq!(state.phase, Phase::Designing);
    assert_eq!(state.current_slide_index, Some(1));
    assert_eq!(state.total_slides, 5);

    let next = apply_event(&state, status(Phase::GeneratingImage, None, None));
    assert_eq!(next.phase, Phase::GeneratingImage);
    assert_eq!(next.status_message, "generating_image");
    assert_eq!(next.current_slide_index, Some(1));
    assert_eq!(next.total_slides, 5);
}

#[test]
fn status_without_message_keeps_previous_message() {
    let state = apply_event(
        &SessionState::connecting().start_planning(),
        ServerEvent::Status(StatusPayload {
            status: Some(Phase::Designing),
            message: Some("Designing slide 1".to_string()),
            slide_index: Some(0),
            total_slides: Some(3),
        }),
    );
    let next = apply_event(
        &state,
        ServerEvent::Status(StatusPayload {
            status: Some(Phase::GeneratingImage),
            message: None,
            slide_index: None,
            total_slides: None,
        }),
    );
    assert_eq!(next.phase, Phase::GeneratingImage);
    assert_eq!(next.status_message, "Designing slide 1");
    assert_eq!(next.current_slide_index, Some(0));
}

#[test]
fn status_without_phase_keeps_previous_phase() {
    let state = apply_event(
        &SessionState::connecting().start_planning(),
        status(Phase::Designing, Some(1), Some(4)),
    );
    let next = apply_event(
        &state,
        ServerEvent::Status(StatusPayload {
            status: None,
            message: Some("still working".to_string()),
            slide_index: None,
            total_slides: None,
        }),
    );
    assert_eq!(next.phase, Phase::Designing);
    assert_eq!(next.status_message, "still working");
    assert_eq!(next.total_slides, 4);
}

#[test]
fn error_status_fills_error_text() {
    let state = apply_event(
        &SessionState::connecting().start_planning(),
        ServerEvent::Status(StatusPayload {
            status: Some(Phase::Error),
            message: Some("quota exceeded".to_string()),
            slide_index: None,
            total_slides: None,
        }),
    );
    assert_eq!(state.phase, Phase::Error);
    assert_eq!(state.error, "quota exceeded");

    let blank = apply_event(
        &SessionState::connecting().start_planning(),
        ServerEvent::Status(StatusPayload {
            status: Some(Phase::Error),
            message: Some(String::new()),
            slide_index: None,
            total_slides: None,
        }),
    );
    assert_eq!(blank.phase, Phase::Error);
    assert_eq!(blank.error, "Generation failed");
    assert_eq!(apply_event(&blank, slide_event(0)), blank);
}

#[test]
fn outline_overrides_any_previous_total() {
    let state = apply_event(
        &SessionState::connecting(),
        status(Phase::Planning, None, Some(9)),
    );
    let state = apply_event(&state, ServerEvent::Outline(outline_with(&["A", "B", "C"])));
    assert_eq!(state.total_slides, 3);
    assert_eq!(state.status_message, "Outline ready: 3 slides");
    assert_eq!(state.title(), Some("Deck"));
}

#[test]
fn slides_append_in_event_order_without_dedupe() {
    let events = vec![slide_event(1), slide_event(0), slide_event(1)];
    let state = replay(&SessionState::connecting().start_planning(), events);
    let indices: Vec<usize> = state.slides.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![1, 0, 1]);
}

#[test]
fn error_event_is_terminal_and_keeps_received_slides() {
    let state = replay(
        &SessionState::connecting().start_planning(),
        vec![
            slide_event(0),
            ServerEvent::Error(ErrorPayload {
                message: "slide 2 failed".to_string(),
                slide_index: Some(1),
            }),
            slide_event(2),
            status(Phase::Designing, Some(2), None),
        ],
    );
    assert_eq!(state.phase, Phase::Error);
    assert_eq!(state.error, "slide 2 failed");
    assert_eq!(state.status_message, "slide 2 failed");
    assert_eq!(state.slides.len(), 1);
}

#[test]
fn empty_error_message_gets_fallback_text() {
    let state = apply_event(
        &SessionState::connecting(),
        ServerEvent::Error(ErrorPayload {
            message: "  ".to_string(),
            slide_index: None,
        }),
    );
    assert_eq!(state.phase, Phase::Error);
    assert!(!state.error.is_empty());
}

#[test]
fn done_freezes_the_session() {
    let done = apply_event(
        &SessionState::connecting(),
        ServerEvent::Done(DonePayload {
            total_slides: Some(0),
            title: None,
        }),
    );
    assert_eq!(done.status_message, "All done! 0 slides");
    let after = apply_event(&done, slide_event(0));
    assert_eq!(after, done);
    assert_eq!(done.fail_transport(), done);
    assert_eq!(done.start_planning(), done);
}

#[test]
fn done_without_total_counts_received_slides() {
    let state = replay(
        &SessionState::connecting().start_planning(),
        vec![
            slide_event(0),
            slide_event(1),
            slide_event(2),
            ServerEvent::Done(DonePayload {
                total_slides: None,
                title: None,
            }),
        ],
    );
    assert_eq!(state.phase, Phase::Done);
    assert_eq!(state.status_message, "All done! 3 slides");
}

#[test]
fn transport_failure_uses_generic_message() {
    let state = SessionState::connecting().start_planning().fail_transport();
    assert_eq!(state.phase, Phase::Error);
    assert_eq!(state.error, TRANSPORT_ERROR_MESSAGE);
    assert_eq!(state.status_message, TRANSPORT_ERROR_STATUS);
}

#[test]
fn connecting_resets_everything() {
    let busy = replay(
        &SessionState::connecting(),
        vec![ServerEvent::Outline(outline_with(&["A"])), slide_event(0)],
    );
    assert_eq!(busy.slides.len(), 1);
    let fresh = SessionState::connecting();
    assert!(fresh.slides.is_empty());
    assert!(fresh.outline.is_none());
    assert_eq!(fresh.current_slide_index, None);
    assert_eq!(fresh.phase, Phase::Connecting);
}

#[test]
fn full_generation_scenario_ends_done() {
    let state = replay(
        &SessionState::connecting().start_planning(),
        vec![
            status(Phase::Planning, None, None),
            ServerEvent::Outline(outline_with(&["A", "B"])),
            slide_event(0),
            slide_event(1),
            ServerEvent::Done(DonePayload {
                total_slides: Some(2),
                title: Some("Deck".to_string()),
            }),
        ],
    );
    assert_eq!(state.phase, Phase::Done);
    assert_eq!(state.slides.len(), 2);
    assert_eq!(state.total_slides, 2);
    assert!(state.has_slide(1));
    assert!(!state.is_generating());
}
