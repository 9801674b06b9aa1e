//! Toggle transition table tests.

use framegrab::{GrabState, ToggleAction};

// ── Toggle actions ─────────────────────────────────────────────────

#[test]
fn idle_states_start_a_grab() {
    for state in [
        GrabState::Ready,
        GrabState::Complete { shots: 4 },
        GrabState::Canceled,
    ] {
        assert_eq!(state.toggle_action(), ToggleAction::Start, "{state}");
        assert_eq!(state.toggled(), GrabState::Grabbing, "{state}");
    }
}

#[test]
fn pause_resumes() {
    assert_eq!(GrabState::Pause.toggle_action(), ToggleAction::Resume);
    assert_eq!(GrabState::Pause.toggled(), GrabState::Grabbing);
}

#[test]
fn grabbing_pauses() {
    assert_eq!(GrabState::Grabbing.toggle_action(), ToggleAction::Pause);
    assert_eq!(GrabState::Grabbing.toggled(), GrabState::Pause);
}

#[test]
fn calculating_ignores_toggle() {
    assert_eq!(GrabState::Calculating.toggle_action(), ToggleAction::Ignore);
    assert_eq!(GrabState::Calculating.toggled(), GrabState::Calculating);
}

#[test]
fn repeated_toggles_alternate() {
    let mut state = GrabState::Ready;
    let mut seen = Vec::new();
    for _ in 0..4 {
        state = state.toggled();
        seen.push(state);
    }
    assert_eq!(
        seen,
        vec![
            GrabState::Grabbing,
            GrabState::Pause,
            GrabState::Grabbing,
            GrabState::Pause,
        ]
    );
}

// ── State properties ───────────────────────────────────────────────

#[test]
fn default_state_is_ready() {
    assert_eq!(GrabState::default(), GrabState::Ready);
}

#[test]
fn active_states() {
    assert!(GrabState::Calculating.is_active());
    assert!(GrabState::Grabbing.is_active());
    assert!(GrabState::Pause.is_active());
    assert!(!GrabState::Ready.is_active());
    assert!(!GrabState::Complete { shots: 1 }.is_active());
    assert!(!GrabState::Canceled.is_active());
}

#[test]
fn display_names() {
    assert_eq!(GrabState::Pause.to_string(), "paused");
    assert_eq!(
        GrabState::Complete { shots: 4 }.to_string(),
        "complete (4 shots)"
    );
}
