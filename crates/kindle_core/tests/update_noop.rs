use kindle_core::{update, Msg, RunState};

#[test]
fn cleanup_report_on_fresh_run_is_noop() {
    let state = RunState::new();
    let (next, effects) = update(state.clone(), Msg::CleanedUp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}
