//! Process record lifecycle and exit summaries.

use fog_supervisor::models::record::{ExitSummary, ProcessRecord, ProcessState};

#[test]
fn new_record_is_starting() {
    let record = ProcessRecord::new("controller".into(), Some(42), false);
    assert_eq!(record.state, ProcessState::Starting);
    assert_eq!(record.pid, Some(42));
    assert!(record.exit_status.is_none());
    assert!(!record.foreground);
}

#[test]
fn permitted_transitions() {
    let starting = ProcessRecord::new("a".into(), None, false);
    assert!(starting.can_transition_to(ProcessState::Running));
    assert!(starting.can_transition_to(ProcessState::Failed));
    assert!(starting.can_transition_to(ProcessState::Stopped));
    assert!(!starting.can_transition_to(ProcessState::Starting));

    let mut running = starting.clone();
    assert!(running.transition(ProcessState::Running));
    assert!(running.can_transition_to(ProcessState::Stopped));
    assert!(!running.can_transition_to(ProcessState::Failed));
    assert!(!running.can_transition_to(ProcessState::Starting));
}

#[test]
fn terminal_states_do_not_transition() {
    for terminal in [ProcessState::Stopped, ProcessState::Failed] {
        let mut record = ProcessRecord::new("a".into(), None, false);
        assert!(record.transition(terminal));
        assert!(terminal.is_terminal());
        for next in [
            ProcessState::Starting,
            ProcessState::Running,
            ProcessState::Stopped,
            ProcessState::Failed,
        ] {
            assert!(!record.transition(next));
            assert_eq!(record.state, terminal);
        }
    }
    assert!(!ProcessState::Starting.is_terminal());
    assert!(!ProcessState::Running.is_terminal());
}

#[test]
fn exit_summary_descriptions() {
    assert_eq!(ExitSummary::from_code(0).describe(), "exited normally (code 0)");
    assert_eq!(ExitSummary::from_code(3).describe(), "exited with code 3");
    assert_eq!(ExitSummary::from_signal(9).describe(), "terminated by signal 9");
    let unknown = ExitSummary {
        code: None,
        signal: None,
    };
    assert_eq!(unknown.describe(), "status unknown");
}

#[test]
fn exit_summary_shell_codes() {
    assert_eq!(ExitSummary::from_code(0).shell_code(), 0);
    assert_eq!(ExitSummary::from_code(7).shell_code(), 7);
    assert_eq!(ExitSummary::from_code(-1).shell_code(), 1);
    assert_eq!(ExitSummary::from_signal(15).shell_code(), 143);
    assert!(ExitSummary::from_code(0).success());
    assert!(!ExitSummary::from_signal(2).success());
}
