//! Runtime process records and their lifecycle.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Lifecycle state of a started service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Spawned, readiness not yet confirmed.
    Starting,
    /// Passed its readiness check (or is the foreground driver).
    Running,
    /// Exited or was terminated during teardown.
    Stopped,
    /// Found dead at its readiness check.
    Failed,
}

impl ProcessState {
    /// Whether no further transitions are possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

/// Collected exit status of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitSummary {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal number, if the process was killed by a signal.
    pub signal: Option<i32>,
}

impl ExitSummary {
    /// Summary for a process that exited with `code`.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Summary for a process killed by `signal`.
    #[must_use]
    pub fn from_signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Whether the process exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Shell-style exit code for propagating this status.
    ///
    /// Signals map to `128 + signal`; anything unrepresentable maps to 1.
    #[must_use]
    pub fn shell_code(&self) -> u8 {
        match (self.code, self.signal) {
            (Some(code), _) => u8::try_from(code).unwrap_or(1),
            (None, Some(signal)) => u8::try_from(128 + signal).unwrap_or(1),
            (None, None) => 1,
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn describe(&self) -> String {
        match (self.code, self.signal) {
            (Some(0), _) => "exited normally (code 0)".to_owned(),
            (Some(code), _) => format!("exited with code {code}"),
            (None, Some(signal)) => format!("terminated by signal {signal}"),
            (None, None) => "status unknown".to_owned(),
        }
    }
}

impl From<std::process::ExitStatus> for ExitSummary {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Runtime state bound to one started [`ServiceSpec`](crate::models::service::ServiceSpec).
///
/// Created only by a successful launch and owned by the session.
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    /// Role of the service.
    pub role: String,
    /// OS process id, when the platform reported one.
    pub pid: Option<u32>,
    /// Current lifecycle state.
    pub state: ProcessState,
    /// Wall-clock launch time.
    pub started_at: DateTime<Utc>,
    /// Monotonic launch time, used to schedule the readiness check.
    pub launched_at: Instant,
    /// Whether this is the foreground driver.
    pub foreground: bool,
    /// Exit status, set once termination has been observed.
    pub exit_status: Option<ExitSummary>,
}

impl ProcessRecord {
    /// Construct a freshly launched record in `Starting` state.
    #[must_use]
    pub fn new(role: String, pid: Option<u32>, foreground: bool) -> Self {
        Self {
            role,
            pid,
            state: ProcessState::Starting,
            started_at: Utc::now(),
            launched_at: Instant::now(),
            foreground,
            exit_status: None,
        }
    }

    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(&self, next: ProcessState) -> bool {
        matches!(
            (self.state, next),
            (
                ProcessState::Starting,
                ProcessState::Running | ProcessState::Failed | ProcessState::Stopped
            ) | (ProcessState::Running, ProcessState::Stopped)
        )
    }

    /// Move to `next` if the transition is permitted.
    ///
    /// Returns `false` and leaves the state untouched otherwise.
    pub fn transition(&mut self, next: ProcessState) -> bool {
        if self.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }
}
