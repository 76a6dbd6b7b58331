//! Process access abstraction.
//!
//! The [`ProcessBackend`] trait decouples the orchestration state machine
//! (launch, probe, teardown) from the operating system. The production
//! implementation is [`OsProcessBackend`](super::os_process::OsProcessBackend);
//! tests substitute a scripted backend. Processes are addressed by role
//! name, which is unique within a session.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::models::record::ExitSummary;
use crate::models::service::ServiceSpec;
use crate::Result;

/// Result of a single termination attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// A termination request was delivered to a live process.
    Signalled,
    /// The process had already exited; nothing was sent.
    AlreadyExited(Option<ExitSummary>),
}

/// Operating-system process operations used by the orchestrator.
pub trait ProcessBackend {
    /// Start `spec` and return its process id, if the platform reports one.
    ///
    /// Background specs get a null stdin and have stdout/stderr appended to
    /// `spec.log_path`; the foreground spec inherits the supervisor's stdio.
    /// Must not wait for the child's own startup work.
    ///
    /// # Errors
    ///
    /// Returns an error if the log sink cannot be opened or the process
    /// cannot be spawned.
    fn spawn(&mut self, spec: &ServiceSpec) -> Result<Option<u32>>;

    /// Non-blocking liveness query: `None` while the process is still running.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be queried.
    fn try_wait(&mut self, role: &str) -> Result<Option<ExitSummary>>;

    /// Wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the role is unknown or the wait fails.
    fn wait<'a>(
        &'a mut self,
        role: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ExitSummary>> + 'a>>;

    /// Request termination of the process without waiting for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the termination request could not be delivered.
    fn terminate(&mut self, role: &str) -> Result<TerminateOutcome>;

    /// Give signalled processes up to `timeout` in total to exit, then
    /// force-kill whatever is left.
    fn settle(&mut self, timeout: Duration) -> Pin<Box<dyn Future<Output = ()> + '_>>;
}
