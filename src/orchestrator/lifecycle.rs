//! Session teardown.
//!
//! [`teardown`] runs at most once per [`Session`]: the session's latch is
//! claimed first, so a second trigger (an interrupt racing normal exit, or
//! a fatal error after a signal) is a no-op. Every record gets exactly one
//! termination attempt, newest first. Individual failures are logged and
//! swallowed; teardown never fails.

use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};

use super::backend::{ProcessBackend, TerminateOutcome};
use super::session::Session;
use crate::models::record::ProcessState;

/// What happened to one record during teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// A termination request was sent.
    Signalled,
    /// The process was already gone; nothing was sent.
    AlreadyExited,
    /// The request could not be delivered.
    Failed(String),
}

/// One termination attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationAttempt {
    /// Role the attempt targeted.
    pub role: String,
    /// Result of the attempt.
    pub result: AttemptResult,
}

/// Summary of a completed teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Attempts in the order they were issued (reverse startup order).
    pub attempts: Vec<TerminationAttempt>,
}

impl TeardownReport {
    /// Roles that were sent a termination request, in order.
    #[must_use]
    pub fn signalled_roles(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .filter(|a| a.result == AttemptResult::Signalled)
            .map(|a| a.role.as_str())
            .collect()
    }

    /// Every role attempted, in order.
    #[must_use]
    pub fn attempted_roles(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.role.as_str()).collect()
    }
}

/// Terminate every process in `session`, newest first.
///
/// Returns `None` without touching anything if teardown already ran for
/// this session. After issuing all requests, waits at most `stop_timeout`
/// for the signalled processes to exit.
pub async fn teardown<B: ProcessBackend + ?Sized>(
    backend: &mut B,
    session: &mut Session,
    stop_timeout: Duration,
) -> Option<TeardownReport> {
    if !session.claim_teardown() {
        debug!(session_id = session.id(), "teardown already ran, skipping");
        return None;
    }

    let span = info_span!("teardown", session_id = session.id());
    async move {
        let mut report = TeardownReport::default();

        for record in session.records_for_teardown() {
            let result = if record.state.is_terminal() {
                AttemptResult::AlreadyExited
            } else {
                match backend.terminate(&record.role) {
                    Ok(TerminateOutcome::Signalled) => {
                        info!(
                            role = record.role,
                            pid = record.pid.unwrap_or(0),
                            "termination requested"
                        );
                        AttemptResult::Signalled
                    }
                    Ok(TerminateOutcome::AlreadyExited(status)) => {
                        if record.exit_status.is_none() {
                            record.exit_status = status;
                        }
                        debug!(role = record.role, "process already exited");
                        AttemptResult::AlreadyExited
                    }
                    Err(err) => {
                        warn!(role = record.role, %err, "failed to terminate process");
                        AttemptResult::Failed(err.to_string())
                    }
                }
            };

            record.transition(ProcessState::Stopped);
            report.attempts.push(TerminationAttempt {
                role: record.role.clone(),
                result,
            });
        }

        if !report.signalled_roles().is_empty() {
            backend.settle(stop_timeout).await;
        }

        info!(attempts = report.attempts.len(), "teardown complete");
        Some(report)
    }
    .instrument(span)
    .await
}
