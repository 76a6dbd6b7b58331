//! Liveness-based readiness probe.
//!
//! The supervised services expose no health protocol, so readiness means
//! only "still alive once the grace period has elapsed". A service that is
//! up but not yet serving passes this check.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::backend::ProcessBackend;
use crate::models::record::{ExitSummary, ProcessRecord, ProcessState};
use crate::{AppError, Result};

/// Outcome of a readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Process was alive after its grace period.
    Ready,
    /// Process had exited; carries its status when it could be collected.
    Dead(Option<ExitSummary>),
}

/// Wait until `grace_period` has elapsed since launch, then check liveness.
///
/// Moves the record to `Running` on [`Readiness::Ready`] and to `Failed` on
/// [`Readiness::Dead`].
///
/// # Errors
///
/// Returns `AppError::Interrupted` if `cancel` fires during the wait.
pub async fn await_ready<B: ProcessBackend + ?Sized>(
    backend: &mut B,
    record: &mut ProcessRecord,
    grace_period: Duration,
    cancel: &CancellationToken,
) -> Result<Readiness> {
    let remaining = grace_period.saturating_sub(record.launched_at.elapsed());

    tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(AppError::Interrupted),
        () = tokio::time::sleep(remaining) => {}
    }

    match backend.try_wait(&record.role) {
        Ok(None) => {
            record.transition(ProcessState::Running);
            info!(role = record.role, ?grace_period, "service is alive after grace period");
            Ok(Readiness::Ready)
        }
        Ok(Some(status)) => {
            record.exit_status = Some(status);
            record.transition(ProcessState::Failed);
            warn!(role = record.role, status = %status.describe(), "service died during grace period");
            Ok(Readiness::Dead(Some(status)))
        }
        Err(err) => {
            record.transition(ProcessState::Failed);
            warn!(role = record.role, %err, "failed to poll service status; treating as dead");
            Ok(Readiness::Dead(None))
        }
    }
}
