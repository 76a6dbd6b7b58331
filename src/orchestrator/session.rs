//! Per-run session state.
//!
//! A [`Session`] owns every [`ProcessRecord`] created during one
//! orchestration run, in startup order, together with the one-shot
//! teardown latch and the exit code to report.

use uuid::Uuid;

use crate::models::record::{ProcessRecord, ProcessState};
use crate::{AppError, Result};

/// State for one orchestration run.
#[derive(Debug)]
pub struct Session {
    id: String,
    records: Vec<ProcessRecord>,
    teardown_ran: bool,
    exit_code: u8,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create an empty session with a generated identifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            records: Vec::new(),
            teardown_ran: false,
            exit_code: 0,
        }
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Records in startup order.
    #[must_use]
    pub fn records(&self) -> &[ProcessRecord] {
        &self.records
    }

    /// Look up a record by role.
    #[must_use]
    pub fn record(&self, role: &str) -> Option<&ProcessRecord> {
        self.records.iter().find(|r| r.role == role)
    }

    /// Mutable lookup by role.
    pub fn record_mut(&mut self, role: &str) -> Option<&mut ProcessRecord> {
        self.records.iter_mut().find(|r| r.role == role)
    }

    /// Whether `role` has a record in `Running` state.
    #[must_use]
    pub fn is_running(&self, role: &str) -> bool {
        self.record(role)
            .is_some_and(|r| r.state == ProcessState::Running)
    }

    /// Append a freshly launched record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Ordering` if the role already has a record or a
    /// foreground record has already been appended.
    pub fn push(&mut self, record: ProcessRecord) -> Result<()> {
        if self.records.iter().any(|r| r.foreground) {
            return Err(AppError::Ordering(format!(
                "cannot add {} after the foreground driver",
                record.role
            )));
        }
        if self.record(&record.role).is_some() {
            return Err(AppError::Ordering(format!(
                "role {} already has a process record",
                record.role
            )));
        }
        self.records.push(record);
        Ok(())
    }

    /// Iterate records in teardown (reverse startup) order.
    pub fn records_for_teardown(&mut self) -> impl Iterator<Item = &mut ProcessRecord> {
        self.records.iter_mut().rev()
    }

    /// Whether teardown has already run.
    #[must_use]
    pub fn teardown_ran(&self) -> bool {
        self.teardown_ran
    }

    /// Set the teardown latch; returns `false` if it was already set.
    pub(crate) fn claim_teardown(&mut self) -> bool {
        !std::mem::replace(&mut self.teardown_ran, true)
    }

    /// Exit code to report.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    /// Record the exit code to report.
    pub fn set_exit_code(&mut self, code: u8) {
        self.exit_code = code;
    }
}
