//! Occurrence state machine.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{Occurrence, OccurrenceStatus};
use crate::error::{CoreError, Result};

/// Outcome of a successful transition call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// Status changed.
    Applied,
    /// Already in the requested state; nothing changed.
    Unchanged,
}

impl Occurrence {
    fn reject(&self, to: OccurrenceStatus) -> CoreError {
        CoreError::InvalidStateTransition {
            occurrence_id: self.id.clone(),
            from: self.status,
            to,
        }
    }

    /// PENDING → COMPLETED at `at`. Completing twice is a no-op.
    pub fn complete(&mut self, at: NaiveDateTime) -> Result<Transition> {
        match self.status {
            OccurrenceStatus::Completed => Ok(Transition::Unchanged),
            OccurrenceStatus::Pending => {
                self.status = OccurrenceStatus::Completed;
                self.actual_completion_time = Some(at);
                Ok(Transition::Applied)
            }
            _ => Err(self.reject(OccurrenceStatus::Completed)),
        }
    }

    /// PENDING → SKIPPED, keeping `reason` as the note.
    pub fn skip(&mut self, reason: Option<String>) -> Result<Transition> {
        if !self.status.can_transition_to(&OccurrenceStatus::Skipped) {
            return Err(self.reject(OccurrenceStatus::Skipped));
        }
        self.status = OccurrenceStatus::Skipped;
        if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
            self.note = Some(reason);
        }
        Ok(Transition::Applied)
    }

    /// PENDING → MISSED once `now` is past `scheduled_at + grace`.
    ///
    /// `notified_missed` flips in the same step so the caller emits the
    /// missed notification exactly once.
    pub fn miss(&mut self, now: NaiveDateTime, grace: Duration) -> Result<Transition> {
        if !self.status.can_transition_to(&OccurrenceStatus::Missed) {
            return Err(self.reject(OccurrenceStatus::Missed));
        }
        let due_at = self.scheduled_at + grace;
        if now <= due_at {
            return Err(CoreError::NotYetDue {
                occurrence_id: self.id.clone(),
                due_at,
            });
        }
        self.status = OccurrenceStatus::Missed;
        self.notified_missed = true;
        Ok(Transition::Applied)
    }
}
