use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an occurrence.
///
/// Valid transitions:
/// - PENDING → COMPLETED (user marks taken/done)
/// - PENDING → SKIPPED (user skips, optional reason)
/// - PENDING → MISSED (overdue sweep)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceStatus {
    Pending,
    Completed,
    Skipped,
    Missed,
}

impl OccurrenceStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OccurrenceStatus::Pending)
    }

    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &OccurrenceStatus) -> bool {
        match self {
            OccurrenceStatus::Pending => to.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for OccurrenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OccurrenceStatus::Pending => write!(f, "pending"),
            OccurrenceStatus::Completed => write!(f, "completed"),
            OccurrenceStatus::Skipped => write!(f, "skipped"),
            OccurrenceStatus::Missed => write!(f, "missed"),
        }
    }
}

/// One expected instance of a schedule.
///
/// Times are local wall-clock, anchored by the engine's configured offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: String,
    /// Owning schedule (reference only).
    pub schedule_id: String,
    pub scheduled_at: NaiveDateTime,
    pub status: OccurrenceStatus,
    /// Set iff `status == Completed`.
    pub actual_completion_time: Option<NaiveDateTime>,
    /// Flipped together with the missed transition; gates the missed notification.
    pub notified_missed: bool,
    /// Gates the optional "due soon" reminder.
    #[serde(default)]
    pub notified_reminder: bool,
    pub note: Option<String>,
}

impl Occurrence {
    pub fn new(schedule_id: impl Into<String>, scheduled_at: NaiveDateTime) -> Self {
        Self {
            id: format!("occ-{}", uuid::Uuid::new_v4()),
            schedule_id: schedule_id.into(),
            scheduled_at,
            status: OccurrenceStatus::Pending,
            actual_completion_time: None,
            notified_missed: false,
            notified_reminder: false,
            note: None,
        }
    }

    /// Pending and already past its scheduled time (counts toward adherence).
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.status == OccurrenceStatus::Pending && self.scheduled_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_can_transition() {
        use OccurrenceStatus::*;
        for to in [Completed, Skipped, Missed] {
            assert!(Pending.can_transition_to(&to));
        }
        assert!(!Pending.can_transition_to(&Pending));
        for from in [Completed, Skipped, Missed] {
            for to in [Pending, Completed, Skipped, Missed] {
                assert!(!from.can_transition_to(&to), "{from} -> {to} must be rejected");
            }
        }
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&OccurrenceStatus::Missed).unwrap();
        assert_eq!(json, "\"missed\"");
    }
}
