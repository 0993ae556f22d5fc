//! Notification boundary.
//!
//! The engine is a producer only: it pushes [`NotificationEvent`]s into a
//! [`NotificationSink`] and never reads them back. [`NotificationCenter`] is
//! the in-memory collaborator presentation layers read from.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, EntityKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    /// Occurrence is coming up.
    Reminder,
    /// Occurrence passed without being completed or skipped.
    Missed,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

/// A domain event destined for the notification center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: String,
    pub related_occurrence_id: Option<String>,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    pub priority: NotificationPriority,
}

impl NotificationEvent {
    pub fn new(
        category: NotificationCategory,
        priority: NotificationPriority,
        title: impl Into<String>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("notif-{}", uuid::Uuid::new_v4()),
            related_occurrence_id: None,
            category,
            title: title.into(),
            message: message.into(),
            created_at,
            read: false,
            priority,
        }
    }

    pub fn for_occurrence(mut self, occurrence_id: impl Into<String>) -> Self {
        self.related_occurrence_id = Some(occurrence_id.into());
        self
    }
}

/// Where the engine sends notifications.
pub trait NotificationSink: Send + Sync {
    fn push(&self, event: NotificationEvent);
}

impl<S: NotificationSink + ?Sized> NotificationSink for Arc<S> {
    fn push(&self, event: NotificationEvent) {
        (**self).push(event)
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn push(&self, _event: NotificationEvent) {}
}

/// In-memory notification center, newest first, bounded.
///
/// Interior mutability lets one `Arc<NotificationCenter>` serve as the
/// engine's sink and the UI's read model at the same time.
#[derive(Debug)]
pub struct NotificationCenter {
    capacity: usize,
    events: Mutex<VecDeque<NotificationEvent>>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(200)
    }
}

impl NotificationCenter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// All retained notifications, newest first.
    pub fn list(&self) -> Vec<NotificationEvent> {
        self.lock().iter().cloned().collect()
    }

    pub fn mark_read(&self, id: &str) -> Result<()> {
        let mut events = self.lock();
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Notification, id))?;
        event.read = true;
        Ok(())
    }

    pub fn mark_all_read(&self) -> usize {
        let mut events = self.lock();
        let mut changed = 0;
        for event in events.iter_mut().filter(|e| !e.read) {
            event.read = true;
            changed += 1;
        }
        changed
    }

    pub fn unread_count(&self) -> usize {
        self.lock().iter().filter(|e| !e.read).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Pushes are infallible, so a poisoned lock is recovered rather than
    // surfaced.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<NotificationEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl NotificationSink for NotificationCenter {
    fn push(&self, event: NotificationEvent) {
        let mut events = self.lock();
        events.push_front(event);
        events.truncate(self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(title: &str) -> NotificationEvent {
        NotificationEvent::new(
            NotificationCategory::Missed,
            NotificationPriority::High,
            title,
            "message",
            Utc::now(),
        )
    }

    #[test]
    fn list_is_newest_first() {
        let center = NotificationCenter::default();
        center.push(event("first"));
        center.push(event("second"));
        let titles: Vec<_> = center.list().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[test]
    fn mark_read_updates_unread_count() {
        let center = NotificationCenter::default();
        let e = event("one");
        let id = e.id.clone();
        center.push(e);
        center.push(event("two"));
        assert_eq!(center.unread_count(), 2);
        center.mark_read(&id).unwrap();
        assert_eq!(center.unread_count(), 1);
        assert_eq!(center.mark_all_read(), 1);
        assert_eq!(center.unread_count(), 0);
    }

    #[test]
    fn mark_read_unknown_is_not_found() {
        let center = NotificationCenter::default();
        assert!(matches!(
            center.mark_read("notif-nope"),
            Err(CoreError::NotFound { entity: EntityKind::Notification, .. })
        ));
    }

    #[test]
    fn capacity_drops_oldest() {
        let center = NotificationCenter::new(2);
        center.push(event("a"));
        center.push(event("b"));
        center.push(event("c"));
        let titles: Vec<_> = center.list().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["c", "b"]);
    }

    #[test]
    fn shared_center_works_as_sink() {
        let center = Arc::new(NotificationCenter::default());
        let sink: Box<dyn NotificationSink> = Box::new(Arc::clone(&center));
        sink.push(event("via arc"));
        assert_eq!(center.len(), 1);
    }
}
