//! In-memory schedule definition store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{NewSchedule, ScheduleDefinition};
use crate::error::{CoreError, EntityKind, Result};

/// Which definitions a listing returns.
#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    /// Include retired definitions (reports) instead of active only (current views).
    pub include_retired: bool,
    /// Restrict to one owner.
    pub owner_id: Option<String>,
}

impl ScheduleFilter {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn history() -> Self {
        Self {
            include_retired: true,
            owner_id: None,
        }
    }

    pub fn for_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    fn accepts(&self, schedule: &ScheduleDefinition) -> bool {
        (self.include_retired || schedule.is_active)
            && self
                .owner_id
                .as_deref()
                .map_or(true, |owner| schedule.owner_id == owner)
    }
}

/// Holds every schedule definition ever created, in creation order.
#[derive(Debug, Default)]
pub struct ScheduleStore {
    schedules: HashMap<String, ScheduleDefinition>,
    order: Vec<String>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a new definition.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] and leaves the store untouched when
    /// any field is malformed.
    pub fn create(&mut self, new: NewSchedule, now: DateTime<Utc>) -> Result<ScheduleDefinition> {
        let schedule = ScheduleDefinition::build(new, now)?;
        self.order.push(schedule.id.clone());
        self.schedules.insert(schedule.id.clone(), schedule.clone());
        Ok(schedule)
    }

    /// Flip `is_active` off. Retiring twice is harmless.
    pub fn retire(&mut self, id: &str) -> Result<ScheduleDefinition> {
        let schedule = self
            .schedules
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Schedule, id))?;
        schedule.is_active = false;
        Ok(schedule.clone())
    }

    pub fn get(&self, id: &str) -> Result<&ScheduleDefinition> {
        self.schedules
            .get(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Schedule, id))
    }

    pub fn list(&self, filter: &ScheduleFilter) -> Vec<&ScheduleDefinition> {
        self.order
            .iter()
            .filter_map(|id| self.schedules.get(id))
            .filter(|s| filter.accepts(s))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ScheduleKind;
    use chrono::NaiveDate;

    fn new(owner: &str, name: &str, times: &[&str]) -> NewSchedule {
        NewSchedule::new(
            owner,
            ScheduleKind::Medication,
            name,
            times,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    #[test]
    fn create_stores_valid_schedule() {
        let mut store = ScheduleStore::new();
        let created = store.create(new("p1", "Lisinopril", &["08:00"]), Utc::now()).unwrap();
        assert_eq!(store.get(&created.id).unwrap().name, "Lisinopril");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn create_rejects_invalid_without_storing() {
        let mut store = ScheduleStore::new();
        let err = store.create(new("p1", "Lisinopril", &["08:00", "25:00"]), Utc::now());
        assert!(matches!(err, Err(CoreError::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn retire_keeps_history() {
        let mut store = ScheduleStore::new();
        let a = store.create(new("p1", "Lisinopril", &["08:00"]), Utc::now()).unwrap();
        let b = store.create(new("p1", "Atorvastatin", &["21:00"]), Utc::now()).unwrap();

        let retired = store.retire(&a.id).unwrap();
        assert!(!retired.is_active);
        assert!(store.retire(&a.id).is_ok());

        let active: Vec<_> = store.list(&ScheduleFilter::active()).iter().map(|s| s.id.clone()).collect();
        assert_eq!(active, vec![b.id.clone()]);

        let all: Vec<_> = store.list(&ScheduleFilter::history()).iter().map(|s| s.id.clone()).collect();
        assert_eq!(all, vec![a.id, b.id]);
    }

    #[test]
    fn retire_unknown_is_not_found() {
        let mut store = ScheduleStore::new();
        assert!(matches!(
            store.retire("sched-missing"),
            Err(CoreError::NotFound { entity: EntityKind::Schedule, .. })
        ));
    }

    #[test]
    fn list_filters_by_owner() {
        let mut store = ScheduleStore::new();
        store.create(new("p1", "Lisinopril", &["08:00"]), Utc::now()).unwrap();
        store.create(new("p2", "Insulin", &["07:30"]), Utc::now()).unwrap();
        let listed = store.list(&ScheduleFilter::active().for_owner("p2"));
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Insulin");
    }
}
