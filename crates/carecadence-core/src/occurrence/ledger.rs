//! Indexed occurrence storage.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};

use super::{Occurrence, OccurrenceStatus, Transition};
use crate::error::{CoreError, EntityKind, Result};

/// Every occurrence ever generated. Nothing is removed; history feeds
/// adherence.
#[derive(Debug, Default)]
pub struct OccurrenceLedger {
    occurrences: HashMap<String, Occurrence>,
    /// (schedule_id, scheduled_at) -> occurrence id. Enforces uniqueness.
    by_key: BTreeMap<(String, NaiveDateTime), String>,
    /// Pending occurrences ordered by scheduled time.
    pending: BTreeSet<(NaiveDateTime, String)>,
    /// Dates already expanded per schedule.
    generated: HashSet<(String, NaiveDate)>,
}

impl OccurrenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending occurrence for the key unless one exists.
    ///
    /// Returns the occurrence id and whether it was created.
    pub fn insert_if_absent(
        &mut self,
        schedule_id: &str,
        scheduled_at: NaiveDateTime,
    ) -> (String, bool) {
        let key = (schedule_id.to_string(), scheduled_at);
        if let Some(existing) = self.by_key.get(&key) {
            return (existing.clone(), false);
        }
        let occurrence = Occurrence::new(schedule_id, scheduled_at);
        let id = occurrence.id.clone();
        self.pending.insert((scheduled_at, id.clone()));
        self.by_key.insert(key, id.clone());
        self.occurrences.insert(id.clone(), occurrence);
        (id, true)
    }

    pub fn mark_generated(&mut self, schedule_id: &str, date: NaiveDate) {
        self.generated.insert((schedule_id.to_string(), date));
    }

    pub fn is_generated(&self, schedule_id: &str, date: NaiveDate) -> bool {
        self.generated.contains(&(schedule_id.to_string(), date))
    }

    pub fn get(&self, id: &str) -> Result<&Occurrence> {
        self.occurrences
            .get(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Occurrence, id))
    }

    /// Run a state-machine step on one occurrence.
    ///
    /// This is the only mutable access to stored occurrences, so the pending
    /// index always matches the statuses.
    pub fn apply<F>(&mut self, id: &str, step: F) -> Result<(Transition, Occurrence)>
    where
        F: FnOnce(&mut Occurrence) -> Result<Transition>,
    {
        let occurrence = self
            .occurrences
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Occurrence, id))?;
        let transition = step(occurrence)?;
        if transition == Transition::Applied && occurrence.status != OccurrenceStatus::Pending {
            self.pending
                .remove(&(occurrence.scheduled_at, occurrence.id.clone()));
        }
        Ok((transition, occurrence.clone()))
    }

    /// Flip `notified_reminder`. Returns false if it was already set or the
    /// occurrence is no longer pending.
    pub fn claim_reminder(&mut self, id: &str) -> Result<bool> {
        let occurrence = self
            .occurrences
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Occurrence, id))?;
        if occurrence.notified_reminder || occurrence.status != OccurrenceStatus::Pending {
            return Ok(false);
        }
        occurrence.notified_reminder = true;
        Ok(true)
    }

    /// Pending occurrences scheduled at or before `cutoff`, oldest first.
    pub fn pending_through(&self, cutoff: NaiveDateTime) -> Vec<&Occurrence> {
        self.pending
            .iter()
            .take_while(|(at, _)| *at <= cutoff)
            .filter_map(|(_, id)| self.occurrences.get(id))
            .collect()
    }

    /// Pending occurrences scheduled in `(after, until]`, oldest first.
    pub fn pending_between(&self, after: NaiveDateTime, until: NaiveDateTime) -> Vec<&Occurrence> {
        self.pending
            .iter()
            .skip_while(|(at, _)| *at <= after)
            .take_while(|(at, _)| *at <= until)
            .filter_map(|(_, id)| self.occurrences.get(id))
            .collect()
    }

    /// A schedule's occurrences within `[from, to]` inclusive, by time.
    pub fn for_schedule(
        &self,
        schedule_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Vec<&Occurrence> {
        let lo = (schedule_id.to_string(), from);
        let hi = (schedule_id.to_string(), to);
        self.by_key
            .range(lo..=hi)
            .filter_map(|(_, id)| self.occurrences.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn insert_is_keyed_by_schedule_and_time() {
        let mut ledger = OccurrenceLedger::new();
        let (a, created_a) = ledger.insert_if_absent("s1", at(1, 8));
        let (b, created_b) = ledger.insert_if_absent("s1", at(1, 8));
        let (c, created_c) = ledger.insert_if_absent("s2", at(1, 8));
        assert!(created_a && !created_b && created_c);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn apply_drops_terminal_from_pending_index() {
        let mut ledger = OccurrenceLedger::new();
        let (id, _) = ledger.insert_if_absent("s1", at(1, 8));
        ledger.insert_if_absent("s1", at(1, 20));
        assert_eq!(ledger.pending_through(at(2, 0)).len(), 2);

        ledger
            .apply(&id, |occ| occ.miss(at(1, 9), Duration::zero()))
            .unwrap();
        let remaining = ledger.pending_through(at(2, 0));
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].scheduled_at, at(1, 20));
    }

    #[test]
    fn failed_step_leaves_index_alone() {
        let mut ledger = OccurrenceLedger::new();
        let (id, _) = ledger.insert_if_absent("s1", at(1, 8));
        assert!(ledger
            .apply(&id, |occ| occ.miss(at(1, 7), Duration::zero()))
            .is_err());
        assert_eq!(ledger.pending_through(at(1, 8)).len(), 1);
    }

    #[test]
    fn apply_unknown_is_not_found() {
        let mut ledger = OccurrenceLedger::new();
        assert!(matches!(
            ledger.apply("occ-missing", |occ| occ.skip(None)),
            Err(CoreError::NotFound { entity: EntityKind::Occurrence, .. })
        ));
    }

    #[test]
    fn for_schedule_is_scoped_and_ordered() {
        let mut ledger = OccurrenceLedger::new();
        ledger.insert_if_absent("s1", at(2, 8));
        ledger.insert_if_absent("s1", at(1, 8));
        ledger.insert_if_absent("s10", at(1, 9));
        ledger.insert_if_absent("s1", at(5, 8));
        let found = ledger.for_schedule("s1", at(1, 0), at(3, 0));
        let times: Vec<_> = found.iter().map(|o| o.scheduled_at).collect();
        assert_eq!(times, vec![at(1, 8), at(2, 8)]);
    }

    #[test]
    fn claim_reminder_only_once() {
        let mut ledger = OccurrenceLedger::new();
        let (id, _) = ledger.insert_if_absent("s1", at(1, 8));
        assert!(ledger.claim_reminder(&id).unwrap());
        assert!(!ledger.claim_reminder(&id).unwrap());
    }
}
