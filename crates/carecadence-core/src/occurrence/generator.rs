//! Lazy per-day occurrence expansion.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::OccurrenceLedger;
use crate::schedule::ScheduleDefinition;

/// Result of expanding one schedule for one date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// Ids of occurrences created by this call.
    pub created: Vec<String>,
    /// Occurrences for the date that already existed.
    pub existing: usize,
}

/// Scheduled date-times for `schedule` on `date`.
///
/// Empty when the schedule is retired or `date` is outside its active window.
pub fn expand(schedule: &ScheduleDefinition, date: NaiveDate) -> Vec<NaiveDateTime> {
    if !schedule.is_active || !schedule.covers(date) {
        return Vec::new();
    }
    schedule
        .times_of_day
        .iter()
        .map(|time| date.and_time(*time))
        .collect()
}

/// Make sure `ledger` holds one occurrence per time of day of `schedule` on
/// `date`. Safe to call repeatedly.
pub fn generate_for_date(
    schedule: &ScheduleDefinition,
    date: NaiveDate,
    ledger: &mut OccurrenceLedger,
) -> GenerationOutcome {
    let mut outcome = GenerationOutcome::default();
    let slots = expand(schedule, date);
    if slots.is_empty() {
        return outcome;
    }
    for scheduled_at in slots {
        let (id, created) = ledger.insert_if_absent(&schedule.id, scheduled_at);
        if created {
            outcome.created.push(id);
        } else {
            outcome.existing += 1;
        }
    }
    ledger.mark_generated(&schedule.id, date);
    if !outcome.created.is_empty() {
        tracing::debug!(
            schedule_id = %schedule.id,
            %date,
            created = outcome.created.len(),
            "generated occurrences"
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{FrequencyClass, NewSchedule, ScheduleKind};
    use chrono::Utc;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule(times: &[&str], end: Option<NaiveDate>) -> ScheduleDefinition {
        let mut new = NewSchedule::new("p1", ScheduleKind::Medication, "Metformin", times, date(2024, 1, 1))
            .with_frequency(FrequencyClass::Custom);
        new.end_date = end;
        ScheduleDefinition::build(new, Utc::now()).unwrap()
    }

    #[test]
    fn expand_one_per_time_of_day() {
        let s = schedule(&["08:00", "20:00"], None);
        let slots = expand(&s, date(2024, 3, 5));
        assert_eq!(
            slots,
            vec![
                date(2024, 3, 5).and_hms_opt(8, 0, 0).unwrap(),
                date(2024, 3, 5).and_hms_opt(20, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn expand_respects_window() {
        let s = schedule(&["08:00"], Some(date(2024, 1, 3)));
        assert!(expand(&s, date(2023, 12, 31)).is_empty());
        assert_eq!(expand(&s, date(2024, 1, 1)).len(), 1);
        assert_eq!(expand(&s, date(2024, 1, 3)).len(), 1);
        assert!(expand(&s, date(2024, 1, 4)).is_empty());
    }

    #[test]
    fn expand_skips_retired() {
        let mut s = schedule(&["08:00"], None);
        s.is_active = false;
        assert!(expand(&s, date(2024, 1, 2)).is_empty());
    }

    #[test]
    fn regenerate_does_not_duplicate() {
        let s = schedule(&["08:00", "14:00", "20:00"], None);
        let mut ledger = OccurrenceLedger::new();
        let first = generate_for_date(&s, date(2024, 1, 2), &mut ledger);
        let second = generate_for_date(&s, date(2024, 1, 2), &mut ledger);
        assert_eq!(first.created.len(), 3);
        assert!(second.created.is_empty());
        assert_eq!(second.existing, 3);
        assert_eq!(ledger.len(), 3);
        assert!(ledger.is_generated(&s.id, date(2024, 1, 2)));
    }

    #[test]
    fn out_of_range_date_is_not_marked_generated() {
        let s = schedule(&["08:00"], None);
        let mut ledger = OccurrenceLedger::new();
        generate_for_date(&s, date(2023, 6, 1), &mut ledger);
        assert!(ledger.is_empty());
        assert!(!ledger.is_generated(&s.id, date(2023, 6, 1)));
    }

    proptest! {
        #[test]
        fn generation_matches_times_and_is_idempotent(
            minutes in proptest::collection::btree_set(0u32..1440, 1..8),
            offset_days in 0i64..400,
            repeats in 1usize..4,
        ) {
            let times: Vec<String> = minutes
                .iter()
                .map(|m| format!("{:02}:{:02}", m / 60, m % 60))
                .collect();
            let refs: Vec<&str> = times.iter().map(String::as_str).collect();
            let s = schedule(&refs, None);
            let day = date(2024, 1, 1) + chrono::Duration::days(offset_days);

            let mut ledger = OccurrenceLedger::new();
            let mut created = 0;
            for _ in 0..repeats {
                created += generate_for_date(&s, day, &mut ledger).created.len();
            }

            prop_assert_eq!(created, minutes.len());
            prop_assert_eq!(ledger.len(), minutes.len());
            let start = day.and_hms_opt(0, 0, 0).unwrap();
            let end = day.and_hms_opt(23, 59, 59).unwrap();
            let found = ledger.for_schedule(&s.id, start, end);
            let mut keys: Vec<_> = found.iter().map(|o| o.scheduled_at).collect();
            keys.dedup();
            prop_assert_eq!(keys.len(), minutes.len());
        }
    }
}
