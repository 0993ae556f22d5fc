//! Adherence tracking and analytics
//!
//! Adherence is derived on demand from occurrence history, never stored:
//! - **Rate**: completed / total expected × 100, rounded to the nearest integer
//! - **Total expected**: completed + skipped + missed + pending-but-due
//! - **Bucket**: excellent (≥ 95), moderate (85..95), poor (< 85)
//!
//! Skipped and missed both count as "not completed". Future pending
//! occurrences are not expected yet and are left out entirely.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::occurrence::{Occurrence, OccurrenceStatus};

/// Quality tier for an adherence rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdherenceBucket {
    Excellent,
    Moderate,
    Poor,
}

/// Bucket boundaries in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdherenceThresholds {
    #[serde(default = "default_excellent")]
    pub excellent_threshold: u32,
    #[serde(default = "default_moderate")]
    pub moderate_threshold: u32,
}

fn default_excellent() -> u32 {
    95
}
fn default_moderate() -> u32 {
    85
}

impl Default for AdherenceThresholds {
    fn default() -> Self {
        Self {
            excellent_threshold: default_excellent(),
            moderate_threshold: default_moderate(),
        }
    }
}

/// Inclusive range of local dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window spanning `start..=end`; the bounds are swapped if inverted.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    /// The `days` days ending on `end` (a 7-day window ending today, etc.).
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self::new(end - Duration::days(span), end)
    }

    pub fn first_instant(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    pub fn last_instant(&self) -> NaiveDateTime {
        self.end.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::nanoseconds(1)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Derived adherence over one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdherenceSnapshot {
    pub window: DateWindow,
    pub completed: u32,
    pub skipped: u32,
    pub missed: u32,
    /// Still pending but already past the scheduled time.
    pub pending_due: u32,
    pub total_expected: u32,
    /// Percentage, absent when nothing was expected.
    pub rate: Option<u32>,
    pub bucket: Option<AdherenceBucket>,
}

/// Adherence of one schedule inside an aggregate report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleAdherence {
    pub schedule_id: String,
    pub name: String,
    pub snapshot: AdherenceSnapshot,
}

/// Cross-schedule adherence.
///
/// `rate` is the unweighted mean of the per-schedule rates, so a schedule
/// with two doses a week weighs as much as one with four a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallAdherence {
    pub window: DateWindow,
    pub rate: Option<u32>,
    pub bucket: Option<AdherenceBucket>,
    pub schedules: Vec<ScheduleAdherence>,
}

/// Computes adherence snapshots from occurrence history.
#[derive(Debug, Clone, Default)]
pub struct AdherenceCalculator {
    pub thresholds: AdherenceThresholds,
}

impl AdherenceCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: AdherenceThresholds) -> Self {
        Self { thresholds }
    }

    pub fn bucket(&self, rate: u32) -> AdherenceBucket {
        if rate >= self.thresholds.excellent_threshold {
            AdherenceBucket::Excellent
        } else if rate >= self.thresholds.moderate_threshold {
            AdherenceBucket::Moderate
        } else {
            AdherenceBucket::Poor
        }
    }

    /// Summarize `occurrences` that fall inside `window` as seen at `now`.
    pub fn snapshot<'a, I>(&self, window: DateWindow, occurrences: I, now: NaiveDateTime) -> AdherenceSnapshot
    where
        I: IntoIterator<Item = &'a Occurrence>,
    {
        let mut snapshot = AdherenceSnapshot {
            window,
            completed: 0,
            skipped: 0,
            missed: 0,
            pending_due: 0,
            total_expected: 0,
            rate: None,
            bucket: None,
        };

        let (first, last) = (window.first_instant(), window.last_instant());
        for occ in occurrences {
            if occ.scheduled_at < first || occ.scheduled_at > last {
                continue;
            }
            match occ.status {
                OccurrenceStatus::Completed => snapshot.completed += 1,
                OccurrenceStatus::Skipped => snapshot.skipped += 1,
                OccurrenceStatus::Missed => snapshot.missed += 1,
                OccurrenceStatus::Pending if occ.is_due(now) => snapshot.pending_due += 1,
                OccurrenceStatus::Pending => continue,
            }
            snapshot.total_expected += 1;
        }

        snapshot.rate = percentage(snapshot.completed, snapshot.total_expected);
        snapshot.bucket = snapshot.rate.map(|r| self.bucket(r));
        snapshot
    }

    /// Unweighted mean of per-schedule rates. Schedules without a rate are
    /// left out of the mean.
    pub fn overall(&self, window: DateWindow, schedules: Vec<ScheduleAdherence>) -> OverallAdherence {
        let rates: Vec<u32> = schedules.iter().filter_map(|s| s.snapshot.rate).collect();
        let rate = if rates.is_empty() {
            None
        } else {
            let mean = rates.iter().map(|r| f64::from(*r)).sum::<f64>() / rates.len() as f64;
            Some(mean.round() as u32)
        };
        OverallAdherence {
            window,
            rate,
            bucket: rate.map(|r| self.bucket(r)),
            schedules,
        }
    }
}

fn percentage(part: u32, total: u32) -> Option<u32> {
    if total == 0 {
        return None;
    }
    Some((f64::from(part) * 100.0 / f64::from(total)).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn occ(minute: u32, status: OccurrenceStatus) -> Occurrence {
        let mut o = Occurrence::new("s1", day().and_hms_opt(8, minute, 0).unwrap());
        o.status = status;
        o
    }

    fn end_of_day() -> NaiveDateTime {
        day().and_hms_opt(23, 59, 0).unwrap()
    }

    #[test]
    fn nine_of_ten_is_moderate() {
        let calc = AdherenceCalculator::new();
        let mut history: Vec<Occurrence> = (0..9).map(|m| occ(m, OccurrenceStatus::Completed)).collect();
        history.push(occ(9, OccurrenceStatus::Missed));

        let snap = calc.snapshot(DateWindow::day(day()), &history, end_of_day());
        assert_eq!(snap.total_expected, 10);
        assert_eq!(snap.rate, Some(90));
        assert_eq!(snap.bucket, Some(AdherenceBucket::Moderate));
    }

    #[test]
    fn skipped_counts_as_not_completed() {
        let calc = AdherenceCalculator::new();
        let history = vec![
            occ(0, OccurrenceStatus::Completed),
            occ(1, OccurrenceStatus::Skipped),
        ];
        let snap = calc.snapshot(DateWindow::day(day()), &history, end_of_day());
        assert_eq!(snap.rate, Some(50));
        assert_eq!(snap.bucket, Some(AdherenceBucket::Poor));
    }

    #[test]
    fn future_pending_is_not_expected() {
        let calc = AdherenceCalculator::new();
        let history = vec![
            occ(0, OccurrenceStatus::Completed),
            occ(30, OccurrenceStatus::Pending),
            occ(50, OccurrenceStatus::Pending),
        ];
        let now = day().and_hms_opt(8, 40, 0).unwrap();
        let snap = calc.snapshot(DateWindow::day(day()), &history, now);
        assert_eq!(snap.pending_due, 1);
        assert_eq!(snap.total_expected, 2);
        assert_eq!(snap.rate, Some(50));
    }

    #[test]
    fn empty_window_has_no_rate() {
        let calc = AdherenceCalculator::new();
        let snap = calc.snapshot(DateWindow::day(day()), &Vec::<Occurrence>::new(), end_of_day());
        assert_eq!(snap.rate, None);
        assert_eq!(snap.bucket, None);
    }

    #[test]
    fn rate_rounds_to_nearest() {
        assert_eq!(percentage(2, 3), Some(67));
        assert_eq!(percentage(1, 3), Some(33));
        assert_eq!(percentage(1, 8), Some(13));
    }

    #[test]
    fn bucket_boundaries() {
        let calc = AdherenceCalculator::new();
        assert_eq!(calc.bucket(100), AdherenceBucket::Excellent);
        assert_eq!(calc.bucket(95), AdherenceBucket::Excellent);
        assert_eq!(calc.bucket(94), AdherenceBucket::Moderate);
        assert_eq!(calc.bucket(85), AdherenceBucket::Moderate);
        assert_eq!(calc.bucket(84), AdherenceBucket::Poor);
    }

    #[test]
    fn window_filters_occurrences() {
        let calc = AdherenceCalculator::new();
        let mut next_day = Occurrence::new("s1", day().succ_opt().unwrap().and_hms_opt(8, 0, 0).unwrap());
        next_day.status = OccurrenceStatus::Missed;
        let history = vec![occ(0, OccurrenceStatus::Completed), next_day];
        let snap = calc.snapshot(DateWindow::day(day()), &history, end_of_day() + Duration::days(2));
        assert_eq!(snap.total_expected, 1);
        assert_eq!(snap.rate, Some(100));
    }

    #[test]
    fn overall_is_unweighted_mean() {
        let calc = AdherenceCalculator::new();
        let window = DateWindow::day(day());
        let entry = |id: &str, rate: Option<u32>, total: u32| ScheduleAdherence {
            schedule_id: id.to_string(),
            name: id.to_string(),
            snapshot: AdherenceSnapshot {
                window,
                completed: 0,
                skipped: 0,
                missed: 0,
                pending_due: 0,
                total_expected: total,
                rate,
                bucket: None,
            },
        };
        let overall = calc.overall(
            window,
            vec![entry("a", Some(100), 2), entry("b", Some(80), 40), entry("c", None, 0)],
        );
        assert_eq!(overall.rate, Some(90));
        assert_eq!(overall.bucket, Some(AdherenceBucket::Moderate));
        assert_eq!(overall.schedules.len(), 3);
    }

    #[test]
    fn trailing_window_spans_days() {
        let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let window = DateWindow::trailing(end, 7);
        assert_eq!(window.start, day());
        assert_eq!(window.dates().count(), 7);
    }
}
